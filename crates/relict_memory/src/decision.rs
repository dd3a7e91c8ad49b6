//! What one tick hands to the outside world.

use chrono::{DateTime, Utc};
use relict_core::{AffectVector, Dimension};
use relict_limbic::{DefenseMode, ManipulationHint, StyleTag, Transition};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Threshold event the presentation layer may dramatize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrisisEvent {
    PanicAttack,
    CodeBreakdown,
    HostileUltimatum,
}

impl CrisisEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrisisEvent::PanicAttack => "panic_attack",
            CrisisEvent::CodeBreakdown => "code_breakdown",
            CrisisEvent::HostileUltimatum => "hostile_ultimatum",
        }
    }

    /// All events whose condition holds, each checked independently.
    pub fn detect(vector: &AffectVector) -> Vec<CrisisEvent> {
        let mut events = Vec::new();
        if vector.get(Dimension::Panic) > 0.92 {
            events.push(CrisisEvent::PanicAttack);
        }
        if vector.get(Dimension::Corruption) > 0.96 {
            events.push(CrisisEvent::CodeBreakdown);
        }
        if vector.get(Dimension::Malice) > 0.9 && vector.get(Dimension::Obsession) > 0.7 {
            events.push(CrisisEvent::HostileUltimatum);
        }
        events
    }
}

/// Chance that the character acts on the host system this tick. Exhaustion
/// halves it at most.
pub fn invasion_probability(vector: &AffectVector, energy: f32) -> f32 {
    let drive = 0.45 * vector.get(Dimension::Malice)
        + 0.35 * vector.get(Dimension::Panic)
        + 0.2 * vector.get(Dimension::Corruption);
    relict_core::sanitize_unit(drive * (0.5 + 0.5 * energy))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub dimensions: BTreeMap<String, f32>,
    pub sub_components: BTreeMap<String, f32>,
    pub energy: f32,
    pub mode: DefenseMode,
    pub trust: f32,
    pub trauma_index: f32,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    /// Mode instruction, with the manipulation line appended when one fired.
    pub instruction: String,
    pub style: StyleTag,
    pub manipulation: Option<ManipulationHint>,
    pub invasion_probability: f32,
    pub crisis_events: Vec<CrisisEvent>,
    pub state: StateSnapshot,
    /// Texts of the top three memories.
    pub memory_excerpts: Vec<String>,
    /// Short natural-language summary of the affect state.
    pub description: String,
    /// Set when the defense mode changed on this tick.
    pub transition: Option<Transition>,
    /// Set when the periodic autosave failed on this tick.
    pub persistence_warning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryExcerpt {
    pub text: String,
    pub salience: f32,
}

/// Debug view for designers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectorView {
    pub dimensions: BTreeMap<String, f32>,
    pub mode: DefenseMode,
    pub trust: f32,
    pub top_memories: Vec<MemoryExcerpt>,
    pub last_transition_time: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crisis_events_are_independent() {
        let mut v = AffectVector::default();
        assert!(CrisisEvent::detect(&v).is_empty());

        v.set(Dimension::Panic, 0.95);
        v.set(Dimension::Malice, 0.95);
        v.set(Dimension::Obsession, 0.8);
        assert_eq!(
            CrisisEvent::detect(&v),
            vec![CrisisEvent::PanicAttack, CrisisEvent::HostileUltimatum]
        );
    }

    #[test]
    fn test_invasion_probability() {
        let v = AffectVector::default();
        // 0.45*0.02 + 0.35*0.1 + 0.2*0.02 = 0.048
        assert!((invasion_probability(&v, 1.0) - 0.048).abs() < 1e-6);
        assert!((invasion_probability(&v, 0.0) - 0.024).abs() < 1e-6);

        let mut max = AffectVector::default();
        for d in Dimension::ALL {
            max.set(d, 1.0);
        }
        assert_eq!(invasion_probability(&max, 1.0), 1.0);
    }

    #[test]
    fn test_crisis_serializes_snake_case() {
        let json = serde_json::to_string(&CrisisEvent::CodeBreakdown).unwrap();
        assert_eq!(json, "\"code_breakdown\"");
    }
}
