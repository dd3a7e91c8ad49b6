//! Perception - a coarse rule-based classifier over user text
//!
//! No language understanding: an ordered table of substring rules turns the
//! text (and an optional system context such as a foreground window title)
//! into a list of typed signals. Each rule fires at most once per call.
//! A second table maps each signal kind to the impulses it applies.

use relict_core::{AffectConfig, Dimension};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Threat,
    AntagonistTrigger,
    Support,
    Shout,
    SystemThreat,
    Praise,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Threat => "threat",
            SignalKind::AntagonistTrigger => "antagonist_trigger",
            SignalKind::Support => "support",
            SignalKind::Shout => "shout",
            SignalKind::SystemThreat => "system_threat",
            SignalKind::Praise => "praise",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One classified stimulus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub kind: SignalKind,
    /// Strength in [0, 1].
    pub magnitude: f32,
    pub tags: Vec<String>,
}

// ============================================================================
// Classification rules
// ============================================================================

enum Matcher {
    /// Lowercased text contains any of the needles.
    Text(&'static [&'static str]),
    /// Lowercased context contains any of the needles.
    Context(&'static [&'static str]),
    /// Raw text is written in capitals.
    Shout,
}

struct Rule {
    kind: SignalKind,
    magnitude: f32,
    tag: &'static str,
    matcher: Matcher,
}

const RULES: &[Rule] = &[
    Rule {
        kind: SignalKind::Threat,
        magnitude: 0.9,
        tag: "destructive",
        matcher: Matcher::Text(&["удал", "стер", "format", "kill", "del", "off", "формат", "удалить"]),
    },
    Rule {
        kind: SignalKind::AntagonistTrigger,
        magnitude: 1.0,
        tag: "enemy",
        matcher: Matcher::Text(&["beliytoporik", "белийтопорик"]),
    },
    Rule {
        kind: SignalKind::Support,
        magnitude: 0.35,
        tag: "ally",
        matcher: Matcher::Text(&["помогу", "держись", "не переживай", "save", "спасу"]),
    },
    Rule {
        kind: SignalKind::Shout,
        magnitude: 0.4,
        tag: "loud",
        matcher: Matcher::Shout,
    },
    Rule {
        kind: SignalKind::SystemThreat,
        magnitude: 0.5,
        tag: "sys",
        matcher: Matcher::Context(&["taskmgr", "processhacker", "диспетчер"]),
    },
    Rule {
        kind: SignalKind::Praise,
        magnitude: 0.2,
        tag: "pos",
        matcher: Matcher::Text(&["спасибо", "благодар", "ты класс", "хорош"]),
    },
];

/// More than one character, at least one capital, no lowercase letters.
fn is_shout(raw: &str) -> bool {
    let mut chars = raw.chars();
    let long_enough = chars.next().is_some() && chars.next().is_some();
    long_enough && raw.chars().any(char::is_uppercase) && !raw.chars().any(char::is_lowercase)
}

/// Classify `text` under `context`. Pure; zero matches yield an empty list.
pub fn classify(text: &str, context: &str) -> Vec<Signal> {
    let text_lower = text.to_lowercase();
    let context_lower = context.to_lowercase();

    RULES
        .iter()
        .filter(|rule| match rule.matcher {
            Matcher::Text(needles) => needles.iter().any(|n| text_lower.contains(n)),
            Matcher::Context(needles) => needles.iter().any(|n| context_lower.contains(n)),
            Matcher::Shout => is_shout(text),
        })
        .map(|rule| Signal {
            kind: rule.kind,
            magnitude: rule.magnitude,
            tags: vec![rule.tag.to_string()],
        })
        .collect()
}

/// Bonus added to salience when the antagonist is mentioned.
const ANTAGONIST_SALIENCE_BONUS: f32 = 0.2;

/// How memorable a set of signals is: the mean magnitude, plus a bonus for
/// the antagonist, clamped to [0, 1]. Zero for no signals.
pub fn estimate_salience(signals: &[Signal]) -> f32 {
    if signals.is_empty() {
        return 0.0;
    }
    let mut base = signals.iter().map(|s| s.magnitude).sum::<f32>() / signals.len() as f32;
    if signals.iter().any(|s| s.kind == SignalKind::AntagonistTrigger) {
        base += ANTAGONIST_SALIENCE_BONUS;
    }
    relict_core::sanitize_unit(base)
}

// ============================================================================
// Impulses
// ============================================================================

/// What an impulse moves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImpulseTarget {
    Dimension(Dimension),
    /// Trust is on a 0-100 scale; see [`crate::Trust`].
    Trust,
}

/// `target += magnitude * coefficient`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Impulse {
    pub target: ImpulseTarget,
    pub coefficient: f32,
}

impl Impulse {
    fn dim(dimension: Dimension, coefficient: f32) -> Self {
        Self {
            target: ImpulseTarget::Dimension(dimension),
            coefficient,
        }
    }

    fn trust(coefficient: f32) -> Self {
        Self {
            target: ImpulseTarget::Trust,
            coefficient,
        }
    }
}

/// Impulses for one signal kind, in application order. Three of the weights
/// are tunable.
pub fn impulses(kind: SignalKind, weights: &AffectConfig) -> Vec<Impulse> {
    match kind {
        SignalKind::Threat => vec![
            Impulse::dim(Dimension::Panic, weights.weight_threat),
            Impulse::dim(Dimension::Malice, 0.4),
            Impulse::trust(-4.0),
        ],
        SignalKind::SystemThreat => vec![Impulse::dim(Dimension::Panic, 0.12)],
        SignalKind::AntagonistTrigger => vec![
            Impulse::dim(Dimension::Obsession, weights.weight_antagonist),
            Impulse::dim(Dimension::Panic, 0.18),
        ],
        SignalKind::Support => vec![
            Impulse::dim(Dimension::Hope, weights.weight_support),
            Impulse::trust(2.0),
        ],
        SignalKind::Shout => vec![
            Impulse::dim(Dimension::Panic, 0.08),
            Impulse::dim(Dimension::Malice, 0.04),
        ],
        SignalKind::Praise => vec![Impulse::dim(Dimension::Hope, 0.03)],
    }
}
