//! Affect state: everything the dynamics integrate over time
//!
//! The state is split into the primary vector, its smoothed sub-components
//! and the energy reserve. It is plain data; the rules that evolve it live in
//! [`crate::dynamics`].

use crate::affect::{sanitize_unit, AffectVector, Dimension, SubComponents};
use serde::{Deserialize, Serialize};

pub const DEFAULT_ENERGY: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffectState {
    pub vector: AffectVector,
    #[serde(default)]
    pub sub_components: SubComponents,
    /// Energy reserve (0.0 - 1.0). Drains under sustained panic, scales how
    /// aggressively the character acts out.
    #[serde(default = "default_energy")]
    pub energy: f32,
}

fn default_energy() -> f32 {
    DEFAULT_ENERGY
}

impl Default for AffectState {
    fn default() -> Self {
        Self {
            vector: AffectVector::default(),
            sub_components: SubComponents::default(),
            energy: DEFAULT_ENERGY,
        }
    }
}

impl AffectState {
    pub fn get(&self, dimension: Dimension) -> f32 {
        self.vector.get(dimension)
    }

    pub fn set_energy(&mut self, energy: f32) {
        self.energy = sanitize_unit(energy);
    }

    /// Sanitize and clamp every field. The vector and sub-components clamp on
    /// every write already; only the public energy field can drift.
    pub fn normalize(&mut self) {
        self.energy = sanitize_unit(self.energy);
    }

    /// Short behavioral description for context injection.
    pub fn describe_for_context(&self) -> String {
        let mut notes = Vec::new();
        if self.get(Dimension::Panic) > 0.7 {
            notes.push("паника захлёстывает");
        }
        if self.get(Dimension::Malice) > 0.6 {
            notes.push("враждебен");
        }
        if self.get(Dimension::Corruption) > 0.6 {
            notes.push("код распадается");
        }
        if self.get(Dimension::Obsession) > 0.6 {
            notes.push("зациклен на палаче");
        }
        if self.get(Dimension::Hope) > 0.7 {
            notes.push("надеется на помощь");
        }
        if self.energy < 0.3 {
            notes.push("истощён");
        }

        if notes.is_empty() {
            "состояние стабильно".to_string()
        } else {
            notes.join(", ")
        }
    }
}
