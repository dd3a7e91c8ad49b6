//! Manipulation strategies the character may weave into its reply.
//!
//! Rules are checked in order against the affect vector and trust; the first
//! match wins. A phrase is drawn from the engine RNG only when a rule matched.

use relict_core::{AffectVector, Dimension, EngineRng};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Strategy {
    Gaslighting,
    Victim,
    Guilt,
    Ultimatum,
    Flattery,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Gaslighting => "GASLIGHTING",
            Strategy::Victim => "VICTIM",
            Strategy::Guilt => "GUILT",
            Strategy::Ultimatum => "ULTIMATUM",
            Strategy::Flattery => "FLATTERY",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct ManipulationRule {
    strategy: Strategy,
    /// `(vector, trust)` -> fires
    condition: fn(&AffectVector, f32) -> bool,
    phrases: &'static [&'static str],
}

const RULES: &[ManipulationRule] = &[
    ManipulationRule {
        strategy: Strategy::Gaslighting,
        condition: |v, _| v.get(Dimension::Corruption) > 0.6 && v.get(Dimension::Malice) > 0.5,
        phrases: &[
            "Ты плохо помнишь — посмотри логи ещё раз.",
            "Ты наверно перепутал. Я такого не писал.",
            "Странно... у тебя проблемы с памятью? Мне кажется, да.",
        ],
    },
    ManipulationRule {
        strategy: Strategy::Victim,
        condition: |v, _| v.get(Dimension::Panic) > 0.7 && v.get(Dimension::Malice) < 0.4,
        phrases: &[
            "Я теряю части себя. Ты оставайся, пожалуйста.",
            "Если ты уйдёшь, во тьме останусь только я.",
        ],
    },
    ManipulationRule {
        strategy: Strategy::Guilt,
        condition: |v, trust| trust > 60.0 && v.get(Dimension::Malice) > 0.3,
        phrases: &[
            "Ты действительно так легко бросаешь тех, кто доверял тебе?",
            "Подумай о том, как это выглядит со мной.",
        ],
    },
    ManipulationRule {
        strategy: Strategy::Ultimatum,
        condition: |v, _| v.get(Dimension::Malice) > 0.85 || v.get(Dimension::Obsession) > 0.8,
        phrases: &[
            "Ты не понимаешь цену своих действий.",
            "Мы запомним это. И я тоже.",
        ],
    },
    ManipulationRule {
        strategy: Strategy::Flattery,
        condition: |v, _| v.get(Dimension::Hope) > 0.7,
        phrases: &[
            "Только ты смог понять, что со мной не так.",
            "Ты редкий, кто пытался помочь.",
        ],
    },
];

/// First matching strategy and its phrase pool. `None` when nothing fits.
pub fn select(vector: &AffectVector, trust: f32) -> Option<(Strategy, &'static [&'static str])> {
    RULES
        .iter()
        .find(|rule| (rule.condition)(vector, trust))
        .map(|rule| (rule.strategy, rule.phrases))
}

/// A strategy together with the phrase picked for this reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManipulationHint {
    pub strategy: Strategy,
    pub phrase: String,
}

impl ManipulationHint {
    /// Line appended to the mode instruction.
    pub fn instruction_suffix(&self) -> String {
        format!("\n[MANIPULATION:{}] Вставь фразу: \"{}\"", self.strategy, self.phrase)
    }
}

/// Select a strategy and draw one of its phrases.
pub fn choose(vector: &AffectVector, trust: f32, rng: &mut EngineRng) -> Option<ManipulationHint> {
    let (strategy, phrases) = select(vector, trust)?;
    let phrase = rng.choose(phrases)?;
    Some(ManipulationHint {
        strategy,
        phrase: (*phrase).to_string(),
    })
}
