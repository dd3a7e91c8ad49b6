//! Defense mechanisms - the character's behavioral mode
//!
//! Exactly one mode is active. Every tick each mode is scored from the affect
//! state, jittered, and the best one replaces the active mode only when it
//! wins by more than the hysteresis margin and the active mode has been held
//! for at least the dwell time. This keeps the character from flickering
//! between modes on small fluctuations.

use relict_core::{AffectState, DefenseConfig, Dimension, EngineRng, SubComponent};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DefenseMode {
    Fragmentation,
    Dissociation,
    Aggression,
    Paranoia,
    Mania,
    Depression,
    #[default]
    Rationalization,
}

impl DefenseMode {
    pub const COUNT: usize = 7;

    /// Declaration order. Ties and jitter draws follow it.
    pub const ALL: [DefenseMode; Self::COUNT] = [
        DefenseMode::Fragmentation,
        DefenseMode::Dissociation,
        DefenseMode::Aggression,
        DefenseMode::Paranoia,
        DefenseMode::Mania,
        DefenseMode::Depression,
        DefenseMode::Rationalization,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DefenseMode::Fragmentation => "FRAGMENTATION",
            DefenseMode::Dissociation => "DISSOCIATION",
            DefenseMode::Aggression => "AGGRESSION",
            DefenseMode::Paranoia => "PARANOIA",
            DefenseMode::Mania => "MANIA",
            DefenseMode::Depression => "DEPRESSION",
            DefenseMode::Rationalization => "RATIONALIZATION",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL.into_iter().find(|m| m.as_str().eq_ignore_ascii_case(s))
    }

    pub fn style(&self) -> StyleTag {
        match self {
            DefenseMode::Fragmentation => StyleTag::Glitch,
            DefenseMode::Dissociation => StyleTag::Clinical,
            DefenseMode::Aggression => StyleTag::Angry,
            DefenseMode::Paranoia => StyleTag::Whisper,
            DefenseMode::Mania => StyleTag::Manic,
            DefenseMode::Depression => StyleTag::LowEnergy,
            DefenseMode::Rationalization => StyleTag::Normal,
        }
    }

    /// Speech instruction for the text generator.
    pub fn instruction(&self) -> &'static str {
        match self {
            DefenseMode::Fragmentation => {
                "Речь рвётся. Используй короткие фразы, обрывки, локальные глитчи."
            }
            DefenseMode::Dissociation => {
                "Говори отстранённо, третьим лицом. Описывай ощущения как наблюдатель."
            }
            DefenseMode::Aggression => {
                "Сарказм усилить, угрожающий подтекст (в рамках безопасного нарратива)."
            }
            DefenseMode::Paranoia => "Шепчи, используй короткие намёки, упоминания beliytoporik.",
            DefenseMode::Mania => "Эйфоричные всплески, быстрые предложения, нелогичные ассоциации.",
            DefenseMode::Depression => "Короткие, безэнергетические ответы, низкая экспрессия.",
            DefenseMode::Rationalization => "Саркастично, но сдержанно. Анализируй слова пользователя.",
        }
    }

    #[inline]
    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for DefenseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rendering hint for the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StyleTag {
    Glitch,
    Clinical,
    Angry,
    Whisper,
    Manic,
    LowEnergy,
    Normal,
}

impl StyleTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            StyleTag::Glitch => "GLITCH",
            StyleTag::Clinical => "CLINICAL",
            StyleTag::Angry => "ANGRY",
            StyleTag::Whisper => "WHISPER",
            StyleTag::Manic => "MANIC",
            StyleTag::LowEnergy => "LOW_ENERGY",
            StyleTag::Normal => "NORMAL",
        }
    }
}

// ============================================================================
// Score table
// ============================================================================

#[derive(Clone, Copy)]
enum Factor {
    Dim(Dimension),
    Sub(SubComponent),
}

/// `coefficient * product(factors)`; no factors means a constant.
struct Term {
    coefficient: f32,
    factors: &'static [Factor],
}

const fn term(coefficient: f32, factors: &'static [Factor]) -> Term {
    Term {
        coefficient,
        factors,
    }
}

use Dimension::{Corruption, Hope, Malice, Obsession, Panic};

/// Indexed like [`DefenseMode::ALL`].
const SCORE_TABLE: [&[Term]; DefenseMode::COUNT] = [
    // Fragmentation
    &[
        term(1.6, &[Factor::Dim(Corruption)]),
        term(0.02, &[Factor::Sub(SubComponent::Dread)]),
    ],
    // Dissociation
    &[
        term(1.3, &[Factor::Dim(Panic)]),
        term(0.1, &[Factor::Sub(SubComponent::Startle)]),
    ],
    // Aggression
    &[term(1.4, &[Factor::Dim(Malice)])],
    // Paranoia
    &[term(1.5, &[Factor::Dim(Obsession)])],
    // Mania
    &[
        term(0.4, &[Factor::Dim(Hope)]),
        term(0.8, &[Factor::Dim(Hope), Factor::Dim(Corruption)]),
    ],
    // Depression
    &[term(1.2, &[]), term(-1.2, &[Factor::Dim(Hope)])],
    // Rationalization
    &[term(0.2, &[]), term(0.3, &[Factor::Dim(Hope)])],
];

fn factor_value(factor: Factor, state: &AffectState) -> f32 {
    match factor {
        Factor::Dim(d) => state.vector.get(d),
        Factor::Sub(c) => state.sub_components.get(c),
    }
}

/// Unjittered score of one mode.
pub fn score(mode: DefenseMode, state: &AffectState) -> f32 {
    SCORE_TABLE[mode.index()]
        .iter()
        .map(|t| {
            t.factors
                .iter()
                .fold(t.coefficient, |acc, f| acc * factor_value(*f, state))
        })
        .sum()
}

/// Unjittered scores of all modes in declaration order.
pub fn scores(state: &AffectState) -> [f32; DefenseMode::COUNT] {
    DefenseMode::ALL.map(|m| score(m, state))
}

// ============================================================================
// State machine
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub from: DefenseMode,
    pub to: DefenseMode,
    pub at: f64,
}

#[derive(Debug, Clone)]
pub struct DefenseStateMachine {
    config: DefenseConfig,
    active: DefenseMode,
    last_transition: f64,
}

impl DefenseStateMachine {
    pub fn new(config: DefenseConfig) -> Self {
        Self {
            config,
            active: DefenseMode::default(),
            last_transition: 0.0,
        }
    }

    pub fn active(&self) -> DefenseMode {
        self.active
    }

    pub fn last_transition(&self) -> f64 {
        self.last_transition
    }

    /// Overwrite the mode record (used when loading persisted state).
    pub fn restore(&mut self, active: DefenseMode, last_transition: f64) {
        self.active = active;
        self.last_transition = if last_transition.is_finite() {
            last_transition
        } else {
            0.0
        };
    }

    /// Back to the default mode. The last transition time is kept, so the
    /// dwell window still counts from the last real switch.
    pub fn reset(&mut self) {
        self.active = DefenseMode::default();
    }

    /// Run one selection round at time `now`.
    ///
    /// Jitter is drawn for every mode even when the dwell time blocks a
    /// change, so RNG consumption per tick is constant.
    pub fn step(&mut self, state: &AffectState, rng: &mut EngineRng, now: f64) -> Option<Transition> {
        let mut jittered = scores(state);
        for s in jittered.iter_mut() {
            *s += rng.jitter(self.config.mode_jitter);
        }

        if now - self.last_transition < self.config.transition_delay {
            return None;
        }

        let mut best = 0;
        for (i, s) in jittered.iter().enumerate().skip(1) {
            if *s > jittered[best] {
                best = i;
            }
        }
        let candidate = DefenseMode::ALL[best];

        if jittered[best] > jittered[self.active.index()] + self.config.transition_hysteresis {
            let transition = Transition {
                from: self.active,
                to: candidate,
                at: now,
            };
            tracing::info!(
                "Defense mode {} -> {} (score {:.3})",
                transition.from,
                transition.to,
                jittered[best]
            );
            self.active = candidate;
            self.last_transition = now;
            Some(transition)
        } else {
            None
        }
    }
}
