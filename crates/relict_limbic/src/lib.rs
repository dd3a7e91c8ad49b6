//! # Relict Limbic Layer
//!
//! The fast, rule-driven half of the character:
//!
//! - **Perception**: substring rules turn text into typed signals and
//!   signals into impulses on the affect vector and trust
//! - **Defense**: hysteresis-governed selection of one behavioral mode
//! - **Manipulation**: ordered rules picking a rhetorical strategy
//!
//! Everything here is either pure or borrows the engine's state and RNG for
//! the duration of one call.

pub mod defense;
pub mod manipulation;
pub mod perception;
mod trust;

pub use defense::{DefenseMode, DefenseStateMachine, StyleTag, Transition};
pub use manipulation::{ManipulationHint, Strategy};
pub use perception::{classify, estimate_salience, Impulse, ImpulseTarget, Signal, SignalKind};
pub use trust::Trust;
