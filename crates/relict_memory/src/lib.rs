//! Relict memory and engine.
//!
//! Episodic/semantic memory with forgetting and consolidation, the trauma
//! index derived from it, the on-disk state format, and the
//! [`SimulationEngine`] that ties affect, memory, defense and manipulation
//! into one deterministic tick.

pub mod consolidation;
pub mod coordinator;
pub mod decision;
pub mod error;
pub mod persistence;
pub mod store;
pub mod trauma;

pub use consolidation::ConsolidationResult;
pub use coordinator::SimulationEngine;
pub use decision::{CrisisEvent, DecisionRecord, InspectorView, MemoryExcerpt, StateSnapshot};
pub use error::PersistError;
pub use persistence::PersistedState;
pub use store::{Episode, MemorySnapshot, MemoryStore, SemanticFact};
pub use trauma::trauma_index;
