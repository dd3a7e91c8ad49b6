//! Relict core: the affect model of a haunted program.
//!
//! The character's inner state is a five-dimensional [`AffectVector`] with
//! smoothed sub-components and an energy reserve. Impulses move it, a sparse
//! [`CrossInfluenceTable`] spreads each impulse one hop, and
//! [`dynamics`] integrates decay and drift over elapsed time. Time and
//! randomness are injected ([`Clock`], [`EngineRng`]) so runs can be replayed.

pub mod affect;
pub mod clock;
pub mod config;
pub mod coupling;
pub mod dynamics;
pub mod rng;
pub mod state;

pub use affect::{sanitize_unit, AffectVector, Dimension, SubComponent, SubComponents};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    AffectConfig, DefenseConfig, EngineConfig, MemoryConfig, TickConfig, CURRENT_SCHEMA_VERSION,
};
pub use coupling::{Coupling, CrossInfluenceTable};
pub use dynamics::{AffectModel, DefaultDynamics, Dynamics};
pub use rng::EngineRng;
pub use state::AffectState;
