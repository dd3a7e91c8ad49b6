//! State Dynamics: how the affect state evolves between and during events
//!
//! Two kinds of change are kept apart:
//! - impulses (`apply_delta`): discrete jumps caused by perception, spread one
//!   hop through the [`CrossInfluenceTable`];
//! - continuous time (`advance`): decay, drift, sub-component smoothing and
//!   energy, integrated once per tick over the elapsed seconds.
//!
//! Every rule is either linear with a clamp or an exponential approach to a
//! bounded target, so any elapsed gap (including days) lands inside [0, 1].

use crate::affect::{Dimension, SubComponent, SubComponents, AffectVector};
use crate::config::AffectConfig;
use crate::coupling::CrossInfluenceTable;
use crate::state::AffectState;

/// Longest gap integrated in one step. Every rule saturates well before this.
const MAX_STEP_SECS: f64 = 1.0e7;

/// Share of the per-action energy cost drained per second of exhaustion.
const EXHAUSTION_DRAIN: f32 = 0.2;

/// Obsession decays at this fraction of the slow rate.
const OBSESSION_DECAY_FACTOR: f32 = 0.8;

/// Trait for implementing continuous-time affect dynamics
pub trait Dynamics: Send + Sync {
    /// Advance the state by `dt_secs` of elapsed time.
    fn advance(&self, state: &mut AffectState, dt_secs: f64);
}

/// Map any elapsed time to a usable step: non-finite or negative gaps are
/// treated as zero, huge gaps are capped.
pub fn sanitize_dt(dt_secs: f64) -> f64 {
    if dt_secs.is_finite() && dt_secs > 0.0 {
        dt_secs.min(MAX_STEP_SECS)
    } else {
        0.0
    }
}

/// Default decay/drift rules.
#[derive(Debug, Clone, Default)]
pub struct DefaultDynamics {
    pub config: AffectConfig,
}

impl DefaultDynamics {
    pub fn new(config: AffectConfig) -> Self {
        Self { config }
    }
}

impl Dynamics for DefaultDynamics {
    fn advance(&self, state: &mut AffectState, dt_secs: f64) {
        let dt = sanitize_dt(dt_secs);
        if dt == 0.0 {
            return;
        }
        let c = &self.config;
        let dt32 = dt as f32;

        // === Decay toward zero ===
        state.vector.add(Dimension::Panic, -c.decay_fast * dt32);
        state.vector.add(Dimension::Malice, -c.decay_slow * dt32);
        state
            .vector
            .add(Dimension::Obsession, -c.decay_slow * OBSESSION_DECAY_FACTOR * dt32);

        // === Corruption drift ===
        // Creeps upward on its own; hope holds it back.
        let hope = state.vector.get(Dimension::Hope);
        state.vector.add(
            Dimension::Corruption,
            (c.corruption_drift - hope * c.hope_damping) * dt32,
        );

        // === Sub-components ===
        smooth_sub_components(&mut state.sub_components, &state.vector, dt);

        // === Energy ===
        let d_energy = if state.vector.get(Dimension::Panic) > c.exhaustion_threshold {
            -c.energy_cost_per_action * EXHAUSTION_DRAIN * dt32
        } else {
            c.energy_recovery_rate * dt32
        };
        state.energy += d_energy;

        state.normalize();
    }
}

/// Exponential approach of each sub-component toward `parent * GAIN`.
/// The result always lies between the old value and the target.
fn smooth_sub_components(sub: &mut SubComponents, vector: &AffectVector, dt: f64) {
    for component in SubComponent::ALL {
        let target = vector.get(component.parent()) * SubComponent::GAIN;
        let keep = (component.retention_per_sec() as f64).powf(dt) as f32;
        let current = sub.get(component);
        sub.set(component, target + (current - target) * keep);
    }
}

/// The affect model: owns the state, the coupling table and the dynamics.
#[derive(Debug, Clone)]
pub struct AffectModel<D: Dynamics = DefaultDynamics> {
    state: AffectState,
    coupling: CrossInfluenceTable,
    dynamics: D,
}

impl AffectModel<DefaultDynamics> {
    pub fn new(config: AffectConfig) -> Self {
        Self::with_dynamics(DefaultDynamics::new(config), CrossInfluenceTable::default())
    }
}

impl Default for AffectModel<DefaultDynamics> {
    fn default() -> Self {
        Self::new(AffectConfig::default())
    }
}

impl<D: Dynamics> AffectModel<D> {
    pub fn with_dynamics(dynamics: D, coupling: CrossInfluenceTable) -> Self {
        Self {
            state: AffectState::default(),
            coupling,
            dynamics,
        }
    }

    pub fn with_coupling(mut self, coupling: CrossInfluenceTable) -> Self {
        self.coupling = coupling;
        self
    }

    /// Add `amount` to `dimension`, clamp, then push `amount * coefficient`
    /// into every coupled target. The propagated quantity is the raw amount,
    /// not what survived the clamp. An infinite amount saturates its targets
    /// at the matching bound; NaN carries no direction and is ignored.
    pub fn apply_delta(&mut self, dimension: Dimension, amount: f32) {
        if amount.is_nan() {
            tracing::warn!("Ignoring NaN delta on {}", dimension);
            return;
        }
        self.state.vector.add(dimension, amount);
        for (target, coefficient) in self.coupling.targets_of(dimension) {
            // inf * 0 is NaN
            if coefficient != 0.0 {
                self.state.vector.add(target, amount * coefficient);
            }
        }
    }

    /// Like [`apply_delta`](Self::apply_delta) but by name. Unknown names are a no-op.
    pub fn apply_delta_named(&mut self, name: &str, amount: f32) {
        match Dimension::parse_str(name) {
            Some(d) => self.apply_delta(d, amount),
            None => tracing::debug!("apply_delta on unknown dimension '{}' ignored", name),
        }
    }

    /// Integrate decay, drift, smoothing and energy over `dt_secs`.
    pub fn advance(&mut self, dt_secs: f64) {
        self.dynamics.advance(&mut self.state, dt_secs);
    }

    pub fn get(&self, dimension: Dimension) -> f32 {
        self.state.vector.get(dimension)
    }

    pub fn state(&self) -> &AffectState {
        &self.state
    }

    pub fn vector(&self) -> &AffectVector {
        &self.state.vector
    }

    pub fn sub_components(&self) -> &SubComponents {
        &self.state.sub_components
    }

    pub fn energy(&self) -> f32 {
        self.state.energy
    }

    pub fn coupling(&self) -> &CrossInfluenceTable {
        &self.coupling
    }

    /// Replace the whole state (used when loading persisted state).
    pub fn restore(&mut self, mut state: AffectState) {
        state.normalize();
        self.state = state;
    }

    /// Back to construction defaults. Coupling and dynamics are kept.
    pub fn reset(&mut self) {
        self.state = AffectState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> AffectModel {
        AffectModel::default()
    }

    #[test]
    fn test_apply_delta_propagates_unclamped_amount() {
        let mut m = model();
        m.restore(AffectState {
            vector: {
                let mut v = AffectVector::default();
                v.set(Dimension::Panic, 0.95);
                v
            },
            ..Default::default()
        });
        let malice_before = m.get(Dimension::Malice);

        // Panic saturates at 1.0, but malice must see the full 0.5 * 0.02.
        m.apply_delta(Dimension::Panic, 0.5);
        assert_eq!(m.get(Dimension::Panic), 1.0);
        assert!((m.get(Dimension::Malice) - (malice_before + 0.01)).abs() < 1e-6);
    }

    #[test]
    fn test_apply_delta_is_one_hop() {
        // obsession -> malice -> panic would cascade if propagation recursed.
        let mut m = model();
        let panic_before = m.get(Dimension::Panic);
        m.apply_delta(Dimension::Obsession, 0.5);
        assert!(m.get(Dimension::Malice) > 0.02);
        assert_eq!(m.get(Dimension::Panic), panic_before);
    }

    #[test]
    fn test_negative_coupling() {
        let mut m = model();
        let panic_before = m.get(Dimension::Panic);
        m.apply_delta(Dimension::Hope, 0.3);
        assert!(m.get(Dimension::Panic) < panic_before);
    }

    #[test]
    fn test_unknown_and_nan_deltas_are_noops() {
        let mut m = model();
        let before = *m.state();
        m.apply_delta_named("trauma", 0.5);
        m.apply_delta(Dimension::Panic, f32::NAN);
        assert_eq!(*m.state(), before);
    }

    #[test]
    fn test_infinite_delta_saturates_through_coupling() {
        let table = CrossInfluenceTable::empty()
            .with_link(Dimension::Malice, Dimension::Hope, -0.5)
            .with_link(Dimension::Malice, Dimension::Obsession, 0.0);
        let mut m = AffectModel::new(AffectConfig::default()).with_coupling(table);
        assert!(m.coupling().targets_of(Dimension::Panic).next().is_none());

        m.apply_delta(Dimension::Malice, f32::INFINITY);
        assert_eq!(m.get(Dimension::Malice), 1.0);
        assert_eq!(m.get(Dimension::Hope), 0.0);
        assert_eq!(m.get(Dimension::Obsession), 0.0);

        m.apply_delta(Dimension::Malice, f32::NEG_INFINITY);
        assert_eq!(m.get(Dimension::Malice), 0.0);
        assert_eq!(m.get(Dimension::Hope), 1.0);
    }

    #[test]
    fn test_with_coupling_replaces_table() {
        let table = CrossInfluenceTable::empty().with_link(Dimension::Hope, Dimension::Malice, 0.5);
        let mut m = AffectModel::new(AffectConfig::default()).with_coupling(table);
        let panic = m.get(Dimension::Panic);
        m.apply_delta(Dimension::Hope, 0.2);
        // default Hope -> Panic link is gone
        assert_eq!(m.get(Dimension::Panic), panic);
        assert!((m.get(Dimension::Malice) - (0.02 + 0.1)).abs() < 1e-6);
    }

    #[test]
    fn test_apply_delta_named() {
        let mut m = model();
        m.apply_delta_named("Obsession", 0.4);
        assert!((m.get(Dimension::Obsession) - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_advance_zero_is_noop() {
        let mut m = model();
        m.apply_delta(Dimension::Panic, 0.6);
        m.advance(1.0);
        let before = *m.state();
        m.advance(0.0);
        assert_eq!(*m.state(), before);
        m.advance(-5.0);
        m.advance(f64::NAN);
        assert_eq!(*m.state(), before);
    }

    #[test]
    fn test_panic_decays_faster_than_malice() {
        let mut m = model();
        m.apply_delta(Dimension::Panic, 0.5);
        m.apply_delta(Dimension::Malice, 0.5);
        let panic_before = m.get(Dimension::Panic);
        let malice_before = m.get(Dimension::Malice);
        m.advance(2.0);
        assert!(panic_before - m.get(Dimension::Panic) > malice_before - m.get(Dimension::Malice));
    }

    #[test]
    fn test_corruption_drifts_up_without_hope() {
        let mut m = model();
        m.apply_delta(Dimension::Hope, -1.0);
        let before = m.get(Dimension::Corruption);
        m.advance(100.0);
        assert!(m.get(Dimension::Corruption) > before);
    }

    #[test]
    fn test_sub_components_track_parent() {
        let mut m = model();
        m.apply_delta(Dimension::Panic, 0.9);
        m.advance(0.5);
        let startle = m.sub_components().get(SubComponent::Startle);
        let dread = m.sub_components().get(SubComponent::Dread);
        assert!(startle > 0.0);
        // Dread lags behind startle.
        assert!(dread < startle);
        assert!(startle <= SubComponent::GAIN);
    }

    #[test]
    fn test_energy_drains_under_panic_and_recovers() {
        let mut m = model();
        m.apply_delta(Dimension::Panic, 1.0);
        m.advance(1.0);
        assert!(m.energy() < 1.0);

        let mut calm = model();
        calm.restore(AffectState {
            energy: 0.2,
            ..Default::default()
        });
        calm.advance(10.0);
        assert!(calm.energy() > 0.2);
    }

    #[test]
    fn test_extreme_dt_stability() {
        let mut m = model();
        m.apply_delta(Dimension::Panic, 1.0);
        m.apply_delta(Dimension::Obsession, 1.0);

        // A week-long pause in one step.
        m.advance(7.0 * 86_400.0);
        for (_, v) in m.vector().iter() {
            assert!(v.is_finite() && (0.0..=1.0).contains(&v));
        }
        for (_, v) in m.sub_components().iter() {
            assert!(v.is_finite() && (0.0..=1.0).contains(&v));
        }
        assert!(m.energy().is_finite() && (0.0..=1.0).contains(&m.energy()));

        m.advance(f64::MAX);
        assert_eq!(m.get(Dimension::Panic), 0.0);
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut m = model();
        m.apply_delta(Dimension::Malice, 0.8);
        m.reset();
        assert_eq!(*m.state(), AffectState::default());
    }
}
