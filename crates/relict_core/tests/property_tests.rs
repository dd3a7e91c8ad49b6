//! Property-based tests for relict_core.
//!
//! Any sequence of impulses and elapsed times must leave the affect state
//! finite and inside [0, 1].

use proptest::prelude::*;
use relict_core::{AffectModel, AffectState, Dimension, SubComponent};

// ============================================================================
// Strategies
// ============================================================================

fn arb_dimension() -> impl Strategy<Value = Dimension> {
    prop::sample::select(Dimension::ALL.to_vec())
}

/// Mostly ordinary deltas, sometimes garbage.
fn arb_amount() -> impl Strategy<Value = f32> {
    prop_oneof![
        8 => -2.0f32..=2.0,
        1 => Just(f32::NAN),
        1 => Just(f32::INFINITY),
        1 => Just(f32::NEG_INFINITY),
    ]
}

fn arb_dt() -> impl Strategy<Value = f64> {
    prop_oneof![
        6 => 0.0f64..=10.0,
        2 => 0.0f64..=1.0e6,
        1 => Just(f64::NAN),
        1 => -100.0f64..=0.0,
    ]
}

#[derive(Debug, Clone)]
enum Op {
    Delta(Dimension, f32),
    Advance(f64),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (arb_dimension(), arb_amount()).prop_map(|(d, a)| Op::Delta(d, a)),
        arb_dt().prop_map(Op::Advance),
    ]
}

fn assert_in_bounds(state: &AffectState) -> Result<(), TestCaseError> {
    for (d, v) in state.vector.iter() {
        prop_assert!(v.is_finite() && (0.0..=1.0).contains(&v), "{} out of range: {}", d, v);
    }
    for (c, v) in state.sub_components.iter() {
        prop_assert!(
            v.is_finite() && (0.0..=1.0).contains(&v),
            "{} out of range: {}",
            c.as_str(),
            v
        );
    }
    prop_assert!(
        state.energy.is_finite() && (0.0..=1.0).contains(&state.energy),
        "energy out of range: {}",
        state.energy
    );
    Ok(())
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// **Core invariant**: bounds hold after any operation sequence.
    #[test]
    fn state_stays_bounded(ops in prop::collection::vec(arb_op(), 0..60)) {
        let mut model = AffectModel::default();
        for op in ops {
            match op {
                Op::Delta(d, a) => model.apply_delta(d, a),
                Op::Advance(dt) => model.advance(dt),
            }
            assert_in_bounds(model.state())?;
        }
    }

    /// Zero elapsed time changes nothing.
    #[test]
    fn advance_zero_is_identity(ops in prop::collection::vec(arb_op(), 0..20)) {
        let mut model = AffectModel::default();
        for op in ops {
            match op {
                Op::Delta(d, a) => model.apply_delta(d, a),
                Op::Advance(dt) => model.advance(dt),
            }
        }
        let before = *model.state();
        model.advance(0.0);
        prop_assert_eq!(*model.state(), before);
    }

    /// Sub-components stay between their old value and their target.
    #[test]
    fn sub_components_move_toward_target(
        panic in 0.0f32..=1.0,
        malice in 0.0f32..=1.0,
        dt in 0.001f64..=1000.0,
    ) {
        let mut model = AffectModel::default();
        model.apply_delta(Dimension::Panic, panic);
        model.apply_delta(Dimension::Malice, malice);
        model.advance(dt);
        for c in SubComponent::ALL {
            let v = model.sub_components().get(c);
            prop_assert!(v <= SubComponent::GAIN + 1e-6, "{} overshot gain: {}", c.as_str(), v);
        }
    }

    /// Without impulses, panic never rises.
    #[test]
    fn panic_decays_monotonically(
        start in 0.0f32..=1.0,
        steps in prop::collection::vec(0.0f64..=50.0, 1..20),
    ) {
        let mut model = AffectModel::default();
        model.apply_delta(Dimension::Hope, -1.0);
        model.apply_delta(Dimension::Panic, start);
        let mut last = model.get(Dimension::Panic);
        for dt in steps {
            model.advance(dt);
            let now = model.get(Dimension::Panic);
            prop_assert!(now <= last, "panic rose from {} to {}", last, now);
            last = now;
        }
    }
}
