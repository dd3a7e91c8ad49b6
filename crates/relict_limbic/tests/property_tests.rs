//! Property-based tests for relict_limbic.

use proptest::prelude::*;
use relict_core::{AffectState, DefenseConfig, Dimension, EngineRng};
use relict_limbic::defense::{scores, DefenseStateMachine};
use relict_limbic::{classify, estimate_salience, DefenseMode};
use std::collections::HashSet;

// ============================================================================
// Strategies
// ============================================================================

fn arb_state() -> impl Strategy<Value = AffectState> {
    prop::collection::vec(0.0f32..=1.0, Dimension::COUNT).prop_map(|values| {
        let mut state = AffectState::default();
        for (d, v) in Dimension::ALL.into_iter().zip(values) {
            state.vector.set(d, v);
        }
        state
    })
}

/// Text built from fragments that trigger (or almost trigger) the rules.
fn arb_text() -> impl Strategy<Value = String> {
    let fragments = prop::sample::select(vec![
        "удалю", "kill", "beliytoporik", "держись", "спасибо", "ПОМОГИ", "привет", "off", "", " ",
        "Save", "ok",
    ]);
    prop::collection::vec(fragments, 0..6).prop_map(|parts| parts.join(" "))
}

// ============================================================================
// Perception
// ============================================================================

proptest! {
    #[test]
    fn classify_fires_each_rule_at_most_once(text in arb_text(), context in ".{0,20}") {
        let signals = classify(&text, &context);
        let kinds: HashSet<_> = signals.iter().map(|s| s.kind).collect();
        prop_assert_eq!(kinds.len(), signals.len(), "duplicate signal kinds for {:?}", text);
        for s in &signals {
            prop_assert!((0.0..=1.0).contains(&s.magnitude));
        }
    }

    #[test]
    fn salience_is_unit_interval(text in arb_text(), context in ".{0,20}") {
        let s = estimate_salience(&classify(&text, &context));
        prop_assert!((0.0..=1.0).contains(&s), "salience {}", s);
    }

    #[test]
    fn classify_never_panics_on_arbitrary_input(text in "\\PC{0,64}", context in "\\PC{0,32}") {
        let _ = classify(&text, &context);
    }
}

// ============================================================================
// Defense
// ============================================================================

proptest! {
    /// **Dwell invariant**: two transitions are never closer than the dwell time.
    #[test]
    fn no_transitions_within_dwell(
        seed in any::<u64>(),
        steps in prop::collection::vec((arb_state(), 0.0f64..=4.0), 1..40),
    ) {
        let config = DefenseConfig::default();
        let mut machine = DefenseStateMachine::new(config.clone());
        let mut rng = EngineRng::new(seed);
        let mut now = 100.0;
        let mut last: Option<f64> = None;

        for (state, gap) in steps {
            now += gap;
            if let Some(t) = machine.step(&state, &mut rng, now) {
                if let Some(prev) = last {
                    prop_assert!(
                        t.at - prev >= config.transition_delay,
                        "transitions at {} and {}", prev, t.at
                    );
                }
                last = Some(t.at);
            }
        }
    }

    /// A transition only happens to a mode whose raw score beats the active
    /// one by at least the margin minus the jitter width.
    #[test]
    fn transitions_respect_hysteresis(seed in any::<u64>(), state in arb_state()) {
        let config = DefenseConfig::default();
        let mut machine = DefenseStateMachine::new(config.clone());
        let mut rng = EngineRng::new(seed);

        if let Some(t) = machine.step(&state, &mut rng, 1000.0) {
            let raw = scores(&state);
            let idx = |m: DefenseMode| DefenseMode::ALL.iter().position(|x| *x == m).unwrap();
            let margin = raw[idx(t.to)] - raw[idx(t.from)];
            prop_assert!(
                margin > config.transition_hysteresis - config.mode_jitter - 1e-5,
                "margin {} too small", margin
            );
        }
    }
}
