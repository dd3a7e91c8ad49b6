//! Trauma index: how much recent, heavy memory weighs on the character.
//!
//! Derived on demand from the episode log and never stored.

use crate::store::Episode;
use relict_core::MemoryConfig;

/// Floor of the age weight, so old heavy episodes never vanish entirely.
const MIN_AGE_WEIGHT: f32 = 0.01;

/// Mean salience of the heavy episodes times their mean age weight.
/// The age weight falls linearly from 1 to the floor over the trauma window.
pub fn trauma_index<'a, I>(episodes: I, now: f64, config: &MemoryConfig) -> f32
where
    I: IntoIterator<Item = &'a Episode>,
{
    let mut count = 0usize;
    let mut salience_sum = 0.0f32;
    let mut age_weight_sum = 0.0f32;

    for episode in episodes {
        if episode.salience <= config.trauma_threshold {
            continue;
        }
        let age = now - episode.created_at;
        let weight = (1.0 - age / config.trauma_window_secs) as f32;
        count += 1;
        salience_sum += episode.salience;
        age_weight_sum += weight.max(MIN_AGE_WEIGHT);
    }

    if count == 0 {
        return 0.0;
    }
    let n = count as f32;
    relict_core::sanitize_unit((salience_sum / n) * (age_weight_sum / n))
}
