//! Seedable randomness
//!
//! One generator per engine. The consumers draw in a fixed order each tick,
//! so the same seed and the same input sequence reproduce the same run.

use rand::seq::SliceRandom;
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

#[derive(Debug, Clone)]
pub struct EngineRng {
    seed: u64,
    inner: ChaCha8Rng,
}

impl EngineRng {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            inner: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Use `seed` when given, otherwise draw one from the OS. The chosen seed
    /// is logged so an unseeded run can still be replayed.
    pub fn from_seed_or_random(seed: Option<u64>) -> Self {
        let seed = seed.unwrap_or_else(|| rand::thread_rng().next_u64());
        tracing::info!("Engine RNG seed: {}", seed);
        Self::new(seed)
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform in [0, 1).
    pub fn next_f32(&mut self) -> f32 {
        self.inner.gen::<f32>()
    }

    /// True with probability `p`. Consumes exactly one draw regardless of `p`.
    pub fn chance(&mut self, p: f64) -> bool {
        let roll = self.inner.gen::<f64>();
        p.is_finite() && roll < p
    }

    /// Symmetric noise in [-width/2, width/2).
    pub fn jitter(&mut self, width: f32) -> f32 {
        (self.next_f32() - 0.5) * width
    }

    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        items.choose(&mut self.inner)
    }
}
