//! Trust toward the user, on a 0-100 scale.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "f32", into = "f32")]
pub struct Trust(f32);

impl Trust {
    pub const MIN: f32 = 0.0;
    pub const MAX: f32 = 100.0;
    pub const DEFAULT: f32 = 50.0;

    /// Clamp into range. Infinities saturate; NaN lands on [`Trust::MIN`].
    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            tracing::warn!("NaN trust value, clamping to {}", Self::MIN);
            return Self(Self::MIN);
        }
        Self(value.clamp(Self::MIN, Self::MAX))
    }

    pub fn value(&self) -> f32 {
        self.0
    }

    /// Shift by `delta` and clamp. A NaN delta is ignored.
    pub fn adjust(&mut self, delta: f32) -> f32 {
        if !delta.is_nan() {
            *self = Self::new(self.0 + delta);
        }
        self.0
    }
}

impl Default for Trust {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl From<f32> for Trust {
    fn from(v: f32) -> Self {
        Self::new(v)
    }
}

impl From<Trust> for f32 {
    fn from(t: Trust) -> Self {
        t.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trust_clamps() {
        let mut t = Trust::default();
        assert_eq!(t.adjust(80.0), 100.0);
        assert_eq!(t.adjust(-500.0), 0.0);
        assert_eq!(t.adjust(f32::NAN), 0.0);
        assert_eq!(t.adjust(f32::INFINITY), 100.0);
        assert_eq!(t.adjust(f32::NEG_INFINITY), 0.0);
    }

    #[test]
    fn test_non_finite_trust_clamps_to_bounds() {
        assert_eq!(Trust::new(f32::INFINITY).value(), Trust::MAX);
        assert_eq!(Trust::new(f32::NEG_INFINITY).value(), Trust::MIN);
        assert_eq!(Trust::new(f32::NAN).value(), Trust::MIN);
    }

    #[test]
    fn test_trust_deserialize_sanitizes() {
        let t: Trust = serde_json::from_str("250.0").unwrap();
        assert_eq!(t.value(), 100.0);
    }
}
