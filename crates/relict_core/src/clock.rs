//! Injectable time source
//!
//! Every time-dependent rule (decay, dwell time, memory aging) reads seconds
//! from a [`Clock`], never from the system directly. Tests and replays drive a
//! [`ManualClock`] and get bit-identical runs.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub trait Clock: Send + Sync {
    /// Seconds since the Unix epoch.
    fn now(&self) -> f64;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        Utc::now().timestamp_micros() as f64 / 1_000_000.0
    }
}

/// A clock that only moves when told to. Clones share the same time, so a
/// test can keep a handle after passing one into the engine.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    bits: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start_secs: f64) -> Self {
        let clock = Self::default();
        clock.set(start_secs);
        clock
    }

    pub fn set(&self, secs: f64) {
        let secs = if secs.is_finite() { secs } else { 0.0 };
        self.bits.store(secs.to_bits(), Ordering::SeqCst);
    }

    pub fn advance(&self, secs: f64) {
        self.set(self.now() + secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }
}

/// Convert clock seconds to a UTC timestamp for display.
pub fn to_datetime(secs: f64) -> DateTime<Utc> {
    if !secs.is_finite() {
        return DateTime::<Utc>::default();
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9) as u32;
    DateTime::from_timestamp(whole as i64, nanos).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::new(100.0);
        let handle = clock.clone();
        handle.advance(6.5);
        assert_eq!(clock.now(), 106.5);
    }

    #[test]
    fn test_manual_clock_rejects_nan() {
        let clock = ManualClock::new(f64::NAN);
        assert_eq!(clock.now(), 0.0);
    }

    #[test]
    fn test_system_clock_is_recent() {
        // Anything after 2020-01-01.
        assert!(SystemClock.now() > 1_577_836_800.0);
    }

    #[test]
    fn test_to_datetime() {
        assert_eq!(to_datetime(0.0).timestamp(), 0);
        assert_eq!(to_datetime(86_400.5).timestamp(), 86_400);
        assert_eq!(to_datetime(f64::INFINITY).timestamp(), 0);
    }
}
