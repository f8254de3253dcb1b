//! Wall-clock sources for the host runtime.
//!
//! The engine never reads the time itself; every operation takes `now`.
//! The host asks a `WallClock` so tests can substitute a manual one.

use crate::types::{Seconds, Timestamp};
use std::sync::atomic::{AtomicU64, Ordering};

pub trait WallClock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// System time via chrono, millisecond resolution.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn now(&self) -> Timestamp {
        chrono::Utc::now().timestamp_millis() as f64 / 1000.0
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    bits: AtomicU64,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            bits: AtomicU64::new(start.to_bits()),
        }
    }

    pub fn set(&self, now: Timestamp) {
        self.bits.store(now.to_bits(), Ordering::SeqCst);
    }

    /// Move forward by `by` seconds. Returns the new time.
    pub fn advance(&self, by: Seconds) -> Timestamp {
        let next = self.now() + by;
        self.set(next);
        next
    }
}

impl WallClock for ManualClock {
    fn now(&self) -> Timestamp {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }
}
