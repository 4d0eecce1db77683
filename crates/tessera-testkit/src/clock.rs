//! Manually driven clock for deterministic time-based tests.

use parking_lot::Mutex;
use std::time::Duration;
use tessera_core::{Clock, Timestamp};

/// Clock whose current instant is set by the test.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Timestamp>,
}

impl ManualClock {
    /// Create a clock reporting `now`.
    pub fn at(now: Timestamp) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Set the current instant.
    pub fn set(&self, now: Timestamp) {
        *self.now.lock() = now;
    }

    /// Move the clock forward.
    pub fn advance(&self, duration: Duration) {
        let mut now = self.now.lock();
        *now = now.plus(duration);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock()
    }
}
