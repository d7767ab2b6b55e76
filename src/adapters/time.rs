//! Monotonic time adapter.
//!
//! Every timestamp in the charging core is a [`Duration`] since this clock
//! was created.  The core never reads the clock itself: the runtime samples
//! it once per step and passes `now` down, which keeps the supervisors
//! deterministic under test.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    start: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Time since the clock was created (monotonic).
    pub fn uptime(&self) -> Duration {
        self.start.elapsed()
    }
}
