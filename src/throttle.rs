//! Interval throttle over an injected monotonic timestamp.
//!
//! Used for the charge-circuit request spacing and for rate-limiting
//! repetitive "still waiting" log lines.

use core::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct Throttle {
    period: Duration,
    last: Option<Duration>,
}

impl Throttle {
    pub const fn new(period: Duration) -> Self {
        Self { period, last: None }
    }

    /// Returns `true` (and arms the throttle) if more than `period` has
    /// elapsed since the last time it returned `true`.
    pub fn ready(&mut self, now: Duration) -> bool {
        match self.last {
            Some(last) if now.saturating_sub(last) <= self.period => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}
