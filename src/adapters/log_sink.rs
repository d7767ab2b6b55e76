//! Log-based feedback sink adapter.
//!
//! Implements [`FeedbackSink`] by writing goal feedback to the `log`
//! facade.  State changes are logged at info, the per-tick repeats at
//! debug.  A sink that forwards feedback to the goal's caller implements
//! the same trait.

use log::{debug, info};

use crate::app::events::{ChargeFeedback, FeedbackState};
use crate::app::ports::FeedbackSink;

/// Adapter that logs every [`ChargeFeedback`].
#[derive(Debug, Default)]
pub struct LogFeedbackSink {
    last: Option<FeedbackState>,
    records: u64,
}

impl LogFeedbackSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feedback records seen so far.
    pub fn records(&self) -> u64 {
        self.records
    }
}

impl FeedbackSink for LogFeedbackSink {
    fn emit(&mut self, feedback: &ChargeFeedback) {
        self.records += 1;
        if self.last == Some(feedback.state) {
            debug!(
                "CHARGE | state={} | link={:?} dock={:?} circuit={:?}",
                feedback.state, feedback.connection, feedback.dock, feedback.circuit
            );
        } else {
            info!(
                "CHARGE | state={} | link={:?} dock={:?} circuit={:?}",
                feedback.state, feedback.connection, feedback.dock, feedback.circuit
            );
            self.last = Some(feedback.state);
        }
    }
}
