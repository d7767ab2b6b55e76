//! Asynchronous completions and outbound goal events.
//!
//! Everything the outside world reports back to the charging core arrives
//! as a [`Completion`] on the completion queue.  Everything the core
//! reports outward is either a [`ChargeFeedback`] (once per tick, through
//! the [`FeedbackSink`](super::ports::FeedbackSink) port) or the terminal
//! [`ChargeResult`].

use core::fmt;
use core::time::Duration;

use crate::charge::ChargeCircuitState;
use crate::completion::{CompletionState, LoopExit};
use crate::connection::ConnectionState;
use crate::dock::DockState;

// ───────────────────────────────────────────────────────────────
// Inbound completions
// ───────────────────────────────────────────────────────────────

/// A reply from the wireless stack, the docking server, or the goal owner.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// Reply to a subsystem start request.
    SubsystemStarted(SubsystemResponse),
    /// Reply to a subsystem stop request.
    SubsystemStopped(SubsystemResponse),
    /// Reply to a connect request.
    Connected(ConnectResponse),
    /// Progress of the docking maneuver.
    Dock(DockEvent),
    /// The goal owner asked for cancellation.
    CancelRequested,
}

/// Result of a wireless subsystem start/stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubsystemResponse {
    pub success: bool,
    pub info: String,
}

/// Result of a connect attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectResponse {
    pub success: bool,
    pub elapsed: Duration,
    pub detail: String,
}

/// Lifecycle of one docking maneuver request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DockEvent {
    /// The server took the request.
    Accepted,
    /// The server refused the request; it may be re-issued.
    Rejected,
    /// Intermediate progress, informational only.
    Feedback(DockFeedback),
    /// Terminal result.
    Finished { is_docked: bool },
}

/// Progress report from the docking server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockFeedback {
    pub sees_target: bool,
    pub state: String,
    pub info: String,
}

// ───────────────────────────────────────────────────────────────
// Outbound feedback
// ───────────────────────────────────────────────────────────────

/// Coarse goal progress published on every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedbackState {
    #[default]
    Idle,
    ConnectingBluetooth,
    Docking,
    Charging,
}

impl FeedbackState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::ConnectingBluetooth => "connecting_bluetooth",
            Self::Docking => "docking",
            Self::Charging => "charging",
        }
    }
}

impl fmt::Display for FeedbackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One feedback record, published per control tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChargeFeedback {
    pub state: FeedbackState,
    pub connection: ConnectionState,
    pub dock: DockState,
    pub circuit: ChargeCircuitState,
}

// ───────────────────────────────────────────────────────────────
// Terminal outcome
// ───────────────────────────────────────────────────────────────

/// Final result of a charging goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChargeResult {
    /// `true` only when the goal reached [`CompletionState::Completed`].
    pub success: bool,
    pub outcome: CompletionState,
    /// Why the control loop stopped, when it stopped on its own.
    pub exit: Option<LoopExit>,
}

impl ChargeResult {
    pub fn new(outcome: CompletionState, exit: Option<LoopExit>) -> Self {
        Self {
            success: outcome == CompletionState::Completed,
            outcome,
            exit,
        }
    }
}

/// Answer to a cancel request.  Cancellation is always accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelResponse {
    Accepted,
}
