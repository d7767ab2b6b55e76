//! Port traits: the hexagonal boundary between the charging core and the robot.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ChargeService (domain)
//!      ▲                            │
//!      └──── Reply / DockSession ◀──┘  (completions, via the queue)
//! ```
//!
//! Request-style ports never return their answer directly.  The core hands
//! the adapter a [`Reply`] (or a [`DockSession`]) and the adapter pushes the
//! answer onto the completion queue whenever it arrives, from any thread.
//! The core applies completions in arrival order and never blocks on one.
//!
//! ## Contract notes
//!
//! - A `Reply` may be sent at most once; dropping it unsent is allowed and
//!   simply means the answer never comes (the supervisor keeps waiting).
//! - `wait_for_*` calls must return within their timeout.
//! - **RecoveryStore** writes MUST be atomic: a crash mid-save leaves either
//!   the old record or the new one.

use core::time::Duration;

use crate::app::events::{
    ChargeFeedback, Completion, ConnectResponse, DockEvent, DockFeedback, SubsystemResponse,
};
use crate::error::RecoveryError;
use crate::recovery::RecoveryRecord;
use crate::runtime::channels::CompletionSender;

// ───────────────────────────────────────────────────────────────
// Reply handles
// ───────────────────────────────────────────────────────────────

/// One-shot answer handle for a wireless request.
pub struct Reply<T> {
    queue: CompletionSender,
    wrap: fn(T) -> Completion,
}

impl<T> Reply<T> {
    pub(crate) fn new(queue: CompletionSender, wrap: fn(T) -> Completion) -> Self {
        Self { queue, wrap }
    }

    /// Deliver the answer to the charging core.
    pub fn send(self, value: T) {
        self.queue.push((self.wrap)(value));
    }
}

impl<T> core::fmt::Debug for Reply<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Reply").finish_non_exhaustive()
    }
}

/// Handle given to the docking server for one maneuver request.
///
/// `reject` and `finish` consume the session: a request ends exactly once.
#[derive(Debug)]
pub struct DockSession {
    queue: CompletionSender,
}

impl DockSession {
    pub(crate) fn new(queue: CompletionSender) -> Self {
        Self { queue }
    }

    pub fn accept(&self) {
        self.queue.push(Completion::Dock(DockEvent::Accepted));
    }

    pub fn reject(self) {
        self.queue.push(Completion::Dock(DockEvent::Rejected));
    }

    /// Progress report.  Dropped when the queue is nearly full.
    pub fn feedback(&self, feedback: DockFeedback) {
        self.queue
            .push_lossy(Completion::Dock(DockEvent::Feedback(feedback)));
    }

    pub fn finish(self, is_docked: bool) {
        self.queue
            .push(Completion::Dock(DockEvent::Finished { is_docked }));
    }
}

// ───────────────────────────────────────────────────────────────
// Wireless port (domain → pairing stack)
// ───────────────────────────────────────────────────────────────

/// The wireless pairing subsystem that links the robot to its charger.
pub trait WirelessPort {
    /// Block for at most `timeout` until the start service is reachable.
    fn wait_for_start_service(&mut self, timeout: Duration) -> bool;

    /// Ask the subsystem to start.
    fn request_start(&mut self, reply: Reply<SubsystemResponse>);

    /// Ask the subsystem to stop.
    fn request_stop(&mut self, reply: Reply<SubsystemResponse>);

    /// Ask the subsystem to connect to the charger at `address`.
    fn request_connect(&mut self, address: &str, reply: Reply<ConnectResponse>);
}

// ───────────────────────────────────────────────────────────────
// Dock port (domain → docking maneuver server)
// ───────────────────────────────────────────────────────────────

pub trait DockPort {
    /// Block for at most `timeout` until the maneuver server is reachable.
    fn wait_for_server(&mut self, timeout: Duration) -> bool;

    /// Start the docking maneuver.  Progress flows back through `session`.
    fn execute(&mut self, session: DockSession);

    /// Abort the maneuver in flight, if any.
    fn cancel(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Charger port (domain → charge circuit)
// ───────────────────────────────────────────────────────────────

pub trait ChargerPort {
    /// Ask the charger to close the charge circuit.  Fire-and-forget.
    fn begin_charging(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Feedback sink (domain → goal owner)
// ───────────────────────────────────────────────────────────────

/// Receives one [`ChargeFeedback`] per control tick.
pub trait FeedbackSink {
    fn emit(&mut self, feedback: &ChargeFeedback);
}

// ───────────────────────────────────────────────────────────────
// Safety port (domain → motion / mode indicators)
// ───────────────────────────────────────────────────────────────

/// Motion inhibit and docking indicator, driven from the result-wait loop.
pub trait SafetyPort {
    /// Command zero velocity.
    fn stop_motion(&mut self);

    /// Publish whether the robot is currently in the docking/charging mode.
    fn publish_docking(&mut self, docking: bool);
}

// ───────────────────────────────────────────────────────────────
// Recovery store (domain ↔ persistent flag)
// ───────────────────────────────────────────────────────────────

/// Persists whether a charging goal is in progress.
pub trait RecoveryStore: Send + Sync {
    /// Overwrite the stored record.
    fn save(&self, record: &RecoveryRecord) -> Result<(), RecoveryError>;

    /// Read the stored record.  `Ok(None)` when nothing was ever saved.
    fn load(&self) -> Result<Option<RecoveryRecord>, RecoveryError>;
}

// ───────────────────────────────────────────────────────────────
// Bundle
// ───────────────────────────────────────────────────────────────

/// Everything the control worker drives.
pub trait ControlPorts: WirelessPort + DockPort + ChargerPort + FeedbackSink {}

impl<T> ControlPorts for T where T: WirelessPort + DockPort + ChargerPort + FeedbackSink {}
