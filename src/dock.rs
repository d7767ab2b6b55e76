//! Docking maneuver supervision.
//!
//! The maneuver is requested at most once per goal.  A rejected request is
//! treated as "server busy" and re-issued on a later tick; an accepted one
//! runs to a terminal result, which is recorded exactly once.  Goals that
//! resume on the dock skip the maneuver entirely.

use core::time::Duration;

use log::{debug, info, warn};

use crate::app::events::DockEvent;
use crate::app::ports::{DockPort, DockSession};
use crate::config::ChargeConfig;
use crate::runtime::channels::CompletionSender;
use crate::throttle::Throttle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DockState {
    NotStarted,
    InProgress,
    Succeeded,
    Failed,
}

impl DockState {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

pub struct DockSupervisor {
    state: DockState,
    executing: bool,
    cancelled: bool,
    dispatches: u32,
    server_timeout: Duration,
    wait_log: Throttle,
}

impl DockSupervisor {
    /// `skip` marks docking as already done (resumed or force-docked goal).
    pub fn new(skip: bool, config: &ChargeConfig) -> Self {
        Self {
            state: if skip {
                DockState::Succeeded
            } else {
                DockState::NotStarted
            },
            executing: false,
            cancelled: false,
            dispatches: 0,
            server_timeout: config.dock_server_wait_timeout(),
            wait_log: Throttle::new(Duration::from_secs(2)),
        }
    }

    pub fn tick(&mut self, now: Duration, port: &mut impl DockPort, queue: &CompletionSender) {
        if self.is_settled() || self.executing {
            return;
        }
        if !port.wait_for_server(self.server_timeout) {
            if self.wait_log.ready(now) {
                info!("dock maneuver server not available");
            }
            return;
        }
        self.executing = true;
        self.state = DockState::InProgress;
        self.dispatches += 1;
        info!("requesting docking maneuver");
        port.execute(DockSession::new(queue.clone()));
    }

    /// Apply a maneuver event.  Returns `true` when the goal must abort.
    pub fn on_event(&mut self, event: DockEvent) -> bool {
        match event {
            DockEvent::Accepted => {
                info!("dock request accepted");
                false
            }
            DockEvent::Rejected => {
                info!("dock request rejected, will retry");
                self.executing = false;
                false
            }
            DockEvent::Feedback(fb) => {
                info!(
                    "dock feedback: sees_target={} state={} info={}",
                    fb.sees_target, fb.state, fb.info
                );
                false
            }
            DockEvent::Finished { is_docked } => {
                if self.state.is_terminal() {
                    debug!("ignoring duplicate dock result");
                    return false;
                }
                self.executing = false;
                info!("dock result: is_docked={is_docked}");
                if is_docked {
                    self.state = DockState::Succeeded;
                    false
                } else {
                    warn!("docking failed, aborting charge goal");
                    self.state = DockState::Failed;
                    true
                }
            }
        }
    }

    /// Cancel the maneuver in flight.  Idempotent.
    pub fn cancel(&mut self, port: &mut impl DockPort) {
        if self.cancelled {
            return;
        }
        self.cancelled = true;
        if self.executing {
            info!("cancelling docking maneuver");
            port.cancel();
        }
    }

    /// Docking no longer gates the charge monitor.
    pub fn is_settled(&self) -> bool {
        self.state.is_terminal() || self.cancelled
    }

    pub fn is_executing(&self) -> bool {
        self.executing
    }

    pub fn state(&self) -> DockState {
        self.state
    }

    pub fn dispatches(&self) -> u32 {
        self.dispatches
    }
}
