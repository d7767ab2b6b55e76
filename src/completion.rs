//! Completion detection: when is the charging goal over?
//!
//! Two independent questions, asked by two different loops:
//!
//! - the **control loop** stops ticking once docking is settled and the
//!   battery is full, a stop was requested, or the robot is off the dock
//!   ([`CompletionDetector::loop_exit`]);
//! - the **result-wait loop** finishes the goal once the robot is off the
//!   dock *and* out of contact for the whole debounce window, and until
//!   then holds the robot still ([`CompletionDetector::watch`]).

use core::time::Duration;

use crate::config::ChargeConfig;
use crate::dock::DockState;
use crate::telemetry::TelemetrySnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionState {
    Running,
    Completed,
    Aborted,
}

/// Why the control loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    BatteryFull,
    StopRequested,
    LeftDock,
}

/// Verdict of one result-wait iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DockWatch {
    /// Off dock and out of contact, debounce window still running.
    Settling,
    /// Still attached.  `stop_motion` unless undocking was signalled recently.
    Holding { stop_motion: bool },
    /// Off dock and out of contact for the full debounce window.
    Completed,
}

#[derive(Debug, Clone)]
pub struct CompletionDetector {
    debounce: Duration,
    undock_grace: Duration,
    full_level: f32,
    clear_since: Option<Duration>,
}

impl CompletionDetector {
    pub fn new(config: &ChargeConfig) -> Self {
        Self {
            debounce: config.completion_debounce(),
            undock_grace: config.undock_grace(),
            full_level: config.full_battery_level,
            clear_since: None,
        }
    }

    pub fn watch(&mut self, now: Duration, snap: &TelemetrySnapshot) -> DockWatch {
        if !snap.on_dock && !snap.charger.has_contact {
            let since = *self.clear_since.get_or_insert(now);
            if now.saturating_sub(since) >= self.debounce {
                DockWatch::Completed
            } else {
                DockWatch::Settling
            }
        } else {
            self.clear_since = None;
            DockWatch::Holding {
                stop_motion: !self.undocking_active(now, snap),
            }
        }
    }

    /// Undocking was signalled no more than the grace period ago.
    pub fn undocking_active(&self, now: Duration, snap: &TelemetrySnapshot) -> bool {
        snap.undocking && now.saturating_sub(snap.undocking_seen_at) <= self.undock_grace
    }

    pub fn loop_exit(&self, snap: &TelemetrySnapshot, stop_requested: bool) -> Option<LoopExit> {
        if snap.battery >= self.full_level {
            Some(LoopExit::BatteryFull)
        } else if stop_requested {
            Some(LoopExit::StopRequested)
        } else if !snap.on_dock {
            Some(LoopExit::LeftDock)
        } else {
            None
        }
    }
}

/// Final verdict once the result-wait loop is done.  A failed maneuver
/// still counts as completed if the robot reached contact at some point.
pub fn resolve_outcome(cancelled: bool, dock: DockState, contact_seen: bool) -> CompletionState {
    if cancelled || (dock == DockState::Failed && !contact_seen) {
        CompletionState::Aborted
    } else {
        CompletionState::Completed
    }
}
