//! Charge service: the hexagonal core of one charging goal.
//!
//! [`ChargeService`] owns the four supervisors and folds them into one
//! feedback stream.  It exposes two entry points and never blocks on
//! anything but the bounded service waits:
//!
//! - [`ChargeService::tick`]: one fixed-rate control cycle;
//! - [`ChargeService::apply`]: fold in one asynchronous completion.
//!
//! ```text
//!  Completion ──▶ ┌─────────────────────────────┐ ──▶ FeedbackSink
//!                 │        ChargeService         │
//!  Telemetry  ──▶ │ Connection · Dock · Charge  │ ──▶ Wireless / Dock /
//!                 │         · Completion         │     Charger ports
//!                 └─────────────────────────────┘
//! ```

use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;
use std::sync::Arc;

use log::{debug, info};

use crate::charge::{ChargeCircuitState, ChargeMonitor};
use crate::completion::{CompletionDetector, LoopExit};
use crate::config::ChargeConfig;
use crate::connection::ConnectionSupervisor;
use crate::dock::DockSupervisor;
use crate::runtime::channels::CompletionSender;
use crate::telemetry::TelemetrySnapshot;

use super::commands::ChargingGoal;
use super::events::{ChargeFeedback, Completion, FeedbackState};
use super::ports::ControlPorts;

// ───────────────────────────────────────────────────────────────
// Goal flags
// ───────────────────────────────────────────────────────────────

/// Cross-thread flags of one goal.  Written by the goal owner (cancel),
/// the control worker (dock abort, dock settled) and the result-wait loop.
#[derive(Debug, Default)]
pub struct GoalFlags {
    stop: AtomicBool,
    cancelled: AtomicBool,
    dock_settled: AtomicBool,
}

impl GoalFlags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the control loop to wind down.  No new requests are dispatched.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// Cancellation implies stop.
    pub fn request_cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        self.request_stop();
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    pub fn cancel_requested(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn dock_settled(&self) -> bool {
        self.dock_settled.load(Ordering::Acquire)
    }

    fn set_dock_settled(&self, settled: bool) {
        self.dock_settled.store(settled, Ordering::Release);
    }
}

/// Outcome of one control cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub feedback: ChargeFeedback,
    /// Set when the control loop should stop ticking.
    pub exit: Option<LoopExit>,
    pub dock_settled: bool,
}

// ───────────────────────────────────────────────────────────────
// ChargeService
// ───────────────────────────────────────────────────────────────

pub struct ChargeService {
    goal: ChargingGoal,
    connection: ConnectionSupervisor,
    dock: DockSupervisor,
    charge: ChargeMonitor,
    detector: CompletionDetector,
    queue: CompletionSender,
    flags: Arc<GoalFlags>,
    feedback: FeedbackState,
    circuit: ChargeCircuitState,
    contact_seen: bool,
    accepted_at: Duration,
    tick_count: u64,
}

impl ChargeService {
    /// Fresh supervisors for `goal`, accepted at uptime `accepted_at`.
    /// Charger reports received earlier are ignored.  Completions for this
    /// goal must be pushed through `queue`.
    pub fn new(
        goal: ChargingGoal,
        config: &ChargeConfig,
        queue: CompletionSender,
        flags: Arc<GoalFlags>,
        accepted_at: Duration,
    ) -> Self {
        let dock = DockSupervisor::new(goal.skips_docking(), config);
        flags.set_dock_settled(dock.is_settled());
        Self {
            connection: ConnectionSupervisor::new(&goal.address, config),
            dock,
            charge: ChargeMonitor::new(config),
            detector: CompletionDetector::new(config),
            goal,
            queue,
            flags,
            feedback: FeedbackState::Idle,
            circuit: ChargeCircuitState::NoContact,
            contact_seen: false,
            accepted_at,
            tick_count: 0,
        }
    }

    /// Publish the initial feedback before the first tick.
    pub fn announce(&self, ports: &mut impl ControlPorts) {
        ports.emit(&self.current_feedback());
    }

    fn current_feedback(&self) -> ChargeFeedback {
        ChargeFeedback {
            state: self.feedback,
            connection: self.connection.state(),
            dock: self.dock.state(),
            circuit: self.circuit,
        }
    }

    // ── Completions ───────────────────────────────────────────

    pub fn apply(&mut self, completion: Completion, now: Duration, ports: &mut impl ControlPorts) {
        match completion {
            Completion::SubsystemStarted(resp) => self.connection.on_started(now, &resp),
            Completion::SubsystemStopped(resp) => self.connection.on_stopped(now, &resp),
            Completion::Connected(resp) => {
                self.connection
                    .on_connect_result(now, &resp, ports, &self.queue);
            }
            Completion::Dock(event) => {
                if self.dock.on_event(event) {
                    self.flags.request_stop();
                }
            }
            Completion::CancelRequested => {
                info!("charge goal for {} cancelled", self.goal.address);
                self.dock.cancel(ports);
            }
        }
        self.flags.set_dock_settled(self.dock.is_settled());
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one control cycle: link → dock or charge → feedback.
    pub fn tick(
        &mut self,
        now: Duration,
        snap: &TelemetrySnapshot,
        ports: &mut impl ControlPorts,
    ) -> TickReport {
        self.tick_count += 1;
        let stopping = self.flags.stop_requested();
        let snap = &snap.since(self.accepted_at);

        // 1. Wireless link, independent of dock progress
        self.connection.observe_report(&snap.charger);
        if !stopping {
            self.connection.tick(now, ports, &self.queue);
        }

        // 2./3. Docking until settled, then the charge circuit
        if !self.dock.is_settled() {
            if stopping {
                self.dock.cancel(ports);
            } else {
                self.dock.tick(now, ports, &self.queue);
            }
            self.circuit = ChargeCircuitState::from_report(&snap.charger);
        } else if stopping {
            self.circuit = ChargeCircuitState::from_report(&snap.charger);
        } else {
            self.circuit = self.charge.tick(now, &snap.charger, ports);
        }
        self.contact_seen |= snap.charger.has_contact;
        let settled = self.dock.is_settled();
        self.flags.set_dock_settled(settled);

        // 4. Feedback state: connecting > docking > charging
        let next = if self.connection.attempt_in_flight() {
            FeedbackState::ConnectingBluetooth
        } else if self.dock.is_executing() {
            FeedbackState::Docking
        } else if snap.charger.is_charging {
            FeedbackState::Charging
        } else {
            self.feedback
        };
        if next != self.feedback {
            debug!("feedback {} -> {} (tick {})", self.feedback, next, self.tick_count);
            self.feedback = next;
        }

        // 5. Publish
        let feedback = self.current_feedback();
        ports.emit(&feedback);

        let exit = if settled {
            self.detector
                .loop_exit(snap, self.flags.stop_requested())
        } else {
            None
        };
        TickReport {
            feedback,
            exit,
            dock_settled: settled,
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn goal(&self) -> &ChargingGoal {
        &self.goal
    }

    pub fn feedback_state(&self) -> FeedbackState {
        self.feedback
    }

    pub fn connection(&self) -> &ConnectionSupervisor {
        &self.connection
    }

    pub fn dock(&self) -> &DockSupervisor {
        &self.dock
    }

    pub fn charge(&self) -> &ChargeMonitor {
        &self.charge
    }

    /// Charger contact was reported at least once during this goal.
    pub fn contact_seen(&self) -> bool {
        self.contact_seen
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }
}
