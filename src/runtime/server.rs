//! Charge goal server: admission, the result-wait loop and cancellation.
//!
//! [`ChargeServer`] admits one [`ChargingGoal`] at a time.  Each accepted
//! goal gets two threads:
//!
//! - **charge-control** runs the [`ChargeService`] tick and completion
//!   tasks (see [`control_task`](super::control_task));
//! - **charge-goal** runs the result-wait loop: it holds the robot still
//!   while it is attached to the dock, decides when the goal is over,
//!   persists the recovery record and publishes the [`ChargeResult`].
//!
//! The result-wait loop sleeps on a timer raced against a wake signal, so
//! a cancel is noticed immediately rather than at the next poll.

use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use futures_lite::future;
use log::{error, info, warn};

use crate::adapters::recovery::FileRecoveryStore;
use crate::adapters::time::MonotonicClock;
use crate::app::commands::{ChargingGoal, DeviceAddress};
use crate::app::events::{CancelResponse, ChargeResult, Completion};
use crate::app::ports::{ControlPorts, RecoveryStore, SafetyPort};
use crate::app::service::{ChargeService, GoalFlags};
use crate::completion::{CompletionDetector, CompletionState, DockWatch, resolve_outcome};
use crate::config::ChargeConfig;
use crate::error::{GoalRejected, Result};
use crate::recovery::{RecoveryRecord, resume_goal};
use crate::runtime::channels::{CompletionQueue, CompletionSender};
use crate::runtime::control_task::{self, ControlContext, ControlSummary};
use crate::telemetry::{SharedTelemetry, TelemetryHandle};

type WakeSignal = Signal<CriticalSectionRawMutex, ()>;
type ResultSignal = Signal<CriticalSectionRawMutex, ChargeResult>;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ───────────────────────────────────────────────────────────────
// ChargeServer
// ───────────────────────────────────────────────────────────────

pub struct ChargeServer<P, S> {
    config: ChargeConfig,
    ports: Arc<Mutex<P>>,
    safety: Arc<Mutex<S>>,
    recovery: Arc<dyn RecoveryStore>,
    telemetry: Arc<SharedTelemetry>,
    clock: MonotonicClock,
    active: Arc<AtomicBool>,
}

impl<P, S> ChargeServer<P, S>
where
    P: ControlPorts + Send + 'static,
    S: SafetyPort + Send + 'static,
{
    pub fn new(
        config: ChargeConfig,
        ports: P,
        safety: S,
        recovery: Arc<dyn RecoveryStore>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ports: Arc::new(Mutex::new(ports)),
            safety: Arc::new(Mutex::new(safety)),
            recovery,
            telemetry: Arc::new(SharedTelemetry::new()),
            clock: MonotonicClock::new(),
            active: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Server persisting its recovery record at `config.recovery_path`.
    pub fn from_config(config: ChargeConfig, ports: P, safety: S) -> Result<Self> {
        let store = FileRecoveryStore::new(&config.recovery_path);
        Self::new(config, ports, safety, Arc::new(store))
    }

    /// Writer handle for battery, dock, undocking and charger inputs.
    pub fn telemetry(&self) -> TelemetryHandle {
        TelemetryHandle::new(Arc::clone(&self.telemetry), self.clock)
    }

    pub fn config(&self) -> &ChargeConfig {
        &self.config
    }

    pub fn is_goal_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Resume an interrupted goal from the recovery store, if one is active.
    pub fn resume(&self) -> Result<Option<GoalHandle>> {
        match resume_goal(self.recovery.as_ref())? {
            Some(goal) => Ok(Some(self.accept(goal)?)),
            None => Ok(None),
        }
    }

    /// Admit a goal.  Rejected while another goal is executing.
    pub fn accept(&self, goal: ChargingGoal) -> core::result::Result<GoalHandle, GoalRejected> {
        if self
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            info!("charge goal for {} rejected: busy", goal.address);
            return Err(GoalRejected::Busy);
        }
        info!(
            "charge goal accepted: {} (restore={}, force_docked={})",
            goal.address, goal.restore, goal.force_docked
        );

        if let Err(e) = self.recovery.save(&RecoveryRecord::active(&goal.address)) {
            error!("failed to persist recovery record: {e}");
        }
        if goal.skips_docking() {
            self.telemetry.update(|t| t.on_dock = true);
        }

        let flags = Arc::new(GoalFlags::new());
        let wake = Arc::new(WakeSignal::new());
        let result = Arc::new(ResultSignal::new());
        let queue = CompletionQueue::new();
        let sender = queue.sender();
        let address = goal.address.clone();
        let accepted_at = self.clock.uptime();
        let service = ChargeService::new(
            goal,
            &self.config,
            queue.sender(),
            Arc::clone(&flags),
            accepted_at,
        );

        let ctx = ControlContext {
            ports: Arc::clone(&self.ports),
            telemetry: Arc::clone(&self.telemetry),
            clock: self.clock,
            period: self.config.tick_interval(),
        };
        let control = match control_task::spawn(service, queue, ctx) {
            Ok(handle) => handle,
            Err(e) => {
                error!("failed to spawn charge control worker: {e}");
                self.active.store(false, Ordering::Release);
                return Err(GoalRejected::WorkerUnavailable);
            }
        };

        let worker = GoalWorker {
            address: address.clone(),
            detector: CompletionDetector::new(&self.config),
            poll: self.config.result_poll_interval(),
            accepted_at,
            safety: Arc::clone(&self.safety),
            recovery: Arc::clone(&self.recovery),
            telemetry: Arc::clone(&self.telemetry),
            clock: self.clock,
            active: Arc::clone(&self.active),
            flags: Arc::clone(&flags),
            wake: Arc::clone(&wake),
            result: Arc::clone(&result),
        };
        let spawned = thread::Builder::new()
            .name("charge-goal".into())
            .stack_size(super::WORKER_STACK_KB * 1024)
            .spawn(move || worker.run(control));
        if let Err(e) = spawned {
            error!("failed to spawn charge goal worker: {e}");
            // The control worker exits on its next tick.
            flags.request_cancel();
            sender.push(Completion::CancelRequested);
            self.active.store(false, Ordering::Release);
            return Err(GoalRejected::WorkerUnavailable);
        }

        Ok(GoalHandle {
            address,
            flags,
            queue: sender,
            wake,
            result,
        })
    }
}

// ───────────────────────────────────────────────────────────────
// Result-wait loop
// ───────────────────────────────────────────────────────────────

struct GoalWorker<S> {
    address: DeviceAddress,
    detector: CompletionDetector,
    poll: Duration,
    accepted_at: Duration,
    safety: Arc<Mutex<S>>,
    recovery: Arc<dyn RecoveryStore>,
    telemetry: Arc<SharedTelemetry>,
    clock: MonotonicClock,
    active: Arc<AtomicBool>,
    flags: Arc<GoalFlags>,
    wake: Arc<WakeSignal>,
    result: Arc<ResultSignal>,
}

impl<S: SafetyPort> GoalWorker<S> {
    fn run(mut self, control: JoinHandle<ControlSummary>) {
        let mut contact_seen = false;

        loop {
            let now = self.clock.uptime();
            let snap = self.telemetry.snapshot().since(self.accepted_at);
            contact_seen |= snap.charger.has_contact;

            if self.flags.cancel_requested() {
                info!("charge goal for {} cancelled, stopping", self.address);
                break;
            }

            if self.flags.dock_settled() {
                match self.detector.watch(now, &snap) {
                    DockWatch::Completed => {
                        info!("robot off the dock and out of contact, finishing charge goal");
                        break;
                    }
                    DockWatch::Holding { stop_motion } => {
                        let mut safety = lock(&self.safety);
                        safety.publish_docking(true);
                        if stop_motion {
                            safety.stop_motion();
                        }
                    }
                    DockWatch::Settling => {}
                }
            } else {
                lock(&self.safety).publish_docking(true);
            }

            self.sleep();
        }

        self.flags.request_stop();
        let summary = match control.join() {
            Ok(summary) => Some(summary),
            Err(_) => {
                error!("charge control worker panicked");
                None
            }
        };

        let dock = summary.map_or(crate::dock::DockState::Failed, |s| s.dock);
        let contact_seen = contact_seen || summary.is_some_and(|s| s.contact_seen);
        let outcome = resolve_outcome(self.flags.cancel_requested(), dock, contact_seen);
        let exit = summary.map(|s| s.exit);

        if let Err(e) = self.recovery.save(&RecoveryRecord::inactive(&self.address)) {
            error!("failed to persist recovery record: {e}");
        }
        lock(&self.safety).publish_docking(false);

        info!("charge goal for {} finished: {:?}", self.address, outcome);
        if outcome != CompletionState::Completed {
            warn!("charge goal did not complete (dock {:?}, exit {:?})", dock, exit);
        }
        self.active.store(false, Ordering::Release);
        self.result.signal(ChargeResult::new(outcome, exit));
    }

    /// Poll-interval sleep that a cancel cuts short.
    fn sleep(&self) {
        future::block_on(future::or(self.wake.wait(), async {
            async_io_mini::Timer::after(self.poll).await;
        }));
    }
}

// ───────────────────────────────────────────────────────────────
// GoalHandle
// ───────────────────────────────────────────────────────────────

/// Owner's handle on an accepted goal.
pub struct GoalHandle {
    address: DeviceAddress,
    flags: Arc<GoalFlags>,
    queue: CompletionSender,
    wake: Arc<WakeSignal>,
    result: Arc<ResultSignal>,
}

impl GoalHandle {
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Request cancellation.  Always accepted; cleanup is asynchronous.
    pub fn cancel(&self) -> CancelResponse {
        info!("cancel requested for charge goal {}", self.address);
        self.flags.request_cancel();
        self.queue.push(Completion::CancelRequested);
        self.wake.signal(());
        CancelResponse::Accepted
    }

    /// Current verdict; `Running` until the result is published.
    pub fn state(&self) -> CompletionState {
        match self.result.try_take() {
            Some(result) => {
                self.result.signal(result);
                result.outcome
            }
            None => CompletionState::Running,
        }
    }

    /// Block until the goal finishes.
    pub fn wait(self) -> ChargeResult {
        future::block_on(self.result.wait())
    }

    /// Block for at most `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<ChargeResult> {
        let result = future::block_on(future::or(
            async { Some(self.result.wait().await) },
            async {
                async_io_mini::Timer::after(timeout).await;
                None
            },
        ))?;
        // Keep it observable for later waits.
        self.result.signal(result);
        Some(result)
    }
}

impl core::fmt::Debug for GoalHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GoalHandle")
            .field("address", &self.address)
            .field("state", &self.state())
            .finish()
    }
}
