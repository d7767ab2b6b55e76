//! Control worker: fixed-rate tick plus completion handling.
//!
//! Runs in a dedicated thread using `edge-executor` for cooperative
//! scheduling and `async-io-mini` for reactor-driven timers.  Two tasks
//! share the [`ChargeService`]:
//!
//! 1. **Tick**: one control cycle per tick interval; returns when the
//!    service reports a loop exit.
//! 2. **Completions**: `queue.next().await`, applied as they arrive.
//!
//! Both tasks run on the same thread, so the service lives in an
//! `Rc<RefCell<_>>` and is never borrowed across an await point.

use core::cell::RefCell;
use core::time::Duration;
use std::io;
use std::rc::Rc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use log::info;

use crate::adapters::time::MonotonicClock;
use crate::app::ports::ControlPorts;
use crate::app::service::ChargeService;
use crate::completion::LoopExit;
use crate::dock::DockState;
use crate::runtime::channels::CompletionQueue;
use crate::telemetry::SharedTelemetry;

/// What the control worker leaves behind when it stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlSummary {
    pub exit: LoopExit,
    pub dock: DockState,
    pub contact_seen: bool,
    pub ticks: u64,
}

/// Everything the worker needs besides the service itself.
pub(crate) struct ControlContext<P> {
    pub ports: Arc<Mutex<P>>,
    pub telemetry: Arc<SharedTelemetry>,
    pub clock: MonotonicClock,
    pub period: Duration,
}

type SharedService = Rc<RefCell<ChargeService>>;

fn lock<P>(ports: &Mutex<P>) -> MutexGuard<'_, P> {
    ports.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn completion_loop<P: ControlPorts>(
    service: SharedService,
    queue: CompletionQueue,
    ports: Arc<Mutex<P>>,
    clock: MonotonicClock,
) {
    loop {
        let completion = queue.next().await;
        let mut ports = lock(&ports);
        service
            .borrow_mut()
            .apply(completion, clock.uptime(), &mut *ports);
    }
}

async fn tick_loop<P: ControlPorts>(service: SharedService, ctx: &ControlContext<P>) -> LoopExit {
    let mut deadline = Instant::now();
    loop {
        let snapshot = ctx.telemetry.snapshot();
        let report = {
            let mut ports = lock(&ctx.ports);
            service
                .borrow_mut()
                .tick(ctx.clock.uptime(), &snapshot, &mut *ports)
        };
        if let Some(exit) = report.exit {
            return exit;
        }

        deadline += ctx.period;
        let now = Instant::now();
        if deadline > now {
            async_io_mini::Timer::after(deadline - now).await;
        } else {
            // Overran the period: realign and let completions run.
            deadline = now;
            futures_lite::future::yield_now().await;
        }
    }
}

fn run_control_loop<P: ControlPorts>(
    service: ChargeService,
    queue: CompletionQueue,
    ctx: ControlContext<P>,
) -> ControlSummary {
    let service: SharedService = Rc::new(RefCell::new(service));
    let executor: edge_executor::LocalExecutor<'_, 4> = edge_executor::LocalExecutor::new();

    executor
        .spawn(completion_loop(
            service.clone(),
            queue,
            ctx.ports.clone(),
            ctx.clock,
        ))
        .detach();

    service.borrow().announce(&mut *lock(&ctx.ports));
    info!(
        "charge control loop started for {} ({} ms tick)",
        service.borrow().goal().address,
        ctx.period.as_millis()
    );

    let exit = futures_lite::future::block_on(executor.run(tick_loop(service.clone(), &ctx)));

    let service = service.borrow();
    let summary = ControlSummary {
        exit,
        dock: service.dock().state(),
        contact_seen: service.contact_seen(),
        ticks: service.tick_count(),
    };
    info!(
        "charge control loop stopped: {:?} after {} ticks (dock {:?})",
        summary.exit, summary.ticks, summary.dock
    );
    summary
}

/// Spawn the control worker thread.
pub(crate) fn spawn<P: ControlPorts + Send + 'static>(
    service: ChargeService,
    queue: CompletionQueue,
    ctx: ControlContext<P>,
) -> io::Result<JoinHandle<ControlSummary>> {
    thread::Builder::new()
        .name("charge-control".into())
        .stack_size(super::WORKER_STACK_KB * 1024)
        .spawn(move || run_control_loop(service, queue, ctx))
}
