//! Mock robot adapters for integration tests.
//!
//! Every port call is recorded in a shared [`Record`] so tests can assert
//! on the full history after the ports have been moved into the server.
//! Wireless requests are answered immediately; the dock answers according
//! to its [`DockBehaviour`].

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use charge_manager::app::events::{
    ChargeFeedback, ConnectResponse, FeedbackState, SubsystemResponse,
};
use charge_manager::app::ports::{
    ChargerPort, DockPort, DockSession, FeedbackSink, Reply, SafetyPort, WirelessPort,
};

pub const ADDR: &str = "AA:BB:CC:DD:EE:FF";

// ── Call record ───────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct Record {
    pub starts: u32,
    pub stops: u32,
    pub connects: Vec<String>,
    pub dock_dispatches: u32,
    pub dock_cancels: u32,
    pub charge_requests: u32,
    pub feedback: Vec<ChargeFeedback>,
    pub stop_motion: u32,
    pub docking_published: Vec<bool>,
}

#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<Record>>);

#[allow(dead_code)]
impl Recorder {
    pub fn with<R>(&self, f: impl FnOnce(&mut Record) -> R) -> R {
        f(&mut self.0.lock().unwrap())
    }

    /// Feedback states with consecutive repeats collapsed.
    pub fn feedback_states(&self) -> Vec<FeedbackState> {
        self.with(|r| {
            let mut states: Vec<FeedbackState> = Vec::new();
            for fb in &r.feedback {
                if states.last() != Some(&fb.state) {
                    states.push(fb.state);
                }
            }
            states
        })
    }
}

// ── Control ports ─────────────────────────────────────────────

#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DockBehaviour {
    /// Accept and finish docked immediately.
    Succeed,
    /// Accept and finish undocked immediately.
    Fail,
    /// Accept and keep the session for the test to finish.
    Hold,
}

pub struct MockPorts {
    pub record: Recorder,
    /// Connect outcomes, consumed in order; success once exhausted.
    pub connect_results: VecDeque<bool>,
    pub dock: DockBehaviour,
    pub dock_available: Arc<AtomicBool>,
    pub held: Arc<Mutex<Option<DockSession>>>,
}

#[allow(dead_code)]
impl MockPorts {
    pub fn new(dock: DockBehaviour) -> Self {
        Self {
            record: Recorder::default(),
            connect_results: VecDeque::new(),
            dock,
            dock_available: Arc::new(AtomicBool::new(true)),
            held: Arc::new(Mutex::new(None)),
        }
    }

    /// Finish the held dock session, if any.
    pub fn finish_held(held: &Mutex<Option<DockSession>>, is_docked: bool) -> bool {
        match held.lock().unwrap().take() {
            Some(session) => {
                session.finish(is_docked);
                true
            }
            None => false,
        }
    }
}

fn ok(info: &str) -> SubsystemResponse {
    SubsystemResponse {
        success: true,
        info: info.to_string(),
    }
}

impl WirelessPort for MockPorts {
    fn wait_for_start_service(&mut self, _timeout: Duration) -> bool {
        true
    }

    fn request_start(&mut self, reply: Reply<SubsystemResponse>) {
        self.record.with(|r| r.starts += 1);
        reply.send(ok("started"));
    }

    fn request_stop(&mut self, reply: Reply<SubsystemResponse>) {
        self.record.with(|r| r.stops += 1);
        reply.send(ok("stopped"));
    }

    fn request_connect(&mut self, address: &str, reply: Reply<ConnectResponse>) {
        self.record.with(|r| r.connects.push(address.to_string()));
        let success = self.connect_results.pop_front().unwrap_or(true);
        reply.send(ConnectResponse {
            success,
            elapsed: Duration::from_millis(5),
            detail: if success { "paired".into() } else { "timeout".into() },
        });
    }
}

impl DockPort for MockPorts {
    fn wait_for_server(&mut self, _timeout: Duration) -> bool {
        self.dock_available.load(Ordering::SeqCst)
    }

    fn execute(&mut self, session: DockSession) {
        self.record.with(|r| r.dock_dispatches += 1);
        session.accept();
        match self.dock {
            DockBehaviour::Succeed => session.finish(true),
            DockBehaviour::Fail => session.finish(false),
            DockBehaviour::Hold => *self.held.lock().unwrap() = Some(session),
        }
    }

    fn cancel(&mut self) {
        self.record.with(|r| r.dock_cancels += 1);
        if let Some(session) = self.held.lock().unwrap().take() {
            session.finish(false);
        }
    }
}

impl ChargerPort for MockPorts {
    fn begin_charging(&mut self) {
        self.record.with(|r| r.charge_requests += 1);
    }
}

impl FeedbackSink for MockPorts {
    fn emit(&mut self, feedback: &ChargeFeedback) {
        self.record.with(|r| r.feedback.push(*feedback));
    }
}

// ── Safety port ───────────────────────────────────────────────

pub struct MockSafety {
    pub record: Recorder,
}

impl SafetyPort for MockSafety {
    fn stop_motion(&mut self) {
        self.record.with(|r| r.stop_motion += 1);
    }

    fn publish_docking(&mut self, docking: bool) {
        self.record.with(|r| r.docking_published.push(docking));
    }
}

// ── Helpers ───────────────────────────────────────────────────

/// Poll `cond` until it holds or `timeout` expires.
#[allow(dead_code)]
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}
