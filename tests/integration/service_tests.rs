//! ChargeService scenarios driven tick by tick with mock adapters.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use charge_manager::app::events::FeedbackState;
use charge_manager::app::service::{ChargeService, GoalFlags};
use charge_manager::completion::LoopExit;
use charge_manager::connection::ConnectionState;
use charge_manager::dock::DockState;
use charge_manager::runtime::channels::CompletionQueue;
use charge_manager::telemetry::TelemetrySnapshot;
use charge_manager::{ChargeConfig, ChargingGoal};

use crate::mock_ports::{ADDR, DockBehaviour, MockPorts};

struct Harness {
    service: ChargeService,
    queue: CompletionQueue,
    flags: Arc<GoalFlags>,
    ports: MockPorts,
    now: Duration,
}

impl Harness {
    fn new(goal: ChargingGoal, ports: MockPorts) -> Self {
        Self::accepted_at(goal, ports, Duration::ZERO)
    }

    /// Goal accepted at uptime `at`; the initial feedback is published.
    fn accepted_at(goal: ChargingGoal, mut ports: MockPorts, at: Duration) -> Self {
        let queue = CompletionQueue::new();
        let flags = Arc::new(GoalFlags::new());
        let service = ChargeService::new(
            goal,
            &ChargeConfig::default(),
            queue.sender(),
            Arc::clone(&flags),
            at,
        );
        service.announce(&mut ports);
        Self {
            service,
            queue,
            flags,
            ports,
            now: at,
        }
    }

    /// One 1 Hz tick, then every completion it produced.
    fn step(&mut self, snap: &TelemetrySnapshot) -> Option<LoopExit> {
        self.now += Duration::from_secs(1);
        let report = self.service.tick(self.now, snap, &mut self.ports);
        while let Some(c) = self.queue.try_next() {
            self.service.apply(c, self.now, &mut self.ports);
        }
        report.exit
    }
}

fn snapshot(on_dock: bool, contact: bool, charging: bool) -> TelemetrySnapshot {
    let mut s = TelemetrySnapshot {
        battery: 0.3,
        on_dock,
        ..Default::default()
    };
    s.charger.has_contact = contact;
    s.charger.is_charging = charging;
    s
}

#[test]
fn full_charge_feedback_sequence() {
    let ports = MockPorts::new(DockBehaviour::Hold);
    ports.dock_available.store(false, Ordering::SeqCst);
    let held = Arc::clone(&ports.held);
    let available = Arc::clone(&ports.dock_available);
    let record = ports.record.clone();
    let mut h = Harness::new(ChargingGoal::new(ADDR).unwrap(), ports);

    let away = snapshot(false, false, false);
    h.step(&away); // subsystem start
    h.step(&away); // connect attempt
    available.store(true, Ordering::SeqCst);
    h.step(&away); // dock dispatch
    assert_eq!(h.service.dock().state(), DockState::InProgress);
    assert!(MockPorts::finish_held(&held, true));
    h.step(&snapshot(true, true, false)); // dock result applied
    h.step(&snapshot(true, true, false)); // charge request
    h.step(&snapshot(true, true, true));

    assert_eq!(
        record.feedback_states(),
        vec![
            FeedbackState::Idle,
            FeedbackState::ConnectingBluetooth,
            FeedbackState::Docking,
            FeedbackState::Charging,
        ]
    );
    assert_eq!(h.service.connection().state(), ConnectionState::Connected);
    record.with(|r| {
        assert_eq!(r.connects, vec![ADDR.to_string()]);
        assert_eq!(r.dock_dispatches, 1);
        assert!(r.charge_requests >= 1);
    });
}

#[test]
fn feedback_sequence_with_dock_server_up_from_the_start() {
    let ports = MockPorts::new(DockBehaviour::Hold);
    let held = Arc::clone(&ports.held);
    let record = ports.record.clone();
    let mut h = Harness::new(ChargingGoal::new(ADDR).unwrap(), ports);
    assert_eq!(record.feedback_states(), vec![FeedbackState::Idle]);

    let away = snapshot(false, false, false);
    h.step(&away); // subsystem start + dock dispatch
    h.step(&away); // connect attempt
    h.step(&away);
    assert!(MockPorts::finish_held(&held, true));
    h.step(&snapshot(true, true, false)); // dock result applied
    h.step(&snapshot(true, true, false)); // charge request
    h.step(&snapshot(true, true, true));

    // The maneuver goes out on the first tick, before the link is up.
    assert_eq!(
        record.feedback_states(),
        vec![
            FeedbackState::Idle,
            FeedbackState::Docking,
            FeedbackState::ConnectingBluetooth,
            FeedbackState::Docking,
            FeedbackState::Charging,
        ]
    );
    record.with(|r| {
        assert_eq!(r.dock_dispatches, 1);
        assert_eq!(r.connects.len(), 1);
    });
}

#[test]
fn charger_report_from_before_acceptance_is_ignored() {
    let ports = MockPorts::new(DockBehaviour::Hold);
    let record = ports.record.clone();
    let mut h = Harness::accepted_at(
        ChargingGoal::new(ADDR).unwrap(),
        ports,
        Duration::from_secs(5),
    );

    // Left over from a previous goal: paired with us and in contact.
    let mut leftover = snapshot(false, true, true);
    leftover.charger.paired_device.push_str(ADDR).unwrap();
    leftover.charger.reported_at = Some(Duration::from_millis(1));
    for _ in 0..5 {
        h.step(&leftover);
    }

    record.with(|r| assert_eq!(r.connects, vec![ADDR.to_string()]));
    assert!(!h.service.contact_seen());

    // A report that arrives during the goal counts again.
    let mut fresh = leftover.clone();
    fresh.charger.reported_at = Some(h.now);
    h.step(&fresh);
    assert!(h.service.contact_seen());
    assert!(h.service.connection().is_connected());
}

#[test]
fn repeated_connect_failures_restart_the_subsystem() {
    let mut ports = MockPorts::new(DockBehaviour::Hold);
    ports.connect_results = [false, false, false, false, true].into_iter().collect();
    let record = ports.record.clone();
    let mut h = Harness::new(ChargingGoal::new(ADDR).unwrap(), ports);

    let away = snapshot(false, false, false);
    for _ in 0..12 {
        h.step(&away);
    }
    record.with(|r| {
        assert_eq!(r.stops, 2);
        assert_eq!(r.starts, 3);
        assert_eq!(r.connects.len(), 5);
    });
    assert!(h.service.connection().is_connected());
    assert_eq!(h.service.connection().attempts(), 0);
    assert_eq!(h.service.connection().reboots(), 0);
}

#[test]
fn dock_failure_aborts_without_redispatch() {
    let ports = MockPorts::new(DockBehaviour::Fail);
    let record = ports.record.clone();
    let mut h = Harness::new(ChargingGoal::new(ADDR).unwrap(), ports);

    let exit = h.step(&snapshot(false, false, false));
    assert_eq!(exit, None);
    assert!(h.flags.stop_requested());
    assert_eq!(h.service.dock().state(), DockState::Failed);

    let exit = h.step(&snapshot(false, false, false));
    assert_eq!(exit, Some(LoopExit::StopRequested));
    record.with(|r| assert_eq!(r.dock_dispatches, 1));
}

#[test]
fn full_battery_ends_control_loop_on_dock() {
    let ports = MockPorts::new(DockBehaviour::Succeed);
    let mut h = Harness::new(ChargingGoal::new(ADDR).unwrap().with_force_docked(true), ports);
    let mut snap = snapshot(true, true, true);
    assert_eq!(h.step(&snap), None);
    snap.battery = 1.02;
    assert_eq!(h.step(&snap), Some(LoopExit::BatteryFull));
}

#[test]
fn charging_requests_stop_once_circuit_closes() {
    let ports = MockPorts::new(DockBehaviour::Succeed);
    let record = ports.record.clone();
    let mut h = Harness::new(ChargingGoal::new(ADDR).unwrap().with_restore(true), ports);
    // 1 Hz, 2 s spacing: t=1, t=4.
    for _ in 0..4 {
        h.step(&snapshot(true, true, false));
    }
    let before = record.with(|r| r.charge_requests);
    assert_eq!(before, 2);
    for _ in 0..5 {
        h.step(&snapshot(true, true, true));
    }
    record.with(|r| assert_eq!(r.charge_requests, before));
}
