//! End-to-end goal lifecycle through `ChargeServer` with real threads.

use std::sync::Arc;
use std::time::Duration;

use charge_manager::adapters::recovery::{FileRecoveryStore, MemoryRecoveryStore};
use charge_manager::app::events::{CancelResponse, FeedbackState};
use charge_manager::app::ports::RecoveryStore;
use charge_manager::completion::{CompletionState, LoopExit};
use charge_manager::error::GoalRejected;
use charge_manager::recovery::RecoveryRecord;
use charge_manager::{ChargeConfig, ChargeServer, ChargingGoal};

use crate::mock_ports::{ADDR, DockBehaviour, MockPorts, MockSafety, Recorder, wait_until};

const LONG: Duration = Duration::from_secs(5);

fn fast_config() -> ChargeConfig {
    ChargeConfig {
        tick_interval_ms: 10,
        result_poll_interval_ms: 10,
        service_wait_timeout_ms: 1,
        dock_server_wait_timeout_ms: 1,
        stale_report_guard_ms: 10,
        charge_request_interval_ms: 20,
        undock_grace_ms: 50,
        completion_debounce_ms: 30,
        ..Default::default()
    }
}

struct Rig {
    server: ChargeServer<MockPorts, MockSafety>,
    record: Recorder,
    store: MemoryRecoveryStore,
    held: Arc<std::sync::Mutex<Option<charge_manager::app::ports::DockSession>>>,
}

fn rig(dock: DockBehaviour) -> Rig {
    let ports = MockPorts::new(dock);
    let record = ports.record.clone();
    let held = Arc::clone(&ports.held);
    let safety = MockSafety {
        record: record.clone(),
    };
    let store = MemoryRecoveryStore::new();
    let server = ChargeServer::new(fast_config(), ports, safety, Arc::new(store.clone())).unwrap();
    Rig {
        server,
        record,
        store,
        held,
    }
}

#[test]
fn charge_until_full_then_leave_dock() {
    let rig = rig(DockBehaviour::Succeed);
    let telemetry = rig.server.telemetry();
    telemetry.set_battery(0.4);
    telemetry.set_on_dock(true);
    // Left over from before the goal; ignored.
    telemetry.set_charger(true, true, ADDR);

    let handle = rig.server.accept(ChargingGoal::new(ADDR).unwrap()).unwrap();
    assert!(rig.server.is_goal_active());
    assert_eq!(rig.store.history(), vec![format!("1\n{ADDR}")]);
    assert_eq!(handle.state(), CompletionState::Running);
    telemetry.set_charger(true, false, "");

    // Contact without current: the charger is asked to begin charging.
    assert!(wait_until(LONG, || rig.record.with(|r| r.charge_requests >= 1)));
    telemetry.set_charger(true, true, ADDR);
    assert!(wait_until(LONG, || {
        rig.record
            .feedback_states()
            .contains(&FeedbackState::Charging)
    }));
    assert!(wait_until(LONG, || rig.record.with(|r| r.stop_motion > 0)));

    telemetry.set_battery(1.02);
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(handle.state(), CompletionState::Running);

    telemetry.set_on_dock(false);
    telemetry.set_charger(false, false, ADDR);
    let result = handle.wait_timeout(LONG).expect("goal should finish");
    assert!(result.success);
    assert_eq!(result.outcome, CompletionState::Completed);
    assert_eq!(result.exit, Some(LoopExit::BatteryFull));
    assert_eq!(handle.state(), CompletionState::Completed);

    assert!(!rig.server.is_goal_active());
    assert_eq!(
        rig.store.history(),
        vec![format!("1\n{ADDR}"), format!("0\n{ADDR}")]
    );
    rig.record.with(|r| {
        assert_eq!(r.dock_dispatches, 1);
        assert_eq!(r.docking_published.last(), Some(&false));
    });
}

#[test]
fn second_goal_rejected_while_active() {
    let rig = rig(DockBehaviour::Hold);
    let first = rig.server.accept(ChargingGoal::new(ADDR).unwrap()).unwrap();
    let second = rig.server.accept(ChargingGoal::new("11:22:33:44:55:66").unwrap());
    assert_eq!(second.unwrap_err(), GoalRejected::Busy);

    assert_eq!(first.cancel(), CancelResponse::Accepted);
    let result = first.wait();
    assert_eq!(result.outcome, CompletionState::Aborted);

    // The flag is clear by the time the result is observable.
    let again = rig
        .server
        .accept(ChargingGoal::new("11:22:33:44:55:66").unwrap())
        .unwrap();
    again.cancel();
    assert!(again.wait_timeout(LONG).is_some());
}

#[test]
fn cancel_during_docking_aborts() {
    let rig = rig(DockBehaviour::Hold);
    let handle = rig.server.accept(ChargingGoal::new(ADDR).unwrap()).unwrap();
    assert!(wait_until(LONG, || rig.record.with(|r| r.dock_dispatches == 1)));
    assert!(wait_until(LONG, || rig.record.feedback_states().contains(&FeedbackState::Docking)));

    assert_eq!(handle.cancel(), CancelResponse::Accepted);
    // Idempotent from the owner's side too.
    assert_eq!(handle.cancel(), CancelResponse::Accepted);

    let result = handle.wait_timeout(LONG).expect("cancel should finish the goal");
    assert!(!result.success);
    assert_eq!(result.outcome, CompletionState::Aborted);
    assert_eq!(result.exit, Some(LoopExit::StopRequested));
    rig.record.with(|r| {
        assert_eq!(r.dock_cancels, 1);
        assert_eq!(r.dock_dispatches, 1);
    });
    assert!(rig.held.lock().unwrap().is_none());
    assert_eq!(rig.store.history().last().unwrap(), &format!("0\n{ADDR}"));
}

#[test]
fn failed_docking_without_contact_aborts() {
    let rig = rig(DockBehaviour::Fail);
    let handle = rig.server.accept(ChargingGoal::new(ADDR).unwrap()).unwrap();
    let result = handle.wait_timeout(LONG).expect("goal should finish");
    assert_eq!(result.outcome, CompletionState::Aborted);
    assert!(!result.success);
    assert_eq!(result.exit, Some(LoopExit::StopRequested));
    rig.record.with(|r| assert_eq!(r.dock_dispatches, 1));
}

#[test]
fn failed_docking_with_contact_still_completes() {
    let rig = rig(DockBehaviour::Hold);
    let telemetry = rig.server.telemetry();
    let handle = rig.server.accept(ChargingGoal::new(ADDR).unwrap()).unwrap();
    assert!(wait_until(LONG, || rig.record.with(|r| r.dock_dispatches == 1)));

    // Maneuver says no, but the robot is sitting on the contacts.
    telemetry.set_on_dock(true);
    telemetry.set_charger(true, false, ADDR);
    std::thread::sleep(Duration::from_millis(50));
    assert!(MockPorts::finish_held(&rig.held, false));
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(handle.state(), CompletionState::Running);

    telemetry.set_on_dock(false);
    telemetry.set_charger(false, false, ADDR);
    let result = handle.wait_timeout(LONG).expect("goal should finish");
    assert!(result.success);
    assert_eq!(result.outcome, CompletionState::Completed);
}

#[test]
fn restored_goal_skips_docking() {
    let rig = rig(DockBehaviour::Succeed);
    let telemetry = rig.server.telemetry();

    let goal = ChargingGoal::new(ADDR).unwrap().with_restore(true);
    let handle = rig.server.accept(goal).unwrap();
    assert!(telemetry.snapshot().on_dock);
    telemetry.set_charger(true, true, ADDR);
    assert!(wait_until(LONG, || rig.record.with(|r| r.feedback.len() >= 5)));

    telemetry.set_on_dock(false);
    telemetry.set_charger(false, false, ADDR);
    let result = handle.wait_timeout(LONG).expect("goal should finish");
    assert!(result.success);
    rig.record.with(|r| assert_eq!(r.dock_dispatches, 0));
}

#[test]
fn resume_from_file_record() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("charge_restore.txt");
    let store = FileRecoveryStore::new(&path);
    let mut addr = charge_manager::app::commands::DeviceAddress::new();
    addr.push_str(ADDR).unwrap();
    store.save(&RecoveryRecord::active(&addr)).unwrap();

    let ports = MockPorts::new(DockBehaviour::Succeed);
    let record = ports.record.clone();
    let safety = MockSafety {
        record: record.clone(),
    };
    let server = ChargeServer::new(fast_config(), ports, safety, Arc::new(store)).unwrap();
    let handle = server.resume().unwrap().expect("active record resumes");
    assert_eq!(handle.address(), ADDR);

    handle.cancel();
    let result = handle.wait_timeout(LONG).expect("goal should finish");
    assert_eq!(result.outcome, CompletionState::Aborted);
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        format!("0\n{ADDR}")
    );
    record.with(|r| assert_eq!(r.dock_dispatches, 0));

    // Nothing left to resume.
    assert!(server.resume().unwrap().is_none());
}

#[test]
fn server_from_config_persists_to_recovery_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("restore.txt");
    let config = ChargeConfig {
        recovery_path: path.to_string_lossy().into_owned(),
        ..fast_config()
    };
    let ports = MockPorts::new(DockBehaviour::Hold);
    let safety = MockSafety {
        record: ports.record.clone(),
    };
    let server = ChargeServer::from_config(config, ports, safety).unwrap();

    let handle = server.accept(ChargingGoal::new(ADDR).unwrap()).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), format!("1\n{ADDR}"));
    handle.cancel();
    assert!(handle.wait_timeout(LONG).is_some());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), format!("0\n{ADDR}"));
}

#[test]
fn invalid_config_is_rejected() {
    let ports = MockPorts::new(DockBehaviour::Succeed);
    let safety = MockSafety {
        record: ports.record.clone(),
    };
    let config = ChargeConfig {
        tick_interval_ms: 0,
        ..fast_config()
    };
    let store: Arc<dyn RecoveryStore> = Arc::new(MemoryRecoveryStore::new());
    assert!(ChargeServer::new(config, ports, safety, store).is_err());
}
