//! Latest robot telemetry, shared between ingestion and the charging goal.
//!
//! Battery level, dock presence, the undocking signal and the charger's
//! contact report are written by whatever subscribes to the robot's topics
//! (through a [`TelemetryHandle`]) and read by the control and result-wait
//! loops as an atomic [`TelemetrySnapshot`].  Readers always get one
//! consistent copy; there is no torn read between fields.

use core::cell::RefCell;
use core::time::Duration;
use std::sync::Arc;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use log::warn;

use crate::adapters::time::MonotonicClock;
use crate::app::commands::DeviceAddress;

/// Most recent report from the charging station.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChargerReport {
    /// Robot's contacts touch the charger.
    pub has_contact: bool,
    /// Charger is delivering current.
    pub is_charging: bool,
    /// Address of the device the charger is paired with (empty if none).
    pub paired_device: DeviceAddress,
    /// When the report was received.  `None` until the first report.
    pub reported_at: Option<Duration>,
}

impl ChargerReport {
    /// Received before `since`.  Unstamped reports are never stale.
    pub fn is_older_than(&self, since: Duration) -> bool {
        self.reported_at.is_some_and(|at| at < since)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetrySnapshot {
    /// Battery fraction, 0.0–1.0.
    pub battery: f32,
    pub on_dock: bool,
    pub undocking: bool,
    /// When `undocking` was last written.
    pub undocking_seen_at: Duration,
    pub charger: ChargerReport,
}

impl TelemetrySnapshot {
    /// Copy with a charger report received before `since` replaced by an
    /// empty one.  A goal only trusts reports that arrived after it was
    /// accepted.
    pub fn since(&self, since: Duration) -> Self {
        let mut snap = self.clone();
        if snap.charger.is_older_than(since) {
            snap.charger = ChargerReport::default();
        }
        snap
    }
}

/// Interior-mutable telemetry cell.
pub struct SharedTelemetry {
    inner: Mutex<CriticalSectionRawMutex, RefCell<TelemetrySnapshot>>,
}

impl Default for SharedTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedTelemetry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(TelemetrySnapshot::default())),
        }
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.inner.lock(|cell| cell.borrow().clone())
    }

    pub fn update(&self, f: impl FnOnce(&mut TelemetrySnapshot)) {
        self.inner.lock(|cell| f(&mut cell.borrow_mut()));
    }
}

/// Writer handle for telemetry ingestion.  Cheap to clone.
#[derive(Clone)]
pub struct TelemetryHandle {
    shared: Arc<SharedTelemetry>,
    clock: MonotonicClock,
}

impl TelemetryHandle {
    pub(crate) fn new(shared: Arc<SharedTelemetry>, clock: MonotonicClock) -> Self {
        Self { shared, clock }
    }

    pub fn set_battery(&self, fraction: f32) {
        self.shared.update(|t| t.battery = fraction);
    }

    /// Store a charger report, stamped with the current time.
    pub fn set_charger(&self, has_contact: bool, is_charging: bool, paired_device: &str) {
        let mut paired = DeviceAddress::new();
        if paired.push_str(paired_device).is_err() {
            warn!(
                "charger reported an oversized paired id ({} bytes), treating as unpaired",
                paired_device.len()
            );
            paired.clear();
        }
        let now = self.clock.uptime();
        self.shared.update(|t| {
            t.charger = ChargerReport {
                has_contact,
                is_charging,
                paired_device: paired,
                reported_at: Some(now),
            };
        });
    }

    pub fn set_on_dock(&self, on_dock: bool) {
        self.shared.update(|t| t.on_dock = on_dock);
    }

    pub fn set_undocking(&self, undocking: bool) {
        let now = self.clock.uptime();
        self.shared.update(|t| {
            t.undocking = undocking;
            t.undocking_seen_at = now;
        });
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.shared.snapshot()
    }
}

impl core::fmt::Debug for TelemetryHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TelemetryHandle").finish_non_exhaustive()
    }
}
