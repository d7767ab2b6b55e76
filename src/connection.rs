//! Wireless link supervision: pairing attempts and subsystem restarts.
//!
//! ```text
//!          start ok                 connect ok
//!   Down ──────────▶ Up ──(attempt)──────────▶ Up + connected
//!    ▲  (Starting)    │
//!    │                │ attempts >= max
//!    │   stop reply   ▼
//!    └────────── Stopping
//! ```
//!
//! The supervisor never gives up: a subsystem that keeps failing is
//! stopped and started again forever.  Every request is issued with its
//! in-flight flag already set, so a fast tick can never produce two
//! concurrent connect attempts or two starts.

use core::time::Duration;

use log::{debug, info, warn};

use crate::app::commands::DeviceAddress;
use crate::app::events::{Completion, ConnectResponse, SubsystemResponse};
use crate::app::ports::{Reply, WirelessPort};
use crate::config::ChargeConfig;
use crate::runtime::channels::CompletionSender;
use crate::telemetry::ChargerReport;
use crate::throttle::Throttle;

/// Link state as reported in feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    NotSetUp,
    Connecting,
    Connected,
    Failed,
    Rebooting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Subsystem {
    Down,
    Starting,
    Up,
    Stopping,
}

pub struct ConnectionSupervisor {
    address: DeviceAddress,
    max_attempts: u8,
    stale_guard: Duration,
    service_timeout: Duration,
    restart_backoff: Duration,

    subsystem: Subsystem,
    connected: bool,
    attempt_in_flight: bool,
    attempts: u8,
    last_attempt_failed: bool,
    rebooting: bool,
    connected_at: Option<Duration>,
    restart_after: Option<Duration>,

    reboots: u32,
    reported_reboots: u32,
    starts: u32,
    stops: u32,

    service_log: Throttle,
    waiting_log: Throttle,
}

impl ConnectionSupervisor {
    pub fn new(address: &DeviceAddress, config: &ChargeConfig) -> Self {
        Self {
            address: address.clone(),
            max_attempts: config.max_connect_attempts,
            stale_guard: config.stale_report_guard(),
            service_timeout: config.service_wait_timeout(),
            restart_backoff: config.restart_backoff(),
            subsystem: Subsystem::Down,
            connected: false,
            attempt_in_flight: false,
            attempts: 0,
            last_attempt_failed: false,
            rebooting: false,
            connected_at: None,
            restart_after: None,
            reboots: 0,
            reported_reboots: 0,
            starts: 0,
            stops: 0,
            service_log: Throttle::new(Duration::from_secs(5)),
            waiting_log: Throttle::new(Duration::from_secs(10)),
        }
    }

    /// One control step.  Issues at most one request.
    pub fn tick(&mut self, now: Duration, port: &mut impl WirelessPort, queue: &CompletionSender) {
        match self.subsystem {
            Subsystem::Down => self.try_start(now, port, queue),
            Subsystem::Up => self.try_connect(port, queue),
            Subsystem::Starting | Subsystem::Stopping => {
                if self.waiting_log.ready(now) {
                    info!("waiting for wireless subsystem ({:?})", self.subsystem);
                }
            }
        }

        if self.reboots != self.reported_reboots {
            info!("wireless subsystem reboots: {}", self.reboots);
            self.reported_reboots = self.reboots;
        }
    }

    fn try_start(&mut self, now: Duration, port: &mut impl WirelessPort, queue: &CompletionSender) {
        if let Some(at) = self.restart_after {
            if now < at {
                return;
            }
            self.restart_after = None;
        }
        if !port.wait_for_start_service(self.service_timeout) {
            if self.service_log.ready(now) {
                info!("wireless start service not online, waiting");
            }
            return;
        }
        if self.rebooting {
            self.reboots += 1;
        }
        self.subsystem = Subsystem::Starting;
        self.attempt_in_flight = false;
        self.starts += 1;
        info!("starting wireless subsystem");
        port.request_start(Reply::new(queue.clone(), Completion::SubsystemStarted));
    }

    fn try_connect(&mut self, port: &mut impl WirelessPort, queue: &CompletionSender) {
        if self.connected || self.attempt_in_flight {
            return;
        }
        self.attempt_in_flight = true;
        self.attempts += 1;
        info!(
            "connecting to charger {} ({}/{})",
            self.address, self.attempts, self.max_attempts
        );
        port.request_connect(
            &self.address,
            Reply::new(queue.clone(), Completion::Connected),
        );
    }

    pub fn on_started(&mut self, _now: Duration, response: &SubsystemResponse) {
        if self.subsystem != Subsystem::Starting {
            debug!("ignoring unsolicited subsystem start reply");
            return;
        }
        self.rebooting = false;
        if response.success {
            info!("wireless subsystem up: {}", response.info);
            self.subsystem = Subsystem::Up;
            self.last_attempt_failed = false;
        } else {
            warn!("wireless subsystem failed to start: {}", response.info);
            self.subsystem = Subsystem::Down;
        }
    }

    pub fn on_stopped(&mut self, now: Duration, response: &SubsystemResponse) {
        if self.subsystem != Subsystem::Stopping {
            debug!("ignoring unsolicited subsystem stop reply");
            return;
        }
        if response.success {
            info!("wireless subsystem stopped: {}", response.info);
        } else {
            warn!("wireless subsystem stop reported failure: {}", response.info);
        }
        self.subsystem = Subsystem::Down;
        if !self.restart_backoff.is_zero() {
            self.restart_after = Some(now + self.restart_backoff);
        }
    }

    pub fn on_connect_result(
        &mut self,
        now: Duration,
        response: &ConnectResponse,
        port: &mut impl WirelessPort,
        queue: &CompletionSender,
    ) {
        if !self.attempt_in_flight {
            debug!("ignoring stale connect reply");
            return;
        }
        self.attempt_in_flight = false;
        self.connected = response.success;
        self.connected_at = Some(now);
        self.last_attempt_failed = !response.success;
        info!(
            "charger connection {} after {:.1}s: {}",
            if response.success { "up" } else { "failed" },
            response.elapsed.as_secs_f32(),
            response.detail
        );

        if response.success {
            self.attempts = 0;
            self.reboots = 0;
            self.reported_reboots = 0;
        } else if self.attempts >= self.max_attempts {
            warn!(
                "{} connect attempts failed, restarting wireless subsystem",
                self.attempts
            );
            self.attempts = 0;
            self.rebooting = true;
            self.subsystem = Subsystem::Stopping;
            self.stops += 1;
            port.request_stop(Reply::new(queue.clone(), Completion::SubsystemStopped));
        }
    }

    /// Reconcile `connected` with the charger's own pairing report.
    /// Reports that predate the last connect result by less than the
    /// stale guard are ignored.
    pub fn observe_report(&mut self, report: &ChargerReport) {
        let Some(at) = report.reported_at else {
            return;
        };
        if let Some(connected_at) = self.connected_at {
            if at <= connected_at + self.stale_guard {
                return;
            }
        }
        let paired = !report.paired_device.is_empty() && report.paired_device == self.address;
        if paired != self.connected {
            debug!("charger report overrides link state: connected={paired}");
        }
        self.connected = paired;
    }

    pub fn state(&self) -> ConnectionState {
        if self.rebooting || self.subsystem == Subsystem::Stopping {
            return ConnectionState::Rebooting;
        }
        match self.subsystem {
            Subsystem::Down | Subsystem::Starting => ConnectionState::NotSetUp,
            _ if self.connected => ConnectionState::Connected,
            _ if self.attempt_in_flight => ConnectionState::Connecting,
            _ if self.last_attempt_failed => ConnectionState::Failed,
            _ => ConnectionState::Connecting,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn is_set_up(&self) -> bool {
        self.subsystem == Subsystem::Up
    }

    pub fn attempt_in_flight(&self) -> bool {
        self.attempt_in_flight
    }

    pub fn attempts(&self) -> u8 {
        self.attempts
    }

    /// Restarts since the last successful pairing.
    pub fn reboots(&self) -> u32 {
        self.reboots
    }

    pub fn starts(&self) -> u32 {
        self.starts
    }

    pub fn stops(&self) -> u32 {
        self.stops
    }
}
