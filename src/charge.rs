//! Charge circuit monitoring.
//!
//! Contact without current means the circuit still has to be closed: keep
//! asking the charger to begin charging, at most once per request
//! interval, until it reports charging or contact is lost.

use core::time::Duration;

use log::debug;

use crate::app::ports::ChargerPort;
use crate::config::ChargeConfig;
use crate::telemetry::ChargerReport;
use crate::throttle::Throttle;

/// Derived each tick from the charger report; never stored on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChargeCircuitState {
    #[default]
    NoContact,
    AwaitingCharge,
    Charging,
}

impl ChargeCircuitState {
    pub fn from_report(report: &ChargerReport) -> Self {
        match (report.has_contact, report.is_charging) {
            (false, _) => Self::NoContact,
            (true, false) => Self::AwaitingCharge,
            (true, true) => Self::Charging,
        }
    }
}

pub struct ChargeMonitor {
    throttle: Throttle,
    requests: u32,
}

impl ChargeMonitor {
    pub fn new(config: &ChargeConfig) -> Self {
        Self {
            throttle: Throttle::new(config.charge_request_interval()),
            requests: 0,
        }
    }

    pub fn tick(
        &mut self,
        now: Duration,
        report: &ChargerReport,
        port: &mut impl ChargerPort,
    ) -> ChargeCircuitState {
        let state = ChargeCircuitState::from_report(report);
        if state == ChargeCircuitState::AwaitingCharge && self.throttle.ready(now) {
            self.requests += 1;
            debug!("contact without current, requesting charge (#{})", self.requests);
            port.begin_charging();
        }
        state
    }

    /// Begin-charging requests issued so far.
    pub fn requests(&self) -> u32 {
        self.requests
    }
}
