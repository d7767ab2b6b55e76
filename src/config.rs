//! Charge manager configuration parameters
//!
//! Every tunable of the charging goal lives here.  Defaults reproduce the
//! behaviour of the deployed charge action server; values can be
//! overridden from a JSON document.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Core charge manager configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChargeConfig {
    // --- Timing ---
    /// Control tick interval (milliseconds)
    pub tick_interval_ms: u32,
    /// Result-wait loop poll interval (milliseconds)
    pub result_poll_interval_ms: u32,

    // --- Wireless link ---
    /// Connect attempts before the wireless subsystem is restarted
    pub max_connect_attempts: u8,
    /// Charger reports older than connect time + this are ignored (milliseconds)
    pub stale_report_guard_ms: u32,
    /// Bounded wait for the subsystem start service (milliseconds)
    pub service_wait_timeout_ms: u32,
    /// Delay between a subsystem stop and the next start (milliseconds, 0 = none)
    pub restart_backoff_ms: u32,

    // --- Docking ---
    /// Bounded wait for the docking maneuver server (milliseconds)
    pub dock_server_wait_timeout_ms: u32,

    // --- Charging ---
    /// Minimum spacing between "begin charging" requests (milliseconds)
    pub charge_request_interval_ms: u32,
    /// Battery fraction treated as full (sentinel, >= 1.0)
    pub full_battery_level: f32,

    // --- Completion ---
    /// Stop-motion suppression after an undocking signal (milliseconds)
    pub undock_grace_ms: u32,
    /// Off-dock and no-contact must hold this long to finish (milliseconds)
    pub completion_debounce_ms: u32,

    // --- Persistence ---
    /// Recovery record location
    pub recovery_path: String,
}

impl Default for ChargeConfig {
    fn default() -> Self {
        Self {
            // Timing
            tick_interval_ms: 1000,        // 1 Hz
            result_poll_interval_ms: 1000, // 1 Hz

            // Wireless link
            max_connect_attempts: 2,
            stale_report_guard_ms: 1000,
            service_wait_timeout_ms: 1000,
            restart_backoff_ms: 0,

            // Docking
            dock_server_wait_timeout_ms: 2000,

            // Charging
            charge_request_interval_ms: 2000,
            full_battery_level: 1.01,

            // Completion
            undock_grace_ms: 5000,
            completion_debounce_ms: 1000,

            // Persistence
            recovery_path: String::from("/map/charge_restore.txt"),
        }
    }
}

impl ChargeConfig {
    /// Parse and validate a JSON document.  Missing fields take defaults.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text).map_err(|e| {
            warn!("charge config rejected: {e}");
            ConfigError::Malformed
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Range-check every field.  Bad values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("tick_interval_ms must be > 0"));
        }
        if self.result_poll_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "result_poll_interval_ms must be > 0",
            ));
        }
        if self.max_connect_attempts == 0 {
            return Err(ConfigError::ValidationFailed(
                "max_connect_attempts must be >= 1",
            ));
        }
        if !self.full_battery_level.is_finite() || self.full_battery_level <= 0.0 {
            return Err(ConfigError::ValidationFailed(
                "full_battery_level must be a positive fraction",
            ));
        }
        if self.recovery_path.trim().is_empty() {
            return Err(ConfigError::ValidationFailed("recovery_path must not be empty"));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        ms(self.tick_interval_ms)
    }

    pub fn result_poll_interval(&self) -> Duration {
        ms(self.result_poll_interval_ms)
    }

    pub fn stale_report_guard(&self) -> Duration {
        ms(self.stale_report_guard_ms)
    }

    pub fn service_wait_timeout(&self) -> Duration {
        ms(self.service_wait_timeout_ms)
    }

    pub fn restart_backoff(&self) -> Duration {
        ms(self.restart_backoff_ms)
    }

    pub fn dock_server_wait_timeout(&self) -> Duration {
        ms(self.dock_server_wait_timeout_ms)
    }

    pub fn charge_request_interval(&self) -> Duration {
        ms(self.charge_request_interval_ms)
    }

    pub fn undock_grace(&self) -> Duration {
        ms(self.undock_grace_ms)
    }

    pub fn completion_debounce(&self) -> Duration {
        ms(self.completion_debounce_ms)
    }
}

fn ms(value: u32) -> Duration {
    Duration::from_millis(u64::from(value))
}

/// Read a config file from disk.
pub fn load_from_file(path: impl AsRef<Path>) -> anyhow::Result<ChargeConfig> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading charge config {}", path.display()))?;
    let config = ChargeConfig::from_json(&text)
        .with_context(|| format!("parsing charge config {}", path.display()))?;
    Ok(config)
}
