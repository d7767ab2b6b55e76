//! Persisted "charging in progress" record.
//!
//! The record is two lines of text: `1` or `0`, then the charger address.
//! It is written as active when a goal starts and as inactive when it
//! ends; on startup the surrounding system reads it back to resume an
//! interrupted charge on the dock.

use log::info;

use crate::app::commands::{ChargingGoal, DeviceAddress};
use crate::app::ports::RecoveryStore;
use crate::error::RecoveryError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryRecord {
    pub active: bool,
    pub address: DeviceAddress,
}

impl RecoveryRecord {
    pub fn active(address: &DeviceAddress) -> Self {
        Self {
            active: true,
            address: address.clone(),
        }
    }

    pub fn inactive(address: &DeviceAddress) -> Self {
        Self {
            active: false,
            address: address.clone(),
        }
    }

    /// `<1|0>\n<address>`, no trailing newline.
    pub fn encode(&self) -> String {
        format!("{}\n{}", if self.active { '1' } else { '0' }, self.address)
    }

    pub fn parse(text: &str) -> Result<Self, RecoveryError> {
        let mut lines = text.lines();
        let active = match lines.next().map(str::trim) {
            Some("1") => true,
            Some("0") => false,
            _ => return Err(RecoveryError::Malformed("first line must be 0 or 1")),
        };
        let raw = lines.next().map(str::trim).unwrap_or_default();
        let mut address = DeviceAddress::new();
        address
            .push_str(raw)
            .map_err(|()| RecoveryError::Malformed("address too long"))?;
        if active && address.is_empty() {
            return Err(RecoveryError::Malformed("active record without address"));
        }
        Ok(Self { active, address })
    }
}

/// Turn an active stored record into a goal that resumes on the dock.
pub fn resume_goal(store: &dyn RecoveryStore) -> Result<Option<ChargingGoal>, RecoveryError> {
    let Some(record) = store.load()? else {
        return Ok(None);
    };
    if !record.active {
        return Ok(None);
    }
    let goal = ChargingGoal::new(&record.address)
        .map_err(|_| RecoveryError::Malformed("stored address is not valid"))?
        .with_restore(true);
    info!("resuming interrupted charge at {}", goal.address);
    Ok(Some(goal))
}
