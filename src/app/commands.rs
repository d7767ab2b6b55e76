//! Inbound charging goals.
//!
//! A goal names the charger to pair with and two recovery flags.  The
//! [`ChargeServer`](crate::runtime::server::ChargeServer) admits at most
//! one at a time.

use crate::error::GoalRejected;

/// Maximum length of a charger device address.
pub const MAX_ADDRESS_LEN: usize = 32;

/// Wireless address of the charging station, e.g. `AA:BB:CC:DD:EE:FF`.
pub type DeviceAddress = heapless::String<MAX_ADDRESS_LEN>;

/// A request to get the robot charged at one particular station.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargingGoal {
    /// Charger the wireless link must pair with.
    pub address: DeviceAddress,
    /// Goal is being resumed after a restart; skip docking.
    pub restore: bool,
    /// Robot is known to be on the dock already; skip docking.
    pub force_docked: bool,
}

impl ChargingGoal {
    /// Build a goal for `address`.  The address must be 1–32 printable
    /// ASCII characters.
    pub fn new(address: &str) -> Result<Self, GoalRejected> {
        if address.is_empty() || !address.bytes().all(|b| b.is_ascii_graphic()) {
            return Err(GoalRejected::InvalidAddress);
        }
        let mut addr = DeviceAddress::new();
        addr.push_str(address)
            .map_err(|()| GoalRejected::InvalidAddress)?;
        Ok(Self {
            address: addr,
            restore: false,
            force_docked: false,
        })
    }

    #[must_use]
    pub fn with_restore(mut self, restore: bool) -> Self {
        self.restore = restore;
        self
    }

    #[must_use]
    pub fn with_force_docked(mut self, force_docked: bool) -> Self {
        self.force_docked = force_docked;
        self
    }

    /// Either flag means the docking maneuver is never dispatched.
    pub fn skips_docking(&self) -> bool {
        self.restore || self.force_docked
    }
}
