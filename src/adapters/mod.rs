//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements         | Connects to                   |
//! |-------------|--------------------|-------------------------------|
//! | `bundle`    | ControlPorts       | one adapter per collaborator  |
//! | `log_sink`  | FeedbackSink       | `log` facade                  |
//! | `recovery`  | RecoveryStore      | restore file / in-memory      |
//! | `time`      | (clock)            | `std::time::Instant`          |
//!
//! Wireless, docking, charger and safety adapters belong to the robot
//! integration and implement the traits in [`crate::app::ports`].

pub mod bundle;
pub mod log_sink;
pub mod recovery;
pub mod time;
