//! Charge manager library.
//!
//! Drives one charging goal of a docking mobile robot: pairing with the
//! charger over the wireless link, the docking maneuver, closing the
//! charge circuit, and deciding when the robot is done or has left the
//! dock.  Every robot collaborator sits behind a port trait in
//! [`app::ports`]; [`runtime::server::ChargeServer`] is the entry point.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod charge;
pub mod completion;
pub mod config;
pub mod connection;
pub mod dock;
pub mod error;
pub mod recovery;
pub mod runtime;
pub mod telemetry;
pub mod throttle;

pub use app::commands::ChargingGoal;
pub use app::events::{ChargeFeedback, ChargeResult, FeedbackState};
pub use config::ChargeConfig;
pub use error::{Error, Result};
pub use runtime::server::{ChargeServer, GoalHandle};
