//! Application core: the charging goal, free of transport details.
//!
//! Goal admission types live in [`commands`], everything the core emits or
//! consumes asynchronously lives in [`events`], and every interaction with
//! the wireless stack, the docking maneuver, the charge circuit and
//! persistence happens through the **port traits** in [`ports`].  The
//! [`service`] ties the supervisors together into one per-tick step that
//! is fully testable without any real robot.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
