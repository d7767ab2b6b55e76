//! Unified error types for the charge manager.
//!
//! The charging core itself never fails: external faults degrade to
//! "keep retrying".  What can fail is the edge around it: loading
//! configuration, reading or writing the recovery record, and goal
//! admission.  Each concern has its own small enum; [`Error`] is the
//! one every public constructor funnels into.

use core::fmt;
use std::io;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Configuration is invalid or could not be parsed.
    Config(ConfigError),
    /// The recovery record could not be read or written.
    Recovery(RecoveryError),
    /// A charging goal was refused.
    Goal(GoalRejected),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Recovery(e) => write!(f, "recovery: {e}"),
            Self::Goal(e) => write!(f, "goal: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The document is not valid JSON for [`ChargeConfig`](crate::config::ChargeConfig).
    Malformed,
    /// A field failed range validation.  The string names the field.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed config document"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Recovery record errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryError {
    /// Underlying file or storage I/O failed.
    Io(io::ErrorKind),
    /// The stored record does not have the `<0|1>\n<address>` shape.
    Malformed(&'static str),
}

impl fmt::Display for RecoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(kind) => write!(f, "I/O error: {kind}"),
            Self::Malformed(msg) => write!(f, "malformed record: {msg}"),
        }
    }
}

impl std::error::Error for RecoveryError {}

impl From<io::Error> for RecoveryError {
    fn from(e: io::Error) -> Self {
        Self::Io(e.kind())
    }
}

impl From<RecoveryError> for Error {
    fn from(e: RecoveryError) -> Self {
        Self::Recovery(e)
    }
}

// ---------------------------------------------------------------------------
// Goal admission
// ---------------------------------------------------------------------------

/// Why a charging goal was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalRejected {
    /// Another goal is still executing.
    Busy,
    /// The device address is empty, too long or not printable ASCII.
    InvalidAddress,
    /// The goal worker thread could not be spawned.
    WorkerUnavailable,
}

impl fmt::Display for GoalRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy => write!(f, "a charging goal is already executing"),
            Self::InvalidAddress => write!(f, "invalid device address"),
            Self::WorkerUnavailable => write!(f, "goal worker could not be started"),
        }
    }
}

impl std::error::Error for GoalRejected {}

impl From<GoalRejected> for Error {
    fn from(e: GoalRejected) -> Self {
        Self::Goal(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
