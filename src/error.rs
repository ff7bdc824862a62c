//! Unified error types for the RelayGuard firmware.
//!
//! A single `Error` enum that every subsystem converts into, so the command
//! path and the main loop handle failures uniformly.  All variants are `Copy`
//! so they pass through the engine's critical section without allocation.

use core::fmt;

use crate::app::policy::DenyReason;
use crate::app::ports::StorageError;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible engine operation funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Channel number outside `1..=CHANNEL_COUNT`.  Never mutates state.
    InvalidChannel(u8),
    /// Window minute outside `0..1440`.
    InvalidWindow(u16),
    /// Activation refused by away or schedule policy.
    Denied(DenyReason),
    /// A relay could not be switched.
    Actuator(ActuatorError),
    /// A policy value could not be written to persistent storage.
    /// The in-memory value is still live.
    Persistence(StorageError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidChannel(ch) => write!(f, "invalid channel {ch}"),
            Self::InvalidWindow(min) => write!(f, "window minute {min} out of range"),
            Self::Denied(reason) => write!(f, "denied: {reason}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
            Self::Persistence(e) => write!(f, "persistence: {e}"),
        }
    }
}

impl From<DenyReason> for Error {
    fn from(e: DenyReason) -> Self {
        Self::Denied(e)
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Persistence(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// GPIO level write failed.
    GpioWriteFailed,
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GpioWriteFailed => write!(f, "GPIO write failed"),
        }
    }
}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
