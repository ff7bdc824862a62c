//! Port traits: the hexagonal boundary between the policy engine and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ PolicyEngine (domain)
//! ```
//!
//! Driven adapters (relays, clock, NVS, state publishers) implement these
//! traits.  The [`PolicyEngine`](super::engine::PolicyEngine) owns one of
//! each, so the domain core never touches hardware directly.
//!
//! All port calls happen inside the engine's critical section.  They must
//! return promptly: no network round-trips, no unbounded retries.

use crate::error::ActuatorError;

use super::channel::Channel;
use super::events::{ForceOffReason, PolicyChange};

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → relays)
// ───────────────────────────────────────────────────────────────

/// Switches relay channels.  Only the engine holds this port; nothing else
/// may actuate a channel.
pub trait ActuatorPort {
    /// Drive `ch` on or off.  On error the channel keeps its previous state.
    fn set_channel(&mut self, ch: Channel, on: bool) -> Result<(), ActuatorError>;

    /// Last successfully applied state of `ch`.
    fn get_channel(&self, ch: Channel) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Clock source (driven adapter: wall clock → domain)
// ───────────────────────────────────────────────────────────────

/// Local wall-clock time for schedule evaluation.
pub trait ClockSource {
    /// Minutes since local midnight, `0..1440`.
    fn minutes_since_local_midnight(&self) -> u32;

    /// Whether the wall clock has been set from a trusted source.
    fn is_synchronized(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Persistence port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Durable key/value storage for policy values.
///
/// Values are stored as `u32`; `bool` and `u16` are encoded on top.  Reads
/// never fail: a missing or unreadable key yields `default`.
pub trait PersistencePort {
    fn get_u32(&self, key: &str, default: u32) -> u32;

    /// Write and commit.  Returns only after the value is durable.
    fn set_u32(&mut self, key: &str, value: u32) -> Result<(), StorageError>;

    fn get_bool(&self, key: &str, default: bool) -> bool {
        self.get_u32(key, u32::from(default)) != 0
    }

    fn set_bool(&mut self, key: &str, value: bool) -> Result<(), StorageError> {
        self.set_u32(key, u32::from(value))
    }

    /// Stored values that do not fit `u16` read as `default`.
    fn get_u16(&self, key: &str, default: u16) -> u16 {
        u16::try_from(self.get_u32(key, u32::from(default))).unwrap_or(default)
    }

    fn set_u16(&mut self, key: &str, value: u16) -> Result<(), StorageError> {
        self.set_u32(key, u32::from(value))
    }
}

// ───────────────────────────────────────────────────────────────
// Notification port (driven adapter: domain → state publisher)
// ───────────────────────────────────────────────────────────────

/// Observer of engine-initiated transitions and policy changes, e.g. a
/// remote-state publisher.  Implementations should enqueue, not block.
pub trait NotificationPort {
    /// The engine switched `ch` off on its own initiative.
    fn on_channel_forced_off(&mut self, ch: Channel, reason: ForceOffReason);

    /// A policy value changed (carries the new live value).
    fn on_policy_changed(&mut self, change: &PolicyChange);
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`PersistencePort`] writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
