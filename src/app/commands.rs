//! Inbound commands to the policy engine.
//!
//! These are the typed form of what the remote command transport receives
//! (relay switch, mode toggles, window and ceiling edits).  Payload parsing
//! stays in the transport; by the time a command gets here its values are
//! plain integers and booleans.

use super::events::PolicySnapshot;
use crate::schedule::ScheduleWindows;

/// Which window bound a [`RelayCommand::SetWindowField`] edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowField {
    W1Start,
    W1End,
    W2Start,
    W2End,
}

impl WindowField {
    /// Return `windows` with this bound replaced by `minute`.
    pub fn apply(self, windows: ScheduleWindows, minute: u16) -> ScheduleWindows {
        let mut w = windows;
        match self {
            Self::W1Start => w.w1.start_min = minute,
            Self::W1End => w.w1.end_min = minute,
            Self::W2Start => w.w2.start_min = minute,
            Self::W2End => w.w2.end_min = minute,
        }
        w
    }
}

/// Commands that external adapters can send into the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayCommand {
    /// Switch a relay.  `on = true` is subject to policy.
    SetChannel { channel: u8, on: bool },

    SetAwayMode(bool),

    SetScheduleEnforce(bool),

    /// Edit a single window bound; values above 1439 are clamped.
    SetWindowField { field: WindowField, minute: u32 },

    /// Set a channel's ceiling in minutes (stored as seconds).
    SetMaxOnMinutes { channel: u8, minutes: u32 },

    /// The command transport lost its connection: re-assert policy.
    LinkLost,

    /// Report the full live state (e.g. after the transport reconnects).
    Refresh,
}

/// What the transport should publish after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandReply {
    /// Actual state of a relay after the command (may differ from the
    /// request when activation was denied).
    Relay { channel: u8, on: bool },
    AwayMode(bool),
    ScheduleEnforce(bool),
    Windows(ScheduleWindows),
    MaxOnMinutes { channel: u8, minutes: u32 },
    Snapshot(PolicySnapshot),
    /// Nothing to publish (invalid channel, link loss).
    None,
}
