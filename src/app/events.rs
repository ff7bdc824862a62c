//! Outbound engine events.
//!
//! The [`PolicyEngine`](super::engine::PolicyEngine) reports these through
//! the [`NotificationPort`](super::ports::NotificationPort).  Adapters on the
//! other side decide what to do with them: log to serial, republish relay
//! state, refresh a dashboard.

use core::fmt;

use serde::Serialize;

use crate::config::{CHANNEL_COUNT, PolicyConfig};
use crate::schedule::ScheduleWindows;

use super::channel::Channel;

/// Why the engine switched a channel off by itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ForceOffReason {
    /// Continuous ON time reached the channel's ceiling.
    MaxOnElapsed { limit_secs: u32 },
    /// Away mode is active and the channel is not away-allowed.
    AwayMode,
    /// Outside both schedule windows and not schedule-allowed.
    OutsideSchedule,
    /// Schedule enforcement is on but the wall clock is untrusted.
    ClockUnsynchronized,
}

impl fmt::Display for ForceOffReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaxOnElapsed { limit_secs } => write!(f, "max on {limit_secs}s reached"),
            Self::AwayMode => write!(f, "away mode"),
            Self::OutsideSchedule => write!(f, "outside schedule windows"),
            Self::ClockUnsynchronized => write!(f, "clock not synchronised"),
        }
    }
}

/// A policy value that was applied, carrying the new live value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PolicyChange {
    AwayMode(bool),
    ScheduleEnforce(bool),
    Windows(ScheduleWindows),
    MaxOnSeconds { channel: Channel, seconds: u32 },
}

/// Live state of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChannelStatus {
    pub channel: Channel,
    pub is_on: bool,
    pub elapsed_on_secs: u32,
}

/// Point-in-time view of every channel plus the live policy, suitable for
/// initial-state publication after a (re)connect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicySnapshot {
    pub channels: [ChannelStatus; CHANNEL_COUNT],
    pub config: PolicyConfig,
    pub clock_synchronized: bool,
}
