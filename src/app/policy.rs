//! Activation policy.
//!
//! Pure decision logic: given the live config, a channel, and the clock,
//! decide whether the channel may be on.  Away mode is checked first and
//! wins regardless of schedule state.  The same function serves the
//! reactive path (`request_activate`) and the proactive enforcement passes,
//! so a channel is never granted on one path and revoked on the other for
//! the same inputs.

use core::fmt;

use crate::config::{MINUTES_PER_DAY, PolicyConfig};

use super::channel::Channel;
use super::events::ForceOffReason;
use super::ports::ClockSource;

/// Why an activation was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    AwayMode,
    OutsideSchedule,
    /// Schedule enforcement is on and the wall clock cannot be trusted.
    ClockUnsynchronized,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AwayMode => write!(f, "away mode"),
            Self::OutsideSchedule => write!(f, "outside schedule windows"),
            Self::ClockUnsynchronized => write!(f, "clock not synchronised"),
        }
    }
}

impl From<DenyReason> for ForceOffReason {
    fn from(reason: DenyReason) -> Self {
        match reason {
            DenyReason::AwayMode => Self::AwayMode,
            DenyReason::OutsideSchedule => Self::OutsideSchedule,
            DenyReason::ClockUnsynchronized => Self::ClockUnsynchronized,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Evaluate away and schedule policy for `ch` at the clock's current time.
pub fn evaluate(cfg: &PolicyConfig, ch: Channel, clock: &impl ClockSource) -> Decision {
    if cfg.away_mode && !cfg.away_allowed.contains(ch) {
        return Decision::Deny(DenyReason::AwayMode);
    }

    if cfg.schedule_enforce && !cfg.schedule_allowed.contains(ch) {
        if !clock.is_synchronized() {
            return Decision::Deny(DenyReason::ClockUnsynchronized);
        }
        let now = clock.minutes_since_local_midnight();
        // A clock reading past the end of the day is as untrustworthy as an
        // unsynchronised one.
        if now >= u32::from(MINUTES_PER_DAY) {
            return Decision::Deny(DenyReason::ClockUnsynchronized);
        }
        if !cfg.windows.contains(now) {
            return Decision::Deny(DenyReason::OutsideSchedule);
        }
    }

    Decision::Allow
}
