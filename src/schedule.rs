//! Daily time windows.
//!
//! Schedule enforcement allows activation only inside one of two daily
//! windows.  Each window is a `[start, end)` range of minutes since local
//! midnight and may wrap past midnight.
//!
//! ```text
//!  0                 480            1020               1439
//!  |------------------[==============)-----------------|   start < end
//!  [=======)----------------------------------[========|   start > end (wraps)
//!  0       360                               1320
//! ```
//!
//! A window whose start equals its end is disabled and never matches.

use serde::{Deserialize, Serialize};

use crate::config::MINUTES_PER_DAY;
use crate::error::{Error, Result};

/// One daily window, in minutes since local midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start_min: u16,
    pub end_min: u16,
}

impl TimeWindow {
    /// Build a window, rejecting minutes outside `0..1440`.
    pub fn new(start_min: u16, end_min: u16) -> Result<Self> {
        for minute in [start_min, end_min] {
            if minute >= MINUTES_PER_DAY {
                return Err(Error::InvalidWindow(minute));
            }
        }
        Ok(Self { start_min, end_min })
    }

    /// A window that never matches.
    pub const fn disabled() -> Self {
        Self {
            start_min: 0,
            end_min: 0,
        }
    }

    pub const fn is_disabled(&self) -> bool {
        self.start_min == self.end_min
    }

    /// Whether `minute` falls inside this window.
    pub fn within(&self, minute: u32) -> bool {
        let start = u32::from(self.start_min);
        let end = u32::from(self.end_min);
        if start == end {
            false
        } else if start < end {
            // e.g., 480..1020 (daytime)
            minute >= start && minute < end
        } else {
            // e.g., 1320..360 (overnight, wraps around midnight)
            minute >= start || minute < end
        }
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self::disabled()
    }
}

/// The pair of windows used by schedule enforcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleWindows {
    pub w1: TimeWindow,
    pub w2: TimeWindow,
}

/// Both windows disabled: nothing is admitted until one is set.
impl Default for ScheduleWindows {
    fn default() -> Self {
        Self {
            w1: TimeWindow::disabled(),
            w2: TimeWindow::disabled(),
        }
    }
}

impl ScheduleWindows {
    /// Build both windows from raw minutes, validating each value.
    pub fn from_minutes(w1_start: u16, w1_end: u16, w2_start: u16, w2_end: u16) -> Result<Self> {
        Ok(Self {
            w1: TimeWindow::new(w1_start, w1_end)?,
            w2: TimeWindow::new(w2_start, w2_end)?,
        })
    }

    /// `(w1_start, w1_end, w2_start, w2_end)`.
    pub fn as_minutes(&self) -> (u16, u16, u16, u16) {
        (self.w1.start_min, self.w1.end_min, self.w2.start_min, self.w2.end_min)
    }

    /// True if `minute` is inside either window.
    pub fn contains(&self, minute: u32) -> bool {
        self.w1.within(minute) || self.w2.within(minute)
    }
}
