//! Policy configuration
//!
//! Compiled-in defaults for the relay safety policy plus the glue that loads
//! each value from persistent storage.  Every persisted key is independently
//! optional: a missing key falls back to the compiled-in default for that key
//! only.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::channel::{Channel, ChannelSet};
use crate::app::ports::PersistencePort;
use crate::schedule::{ScheduleWindows, TimeWindow};

// --- Device ---

/// Number of relay channels on the board.
pub const CHANNEL_COUNT: usize = 4;

/// Safety tick cadence (milliseconds).  `tick()` counts one second per call.
pub const TICK_INTERVAL_MS: u64 = 1000;

pub const MINUTES_PER_DAY: u16 = 1440;

// --- Clock ---

/// Epoch seconds below which the wall clock is treated as unsynchronised
/// (2021-01-01T00:00:00Z).
pub const SYNCED_EPOCH_THRESHOLD: i64 = 1_609_459_200;

/// POSIX TZ string applied before SNTP starts.
pub const TZ_STRING: &str = "UTC0";

pub const SNTP_SERVER: &str = "pool.ntp.org";

// --- Compiled-in policy defaults ---

const AWAY_MODE_DEFAULT_ON: bool = false;
/// Bit `n-1` set = channel `n` may stay on in away mode.
const AWAY_ALLOWED_MASK: u8 = 0b0000_0000;
const SCHEDULE_ENFORCE_DEFAULT_ON: bool = false;
/// Bit `n-1` set = channel `n` ignores the schedule windows.
const SCHEDULE_ALLOWED_MASK: u8 = 0b0000_0000;
/// 06:00-09:00
const SCH_W1: TimeWindow = TimeWindow {
    start_min: 360,
    end_min: 540,
};
/// 17:00-22:00
const SCH_W2: TimeWindow = TimeWindow {
    start_min: 1020,
    end_min: 1320,
};
/// Per-relay ceiling on continuous ON time; 0 = unlimited.
const MAX_ON_SECONDS: [u32; CHANNEL_COUNT] = [3600, 3600, 3600, 3600];

// --- Persisted keys ---

/// Logical key names in the policy namespace.
pub mod keys {
    use crate::app::channel::Channel;
    use crate::config::CHANNEL_COUNT;

    pub const NAMESPACE: &str = "cfg";

    pub const AWAY: &str = "away";
    pub const SCHEDULE_ENFORCE: &str = "schedule_enforce";
    pub const W1_START: &str = "w1_start";
    pub const W1_END: &str = "w1_end";
    pub const W2_START: &str = "w2_start";
    pub const W2_END: &str = "w2_end";

    const MAX_ON: [&str; CHANNEL_COUNT] = ["max_on_1", "max_on_2", "max_on_3", "max_on_4"];

    pub fn max_on(ch: Channel) -> &'static str {
        MAX_ON[ch.index()]
    }
}

/// In-memory mirror of the persisted policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Away mode: only `away_allowed` channels may be on.
    pub away_mode: bool,
    pub away_allowed: ChannelSet,
    /// Schedule mode: channels outside `schedule_allowed` may only be on
    /// inside one of the windows.
    pub schedule_enforce: bool,
    pub schedule_allowed: ChannelSet,
    pub windows: ScheduleWindows,
    /// Continuous ON ceiling per channel (seconds), 0 = no ceiling.
    pub max_on_seconds: [u32; CHANNEL_COUNT],
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            away_mode: AWAY_MODE_DEFAULT_ON,
            away_allowed: ChannelSet::from_mask(AWAY_ALLOWED_MASK),
            schedule_enforce: SCHEDULE_ENFORCE_DEFAULT_ON,
            schedule_allowed: ChannelSet::from_mask(SCHEDULE_ALLOWED_MASK),
            windows: ScheduleWindows {
                w1: SCH_W1,
                w2: SCH_W2,
            },
            max_on_seconds: MAX_ON_SECONDS,
        }
    }
}

impl PolicyConfig {
    /// Load every persisted key, using `defaults` for each key that is
    /// absent.  Allow-sets are not persisted and come from `defaults`.
    pub fn load(store: &impl PersistencePort, defaults: &PolicyConfig) -> Self {
        let (w1s, w1e, w2s, w2e) = defaults.windows.as_minutes();
        let windows = ScheduleWindows {
            w1: TimeWindow {
                start_min: load_minute(store, keys::W1_START, w1s),
                end_min: load_minute(store, keys::W1_END, w1e),
            },
            w2: TimeWindow {
                start_min: load_minute(store, keys::W2_START, w2s),
                end_min: load_minute(store, keys::W2_END, w2e),
            },
        };

        let mut max_on_seconds = defaults.max_on_seconds;
        for ch in Channel::all() {
            max_on_seconds[ch.index()] = store.get_u32(keys::max_on(ch), defaults.max_on_seconds[ch.index()]);
        }

        let cfg = Self {
            away_mode: store.get_bool(keys::AWAY, defaults.away_mode),
            away_allowed: defaults.away_allowed,
            schedule_enforce: store.get_bool(keys::SCHEDULE_ENFORCE, defaults.schedule_enforce),
            schedule_allowed: defaults.schedule_allowed,
            windows,
            max_on_seconds,
        };
        info!("PolicyConfig: loaded from store");
        cfg
    }

    /// Ceiling for `ch` in seconds (0 = unlimited).
    pub fn max_on(&self, ch: Channel) -> u32 {
        self.max_on_seconds[ch.index()]
    }
}

fn load_minute(store: &impl PersistencePort, key: &str, default: u16) -> u16 {
    let minute = store.get_u16(key, default);
    if minute >= MINUTES_PER_DAY {
        warn!("PolicyConfig: stored {}={} out of range, using {}", key, minute, default);
        return default;
    }
    minute
}
