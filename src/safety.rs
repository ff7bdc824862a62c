//! Per-channel ON-time accounting.
//!
//! The tracker holds the engine's record of which channels are on and how
//! long each has been on continuously.  It is advanced once per safety tick
//! and reports the channels whose max-on ceiling has been reached; the
//! engine is responsible for actually switching them off.
//!
//! ## Counter lifecycle
//!
//! 1. A channel turns on (approved activation, or observed on at boot):
//!    its counter starts at 0.
//! 2. Each tick while on, the counter advances by one second, saturating.
//! 3. Once the counter reaches a non-zero ceiling the channel is reported
//!    as expired every tick until it is recorded off.
//! 4. Any transition to off resets the counter to 0.

use heapless::Vec;

use crate::app::channel::Channel;
use crate::config::CHANNEL_COUNT;

#[derive(Debug, Clone, Copy, Default)]
struct ChannelTimer {
    is_on: bool,
    elapsed_secs: u32,
}

/// Channels whose ceiling was reached on a tick.
pub type Expired = Vec<Channel, CHANNEL_COUNT>;

/// ON-state and continuous ON duration for every channel.
#[derive(Debug, Clone, Default)]
pub struct ElapsedTracker {
    timers: [ChannelTimer; CHANNEL_COUNT],
}

impl ElapsedTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `ch` as on, starting its timer from now.
    pub fn mark_on(&mut self, ch: Channel) {
        self.timers[ch.index()] = ChannelTimer {
            is_on: true,
            elapsed_secs: 0,
        };
    }

    /// Record `ch` as off and clear its timer.
    pub fn mark_off(&mut self, ch: Channel) {
        self.timers[ch.index()] = ChannelTimer::default();
    }

    pub fn is_on(&self, ch: Channel) -> bool {
        self.timers[ch.index()].is_on
    }

    pub fn elapsed_secs(&self, ch: Channel) -> u32 {
        self.timers[ch.index()].elapsed_secs
    }

    /// Channels currently recorded on, ascending.
    pub fn on_channels(&self) -> impl Iterator<Item = Channel> + '_ {
        Channel::all().filter(|ch| self.is_on(*ch))
    }

    /// Advance every ON timer by one second and return the channels whose
    /// non-zero ceiling in `max_on_secs` has been reached.
    pub fn advance(&mut self, max_on_secs: &[u32; CHANNEL_COUNT]) -> Expired {
        let mut expired = Expired::new();
        for ch in Channel::all() {
            let timer = &mut self.timers[ch.index()];
            if !timer.is_on {
                timer.elapsed_secs = 0;
                continue;
            }
            timer.elapsed_secs = timer.elapsed_secs.saturating_add(1);
            let limit = max_on_secs[ch.index()];
            if limit > 0 && timer.elapsed_secs >= limit {
                // Capacity equals the channel count, so this cannot fail.
                let _ = expired.push(ch);
            }
        }
        expired
    }
}
