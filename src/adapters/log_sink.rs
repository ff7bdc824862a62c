//! Log-based notification adapter.
//!
//! Implements [`NotificationPort`] by writing structured lines to the
//! ESP-IDF logger (UART / USB-CDC in production).  A remote-state
//! publisher would implement the same trait.

use log::{info, warn};

use crate::app::channel::Channel;
use crate::app::events::{ForceOffReason, PolicyChange};
use crate::app::ports::NotificationPort;

/// Adapter that logs every engine notification to the serial console.
#[derive(Debug, Default)]
pub struct LogNotifier {
    forced_off: u32,
    policy_changes: u32,
}

impl LogNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forced shutdowns reported since boot.
    pub fn forced_off_count(&self) -> u32 {
        self.forced_off
    }

    pub fn policy_change_count(&self) -> u32 {
        self.policy_changes
    }
}

impl NotificationPort for LogNotifier {
    fn on_channel_forced_off(&mut self, ch: Channel, reason: ForceOffReason) {
        self.forced_off = self.forced_off.wrapping_add(1);
        warn!("RELAY | {} -> OFF | reason={}", ch, reason);
    }

    fn on_policy_changed(&mut self, change: &PolicyChange) {
        self.policy_changes = self.policy_changes.wrapping_add(1);
        match change {
            PolicyChange::AwayMode(on) => info!("POLICY | away={}", on),
            PolicyChange::ScheduleEnforce(on) => info!("POLICY | schedule={}", on),
            PolicyChange::Windows(w) => {
                let (w1s, w1e, w2s, w2e) = w.as_minutes();
                info!("POLICY | W1={}..{} W2={}..{}", w1s, w1e, w2s, w2e);
            }
            PolicyChange::MaxOnSeconds { channel, seconds } => {
                info!("POLICY | relay {} max_on={}s", channel, seconds);
            }
        }
    }
}
