//! GPIO pin assignments for the relay board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

use crate::config::CHANNEL_COUNT;

/// Relay coil drivers, channel 1 first.
pub const RELAY_GPIOS: [i32; CHANNEL_COUNT] = [8, 9, 10, 11];

/// `true` when driving the pin HIGH energises the relay.
pub const RELAY_ACTIVE_HIGH: bool = true;
