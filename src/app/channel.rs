//! Relay channel identifiers and allow-sets.
//!
//! Channels are numbered `1..=CHANNEL_COUNT` on the wire and in logs.  A
//! [`Channel`] can only be built from an in-range number, so everything past
//! the command boundary works with channels that are known to exist.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::config::CHANNEL_COUNT;

/// A validated relay channel number (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Channel(u8);

impl Channel {
    /// Returns `None` when `number` is outside `1..=CHANNEL_COUNT`.
    pub const fn new(number: u8) -> Option<Self> {
        if number >= 1 && number as usize <= CHANNEL_COUNT {
            Some(Self(number))
        } else {
            None
        }
    }

    /// The 1-based channel number.
    pub const fn number(self) -> u8 {
        self.0
    }

    /// The 0-based array index.
    pub const fn index(self) -> usize {
        (self.0 - 1) as usize
    }

    /// Every channel in ascending order.
    pub fn all() -> impl Iterator<Item = Channel> {
        (1..=CHANNEL_COUNT as u8).map(Channel)
    }

    /// Build a per-channel array, calling `f` for each channel in order.
    pub fn each<T>(mut f: impl FnMut(Channel) -> T) -> [T; CHANNEL_COUNT] {
        core::array::from_fn(|i| f(Channel(i as u8 + 1)))
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u8> for Channel {
    type Error = crate::error::Error;

    fn try_from(number: u8) -> Result<Self, Self::Error> {
        Self::new(number).ok_or(crate::error::Error::InvalidChannel(number))
    }
}

impl From<Channel> for u8 {
    fn from(ch: Channel) -> Self {
        ch.0
    }
}

// ---------------------------------------------------------------------------
// ChannelSet
// ---------------------------------------------------------------------------

/// Set of channels exempt from a restriction.
///
/// Stored as one flag per channel; bit `n-1` of the legacy mask form maps to
/// channel `n`.  Bits above `CHANNEL_COUNT` are dropped on conversion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSet([bool; CHANNEL_COUNT]);

impl ChannelSet {
    pub const fn empty() -> Self {
        Self([false; CHANNEL_COUNT])
    }

    pub const fn from_mask(mask: u8) -> Self {
        let mut flags = [false; CHANNEL_COUNT];
        let mut i = 0;
        while i < CHANNEL_COUNT {
            flags[i] = mask & (1 << i) != 0;
            i += 1;
        }
        Self(flags)
    }

    pub fn mask(&self) -> u8 {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, allowed)| **allowed)
            .fold(0, |acc, (i, _)| acc | (1 << i))
    }

    pub fn contains(&self, ch: Channel) -> bool {
        self.0[ch.index()]
    }

    pub fn insert(&mut self, ch: Channel) {
        self.0[ch.index()] = true;
    }

    pub fn remove(&mut self, ch: Channel) {
        self.0[ch.index()] = false;
    }

    pub fn iter(&self) -> impl Iterator<Item = Channel> + '_ {
        Channel::all().filter(|ch| self.contains(*ch))
    }

    pub fn is_empty(&self) -> bool {
        !self.0.iter().any(|allowed| *allowed)
    }
}
