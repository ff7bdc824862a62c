//! GPIO relay bank.
//!
//! One output pin per channel, driven through `embedded-hal`'s
//! [`OutputPin`] so the same driver runs on ESP-IDF `PinDriver`s and on
//! host mocks.  Every relay is driven off when the bank is created.
//!
//! The recorded state only changes after a pin write succeeds, so
//! [`RelayBank::get`] always reports the last level that actually reached
//! the hardware.

use embedded_hal::digital::OutputPin;
use log::{error, info};

use crate::app::channel::Channel;
use crate::config::CHANNEL_COUNT;
use crate::error::ActuatorError;

pub struct RelayBank<P> {
    pins: [P; CHANNEL_COUNT],
    active_high: bool,
    state: [bool; CHANNEL_COUNT],
}

impl<P: OutputPin> RelayBank<P> {
    /// Take ownership of the relay pins (channel 1 first) and drive every
    /// relay off.
    pub fn new(pins: [P; CHANNEL_COUNT], active_high: bool) -> Self {
        let mut bank = Self {
            pins,
            active_high,
            state: [false; CHANNEL_COUNT],
        };
        if let Err(e) = bank.set_all(false) {
            error!("Relay: init OFF failed: {}", e);
        }
        info!("Relay: {} channels initialised OFF (active_high={})", CHANNEL_COUNT, active_high);
        bank
    }

    fn drive(&mut self, ch: Channel, on: bool) -> Result<(), ActuatorError> {
        let pin = &mut self.pins[ch.index()];
        let res = if on == self.active_high {
            pin.set_high()
        } else {
            pin.set_low()
        };
        res.map_err(|_| ActuatorError::GpioWriteFailed)
    }

    /// Drive `ch` on or off.  On error the recorded state is unchanged.
    pub fn set(&mut self, ch: Channel, on: bool) -> Result<(), ActuatorError> {
        self.drive(ch, on)?;
        self.state[ch.index()] = on;
        Ok(())
    }

    /// Last level successfully written to `ch`.
    pub fn get(&self, ch: Channel) -> bool {
        self.state[ch.index()]
    }

    /// Drive every channel, continuing past failures.  Returns the first
    /// error.
    pub fn set_all(&mut self, on: bool) -> Result<(), ActuatorError> {
        Channel::all().fold(Ok(()), |acc, ch| acc.and(self.set(ch, on)))
    }
}
