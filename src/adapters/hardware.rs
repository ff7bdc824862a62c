//! Hardware adapter: bridges the relay bank to the domain port trait.
//!
//! Owns the [`RelayBank`] and exposes it through [`ActuatorPort`].  This
//! is the only module that drives relay outputs; the engine owns the
//! adapter, so nothing else can reach the pins.

use embedded_hal::digital::OutputPin;

use crate::app::channel::Channel;
use crate::app::ports::ActuatorPort;
use crate::config::CHANNEL_COUNT;
use crate::drivers::relay::RelayBank;
use crate::error::ActuatorError;
use crate::pins;

pub struct RelayBoard<P> {
    bank: RelayBank<P>,
}

impl<P: OutputPin> RelayBoard<P> {
    pub fn new(bank: RelayBank<P>) -> Self {
        Self { bank }
    }

    /// Build the bank from pins wired per [`pins::RELAY_GPIOS`].
    pub fn from_pins(outputs: [P; CHANNEL_COUNT]) -> Self {
        Self::new(RelayBank::new(outputs, pins::RELAY_ACTIVE_HIGH))
    }
}

impl<P: OutputPin> ActuatorPort for RelayBoard<P> {
    fn set_channel(&mut self, ch: Channel, on: bool) -> Result<(), ActuatorError> {
        self.bank.set(ch, on)
    }

    fn get_channel(&self, ch: Channel) -> bool {
        self.bank.get(ch)
    }
}
