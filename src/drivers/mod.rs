//! Relay output and tick-timer drivers.

pub mod hw_timer;
pub mod relay;
