//! RelayGuard firmware library.
//!
//! Relay safety and scheduling policy: away mode, daily schedule windows,
//! and per-channel max-on ceilings, enforced by a single engine that owns
//! the relays.  All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module, so the pure logic
//! builds and tests on the host.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod inbox;
pub mod pins;
pub mod safety;
pub mod schedule;

pub mod adapters;
pub mod drivers;
pub mod esp_link_shims;

// Host tests lock the command inbox through the std critical-section impl.
#[cfg(all(test, not(target_os = "espidf")))]
use critical_section as _;
