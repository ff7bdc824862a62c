//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the relay safety rules: channel identity, the
//! away/schedule activation policy, and the engine that enforces it and
//! the max-on ceilings.  All interaction with hardware happens through
//! **port traits** defined in [`ports`], keeping this layer fully testable
//! without real peripherals.

pub mod channel;
pub mod commands;
pub mod engine;
pub mod events;
pub mod policy;
pub mod ports;
pub mod shared;
