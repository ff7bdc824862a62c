//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements         | Connects to                   |
//! |------------|--------------------|-------------------------------|
//! | `hardware` | ActuatorPort       | GPIO relay bank               |
//! | `log_sink` | NotificationPort   | Serial log output             |
//! | `nvs`      | PersistencePort    | NVS / in-memory store         |
//! | `time`     | ClockSource        | SNTP-synced system clock      |

pub mod hardware;
pub mod log_sink;
pub mod nvs;
pub mod time;
