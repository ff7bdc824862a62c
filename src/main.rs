//! RelayGuard Firmware: Main Entry Point
//!
//! Hexagonal architecture with event-driven execution.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  RelayBoard       SystemClock     NvsStore      LogNotifier    │
//! │  (ActuatorPort)   (ClockSource)   (Persistence) (Notification) │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │           SharedPolicyEngine (pure logic)              │    │
//! │  │  Away · Schedule · Max-on                              │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  TickDriver (1 Hz) · EventQueue · CommandInbox                 │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use core::time::Duration;

use anyhow::Result;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::gpio::{OutputPin, PinDriver};
use esp_idf_svc::hal::peripherals::Peripherals;
use log::{info, warn};

use relayguard::adapters::hardware::RelayBoard;
use relayguard::adapters::log_sink::LogNotifier;
use relayguard::adapters::nvs::NvsStore;
use relayguard::adapters::time::SystemClock;
use relayguard::app::commands::{CommandReply, RelayCommand};
use relayguard::app::engine::PolicyEngine;
use relayguard::app::shared::SharedPolicyEngine;
use relayguard::config::{PolicyConfig, TICK_INTERVAL_MS};
use relayguard::drivers::hw_timer::TickDriver;
use relayguard::events::{EVENTS, Event};
use relayguard::inbox::{self, COMMAND_INBOX};
use relayguard::pins::{RELAY_ACTIVE_HIGH, RELAY_GPIOS};

/// Idle delay between queue drains.
const LOOP_IDLE_MS: u32 = 20;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  RelayGuard v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Relays first, so every output is OFF as early as possible ──
    let p = Peripherals::take()?;
    let relays = RelayBoard::from_pins([
        PinDriver::output(p.pins.gpio8.downgrade_output())?,
        PinDriver::output(p.pins.gpio9.downgrade_output())?,
        PinDriver::output(p.pins.gpio10.downgrade_output())?,
        PinDriver::output(p.pins.gpio11.downgrade_output())?,
    ]);
    info!("Relays on GPIO {:?} (active_high={})", RELAY_GPIOS, RELAY_ACTIVE_HIGH);

    // ── 3. Storage, clock, notifier ───────────────────────────
    let store = NvsStore::new();
    let clock = SystemClock::new();
    let notifier = LogNotifier::new();

    // ── 4. Policy engine ──────────────────────────────────────
    let engine = SharedPolicyEngine::new(PolicyEngine::new(
        relays,
        clock,
        store,
        notifier,
        &PolicyConfig::default(),
    ));
    engine.start();

    // ── 5. Safety tick ────────────────────────────────────────
    let _tick = TickDriver::start(&EVENTS, Duration::from_millis(TICK_INTERVAL_MS))?;

    info!("System ready. Entering event loop.");

    // ── 6. Event loop ─────────────────────────────────────────
    loop {
        EVENTS.drain(|event| match event {
            Event::SafetyTick => {
                engine.tick();
            }
            Event::LinkDown => {
                warn!("Link down, re-applying policy");
                publish(engine.handle_command(RelayCommand::LinkLost));
            }
            Event::LinkUp => {
                publish(engine.handle_command(RelayCommand::Refresh));
                engine.with(|e| {
                    let n = e.notifier();
                    info!(
                        "STATS | ticks={} forced_off={} policy_changes={}",
                        e.tick_count(),
                        n.forced_off_count(),
                        n.policy_change_count()
                    );
                });
            }
            Event::CommandReceived => {
                inbox::drain(&COMMAND_INBOX, |cmd| publish(engine.handle_command(cmd)));
            }
        });

        FreeRtos::delay_ms(LOOP_IDLE_MS);
    }
}

/// Stand-in for the remote-state publisher: log what would be sent.
fn publish(reply: CommandReply) {
    match reply {
        CommandReply::None => {}
        CommandReply::Snapshot(snap) => match serde_json::to_string(&snap) {
            Ok(json) => info!("STATE | {}", json),
            Err(e) => warn!("STATE | snapshot encode failed: {}", e),
        },
        other => info!("STATE | {:?}", other),
    }
}
