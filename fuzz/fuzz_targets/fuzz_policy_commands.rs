//! Fuzz target: `PolicyEngine::handle_command` / `tick`
//!
//! Decodes arbitrary bytes into a stream of commands, clock moves and
//! ticks, and asserts after every step that no channel is on which the
//! live policy would refuse, and that recorded state matches the relays.
//!
//! cargo fuzz run fuzz_policy_commands

#![no_main]

use libfuzzer_sys::fuzz_target;
use relayguard::adapters::log_sink::LogNotifier;
use relayguard::adapters::nvs::NvsStore;
use relayguard::app::channel::{Channel, ChannelSet};
use relayguard::app::commands::{RelayCommand, WindowField};
use relayguard::app::engine::PolicyEngine;
use relayguard::app::ports::{ActuatorPort, ClockSource};
use relayguard::config::{CHANNEL_COUNT, PolicyConfig};
use relayguard::error::ActuatorError;

#[derive(Default)]
struct Relays([bool; CHANNEL_COUNT]);

impl ActuatorPort for Relays {
    fn set_channel(&mut self, ch: Channel, on: bool) -> Result<(), ActuatorError> {
        self.0[ch.index()] = on;
        Ok(())
    }
    fn get_channel(&self, ch: Channel) -> bool {
        self.0[ch.index()]
    }
}

struct Clock(std::cell::Cell<u32>);

impl ClockSource for Clock {
    fn minutes_since_local_midnight(&self) -> u32 {
        self.0.get()
    }
    fn is_synchronized(&self) -> bool {
        self.0.get() < 1440
    }
}

fn command(op: u8, a: u8, b: u8) -> RelayCommand {
    let field = match b % 4 {
        0 => WindowField::W1Start,
        1 => WindowField::W1End,
        2 => WindowField::W2Start,
        _ => WindowField::W2End,
    };
    match op % 7 {
        0 => RelayCommand::SetChannel { channel: a % 6, on: b & 1 == 1 },
        1 => RelayCommand::SetAwayMode(a & 1 == 1),
        2 => RelayCommand::SetScheduleEnforce(a & 1 == 1),
        3 => RelayCommand::SetWindowField { field, minute: u32::from(a) * 8 },
        4 => RelayCommand::SetMaxOnMinutes { channel: a % 6, minutes: u32::from(b % 4) },
        5 => RelayCommand::LinkLost,
        _ => RelayCommand::Refresh,
    }
}

fuzz_target!(|data: &[u8]| {
    let Some((&masks, rest)) = data.split_first() else {
        return;
    };
    let defaults = PolicyConfig {
        away_allowed: ChannelSet::from_mask(masks & 0x0F),
        schedule_allowed: ChannelSet::from_mask(masks >> 4),
        ..PolicyConfig::default()
    };
    let mut engine = PolicyEngine::new(
        Relays::default(),
        Clock(std::cell::Cell::new(720)),
        NvsStore::new(),
        LogNotifier::new(),
        &defaults,
    );
    engine.start();

    for chunk in rest.chunks_exact(3) {
        match chunk[0] >> 5 {
            0 => {
                engine.tick();
            }
            1 => engine.clock().0.set(u32::from(chunk[1]) * 6 + u32::from(chunk[2] % 6)),
            _ => {
                engine.handle_command(command(chunk[0], chunk[1], chunk[2]));
            }
        }

        // Clock moves are only acted on by the next pass; check after one.
        engine.apply_policy_now();
        for ch in Channel::all() {
            let n = ch.number();
            assert_eq!(engine.is_on(n), engine.actuator().get_channel(ch));
            if engine.is_on(n) {
                assert!(engine.can_activate(n), "channel {n} on against policy");
            }
        }
    }
});
