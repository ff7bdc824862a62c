//! The tick driver and the command path running on separate threads
//! against one shared engine.

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use relayguard::adapters::log_sink::LogNotifier;
use relayguard::app::commands::RelayCommand;
use relayguard::app::engine::PolicyEngine;
use relayguard::app::shared::SharedPolicyEngine;
use relayguard::drivers::hw_timer::TickDriver;
use relayguard::events::{Event, EventQueue};
use relayguard::inbox::{self, CommandInbox};

use crate::mock_ports::{MockClock, MockRelays, MockStore, Rig, test_defaults};

#[test]
fn activate_racing_away_mode_ends_off() {
    for _ in 0..200 {
        let rig = Rig::new();
        let mut defaults = test_defaults();
        defaults.away_allowed = relayguard::app::channel::ChannelSet::empty();
        let shared = SharedPolicyEngine::new(rig.engine(&defaults));
        let barrier = Arc::new(Barrier::new(2));

        let activator = {
            let shared = shared.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                shared.request_activate(1)
            })
        };
        let toggler = {
            let shared = shared.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                shared.set_away_mode(true)
            })
        };

        let _accepted = activator.join().unwrap();
        toggler.join().unwrap().unwrap();
        shared.apply_policy_now();

        assert!(!shared.is_on(1));
        assert!(!rig.relays.is_on(1));
    }
}

#[test]
fn ticks_and_commands_interleave_safely() {
    let rig = Rig::new();
    let shared = SharedPolicyEngine::new(rig.engine(&test_defaults()));
    shared.set_max_on_seconds(2, 3).unwrap();

    let ticker = {
        let shared = shared.clone();
        thread::spawn(move || {
            for _ in 0..500 {
                shared.tick();
            }
        })
    };
    let commander = {
        let shared = shared.clone();
        thread::spawn(move || {
            for i in 0..500u32 {
                let channel = (i % 4) as u8 + 1;
                shared.handle_command(RelayCommand::SetChannel { channel, on: i % 3 != 0 });
            }
        })
    };
    ticker.join().unwrap();
    commander.join().unwrap();

    // Channel 2 can never have been on for 3 ticks without being cut.
    assert!(shared.elapsed_on_secs(2) < 3);
    for ch in 1..=4 {
        assert_eq!(shared.is_on(ch), rig.relays.is_on(ch), "channel {ch}");
    }
}

#[test]
fn event_loop_drives_engine_from_timer_and_inbox() {
    static EVENTS: EventQueue = EventQueue::new();
    static INBOX: CommandInbox = CommandInbox::new();

    let rig = Rig::new();
    let shared = SharedPolicyEngine::new(rig.engine(&test_defaults()));
    shared.set_max_on_seconds(3, 2).unwrap();

    assert!(inbox::submit(&INBOX, &EVENTS, RelayCommand::SetChannel { channel: 3, on: true }));
    let timer = TickDriver::start(&EVENTS, Duration::from_millis(5)).unwrap();

    let mut ticks = 0;
    let mut saw_on = false;
    for _ in 0..200 {
        EVENTS.drain(|event| match event {
            Event::SafetyTick => {
                shared.tick();
                ticks += 1;
            }
            Event::CommandReceived => inbox::drain(&INBOX, |cmd| {
                shared.handle_command(cmd);
                saw_on = shared.is_on(3);
            }),
            Event::LinkDown | Event::LinkUp => {}
        });
        if ticks >= 4 {
            break;
        }
        thread::sleep(Duration::from_millis(5));
    }
    drop(timer);

    assert!(saw_on);
    assert!(ticks >= 2);
    assert!(!shared.is_on(3));
    assert_eq!(shared.elapsed_on_secs(3), 0);
}

#[test]
fn link_up_stats_read_counters_under_the_lock() {
    let relays = MockRelays::default();
    let mut engine = PolicyEngine::new(
        relays.clone(),
        MockClock::at(720),
        MockStore::default(),
        LogNotifier::new(),
        &test_defaults(),
    );
    engine.start();
    let shared = SharedPolicyEngine::new(engine);

    let worker = {
        let shared = shared.clone();
        thread::spawn(move || {
            assert!(shared.request_activate(2));
            shared.set_away_mode(true).unwrap();
            shared.tick();
            shared.tick();
        })
    };
    worker.join().unwrap();

    let (ticks, forced, changes) = shared.with(|e| {
        let n = e.notifier();
        (e.tick_count(), n.forced_off_count(), n.policy_change_count())
    });
    assert_eq!(ticks, 2);
    assert_eq!(forced, 1);
    assert_eq!(changes, 1);
    assert!(!relays.is_on(2));
}
