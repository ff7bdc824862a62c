//! Integration tests for the PolicyEngine decision, mutation and
//! enforcement paths against mock ports.

use relayguard::app::commands::{CommandReply, RelayCommand, WindowField};
use relayguard::app::events::{ForceOffReason, PolicyChange};
use relayguard::app::policy::DenyReason;
use relayguard::error::Error;
use relayguard::schedule::ScheduleWindows;

use crate::mock_ports::{Note, Rig, test_defaults};

// ── Decisions ─────────────────────────────────────────────────

#[test]
fn everything_allowed_without_restrictions() {
    let rig = Rig::new();
    let engine = rig.engine(&test_defaults());
    for ch in 1..=4 {
        assert!(engine.can_activate(ch), "channel {ch}");
    }
    assert!(!engine.can_activate(0));
    assert!(!engine.can_activate(5));
}

#[test]
fn away_mode_restricts_to_allow_set() {
    let rig = Rig::new();
    let mut engine = rig.engine(&test_defaults());
    engine.set_away_mode(true).unwrap();

    assert!(engine.can_activate(1));
    for ch in 2..=4 {
        assert!(!engine.can_activate(ch), "channel {ch}");
    }
    assert_eq!(engine.activate(3), Err(Error::Denied(DenyReason::AwayMode)));
}

#[test]
fn empty_away_set_blocks_every_channel() {
    let rig = Rig::new();
    let mut defaults = test_defaults();
    defaults.away_mode = true;
    defaults.away_allowed = relayguard::app::channel::ChannelSet::empty();
    let engine = rig.engine(&defaults);
    assert!((1..=4).all(|ch| !engine.can_activate(ch)));
}

#[test]
fn schedule_outside_windows_denies_and_leaves_actuator_untouched() {
    let rig = Rig::new();
    let mut engine = rig.engine(&test_defaults());
    engine.set_schedule_enforce(true).unwrap();
    rig.clock.set_minute(1100); // 18:20, between W1 and W2

    assert!(!engine.request_activate(3));
    assert_eq!(rig.relays.write_count(), 0);
    assert!(!engine.is_on(3));

    // Schedule-allowed channel is exempt.
    assert!(engine.request_activate(2));
}

#[test]
fn wrapping_window_spans_midnight() {
    let rig = Rig::new();
    let mut engine = rig.engine(&test_defaults());
    engine.set_schedule_enforce(true).unwrap();

    for (minute, allowed) in [(1350, true), (100, true), (359, true), (360, false), (700, true), (1319, false)] {
        rig.clock.set_minute(minute);
        assert_eq!(engine.can_activate(4), allowed, "minute {minute}");
    }
}

#[test]
fn unsynced_clock_denies_restricted_channels() {
    let rig = Rig::new();
    let mut engine = rig.engine(&test_defaults());
    assert!(engine.request_activate(3));
    rig.clock.set_synced(false);

    // Irrelevant while the schedule is off.
    assert!(engine.can_activate(4));

    engine.set_schedule_enforce(true).unwrap();
    assert!(!engine.is_on(3));
    assert_eq!(
        rig.notes.forced_off(),
        vec![(3, ForceOffReason::ClockUnsynchronized)]
    );
    assert_eq!(
        engine.activate(4),
        Err(Error::Denied(DenyReason::ClockUnsynchronized))
    );
    assert!(engine.can_activate(2));
}

// ── Mutation ──────────────────────────────────────────────────

#[test]
fn activate_and_deactivate_drive_the_relay() {
    let rig = Rig::new();
    let mut engine = rig.engine(&test_defaults());

    assert!(engine.request_activate(2));
    assert!(rig.relays.is_on(2));
    engine.tick();
    assert_eq!(engine.elapsed_on_secs(2), 1);

    engine.request_deactivate(2).unwrap();
    assert!(!rig.relays.is_on(2));
    assert!(!engine.is_on(2));
    assert_eq!(engine.elapsed_on_secs(2), 0);
}

#[test]
fn invalid_channel_never_mutates() {
    let rig = Rig::new();
    let mut engine = rig.engine(&test_defaults());
    assert!(!engine.request_activate(7));
    assert_eq!(engine.request_deactivate(0), Err(Error::InvalidChannel(0)));
    assert_eq!(engine.set_max_on_seconds(5, 60), Err(Error::InvalidChannel(5)));
    assert_eq!(rig.relays.write_count(), 0);
    assert_eq!(rig.store.write_attempts(), 0);
    assert!(rig.notes.notes().is_empty());
}

#[test]
fn setters_persist_then_notify() {
    let rig = Rig::new();
    let mut engine = rig.engine(&test_defaults());

    engine.set_away_mode(true).unwrap();
    engine.set_schedule_enforce(true).unwrap();
    let windows = ScheduleWindows::from_minutes(0, 60, 600, 600).unwrap();
    engine.set_windows(windows).unwrap();
    engine.set_max_on_seconds(4, 90).unwrap();

    assert_eq!(rig.store.get("away"), Some(1));
    assert_eq!(rig.store.get("schedule_enforce"), Some(1));
    assert_eq!(rig.store.get("w1_end"), Some(60));
    assert_eq!(rig.store.get("w2_start"), Some(600));
    assert_eq!(rig.store.get("max_on_4"), Some(90));

    assert!(engine.away_mode());
    assert!(engine.schedule_enforce());
    assert_eq!(engine.windows(), windows);
    assert_eq!(engine.max_on_seconds(4), Ok(90));

    assert_eq!(
        rig.notes.notes(),
        vec![
            Note::Changed(PolicyChange::AwayMode(true)),
            Note::Changed(PolicyChange::ScheduleEnforce(true)),
            Note::Changed(PolicyChange::Windows(windows)),
            Note::Changed(PolicyChange::MaxOnSeconds {
                channel: relayguard::app::channel::Channel::new(4).unwrap(),
                seconds: 90,
            }),
        ]
    );
}

#[test]
fn unchanged_values_skip_persistence_and_enforcement() {
    let rig = Rig::new();
    let mut engine = rig.engine(&test_defaults());
    engine.set_away_mode(false).unwrap();
    engine.set_schedule_enforce(false).unwrap();
    engine.set_windows(test_defaults().windows).unwrap();
    engine.set_max_on_seconds(1, 0).unwrap();
    assert_eq!(rig.store.write_attempts(), 0);
    assert!(rig.notes.notes().is_empty());
}

#[test]
fn window_outside_day_is_rejected() {
    let rig = Rig::new();
    let mut engine = rig.engine(&test_defaults());
    assert!(ScheduleWindows::from_minutes(0, 1440, 0, 0).is_err());

    let mut w = engine.windows();
    w.w1.start_min = 2000;
    assert_eq!(engine.set_windows(w), Err(Error::InvalidWindow(2000)));
    assert_eq!(engine.windows(), test_defaults().windows);
    assert_eq!(rig.store.write_attempts(), 0);
}

// ── Enforcement ───────────────────────────────────────────────

#[test]
fn enabling_away_forces_off_restricted_channels() {
    let rig = Rig::new();
    let mut engine = rig.engine(&test_defaults());
    for ch in 1..=4 {
        assert!(engine.request_activate(ch));
    }

    engine.set_away_mode(true).unwrap();
    assert!(rig.relays.is_on(1));
    for ch in 2..=4 {
        assert!(!rig.relays.is_on(ch));
    }
    assert_eq!(
        rig.notes.forced_off(),
        vec![
            (2, ForceOffReason::AwayMode),
            (3, ForceOffReason::AwayMode),
            (4, ForceOffReason::AwayMode),
        ]
    );
}

#[test]
fn apply_policy_now_is_idempotent() {
    let rig = Rig::new();
    let mut engine = rig.engine(&test_defaults());
    assert!(engine.request_activate(2));
    assert!(engine.request_activate(3));
    engine.set_schedule_enforce(true).unwrap();
    rig.clock.set_minute(1100);

    assert_eq!(engine.apply_policy_now(), 1);
    let writes = rig.relays.write_count();
    let notes = rig.notes.notes().len();

    assert_eq!(engine.apply_policy_now(), 0);
    assert_eq!(rig.relays.write_count(), writes);
    assert_eq!(rig.notes.notes().len(), notes);
    assert!(engine.is_on(2));
    assert!(!engine.is_on(3));
}

#[test]
fn max_on_timeout_forces_off_by_deadline() {
    let rig = Rig::new();
    let mut engine = rig.engine(&test_defaults());
    engine.set_max_on_seconds(3, 5).unwrap();
    assert!(engine.request_activate(3));

    let mut forced_at = None;
    for t in 1..=5 {
        engine.tick();
        if !engine.is_on(3) {
            forced_at = Some(t);
            break;
        }
    }
    assert_eq!(forced_at, Some(5));
    assert_eq!(engine.elapsed_on_secs(3), 0);
    assert!(!rig.relays.is_on(3));
    assert_eq!(
        rig.notes.forced_off(),
        vec![(3, ForceOffReason::MaxOnElapsed { limit_secs: 5 })]
    );
}

#[test]
fn tick_runs_schedule_pass() {
    let rig = Rig::new();
    let mut engine = rig.engine(&test_defaults());
    engine.set_schedule_enforce(true).unwrap();
    rig.clock.set_minute(1019);
    assert!(engine.request_activate(4));

    engine.tick();
    assert!(engine.is_on(4));

    rig.clock.set_minute(1020);
    assert_eq!(engine.tick(), 1);
    assert!(!engine.is_on(4));
    assert_eq!(rig.notes.forced_off(), vec![(4, ForceOffReason::OutsideSchedule)]);
}

#[test]
fn channel_on_at_boot_is_timed_and_policed() {
    let rig = Rig {
        relays: crate::mock_ports::MockRelays::with_on(&[2, 3]),
        ..Rig::new()
    };
    rig.store.put("away", 1);
    rig.store.put("max_on_2", 2);
    let mut defaults = test_defaults();
    defaults.away_allowed = relayguard::app::channel::ChannelSet::from_mask(0b0010);

    let mut engine = rig.engine(&defaults);
    // Channel 3 is not away-allowed: switched off during start().
    assert!(!engine.is_on(3));
    assert!(engine.is_on(2));

    engine.tick();
    engine.tick();
    assert!(!engine.is_on(2));
    assert_eq!(
        rig.notes.forced_off(),
        vec![
            (3, ForceOffReason::AwayMode),
            (2, ForceOffReason::MaxOnElapsed { limit_secs: 2 }),
        ]
    );
}

#[test]
fn actuator_failure_keeps_recorded_state_and_retries() {
    let rig = Rig::new();
    let mut engine = rig.engine(&test_defaults());
    assert!(engine.request_activate(4));

    rig.relays.set_broken(true);
    assert!(matches!(engine.request_deactivate(4), Err(Error::Actuator(_))));
    assert!(engine.is_on(4));

    engine.set_away_mode(true).unwrap();
    assert!(engine.is_on(4));
    assert!(rig.notes.forced_off().is_empty());
    engine.tick();
    assert_eq!(engine.elapsed_on_secs(4), 1);

    rig.relays.set_broken(false);
    engine.tick();
    assert!(!engine.is_on(4));
    assert_eq!(rig.notes.forced_off(), vec![(4, ForceOffReason::AwayMode)]);
}

#[test]
fn activation_failure_leaves_channel_off() {
    let rig = Rig::new();
    let mut engine = rig.engine(&test_defaults());
    rig.relays.set_broken(true);
    assert!(!engine.request_activate(1));
    assert!(!engine.is_on(1));
    engine.tick();
    assert_eq!(engine.elapsed_on_secs(1), 0);
}

// ── Commands ──────────────────────────────────────────────────

#[test]
fn blocked_relay_command_reports_actual_state() {
    let rig = Rig::new();
    let mut engine = rig.engine(&test_defaults());
    engine.handle_command(RelayCommand::SetAwayMode(true));

    assert_eq!(
        engine.handle_command(RelayCommand::SetChannel { channel: 2, on: true }),
        CommandReply::Relay { channel: 2, on: false }
    );
    assert_eq!(
        engine.handle_command(RelayCommand::SetChannel { channel: 1, on: true }),
        CommandReply::Relay { channel: 1, on: true }
    );
    assert_eq!(
        engine.handle_command(RelayCommand::SetChannel { channel: 1, on: false }),
        CommandReply::Relay { channel: 1, on: false }
    );
}

#[test]
fn window_field_commands_edit_one_bound() {
    let rig = Rig::new();
    let mut engine = rig.engine(&test_defaults());

    let reply = engine.handle_command(RelayCommand::SetWindowField {
        field: WindowField::W1Start,
        minute: 420,
    });
    let expected = ScheduleWindows::from_minutes(420, 1020, 1320, 360).unwrap();
    assert_eq!(reply, CommandReply::Windows(expected));
    assert_eq!(rig.store.get("w1_start"), Some(420));

    let reply = engine.handle_command(RelayCommand::SetWindowField {
        field: WindowField::W2Start,
        minute: 99_999,
    });
    assert_eq!(
        reply,
        CommandReply::Windows(ScheduleWindows::from_minutes(420, 1020, 1439, 360).unwrap())
    );
}

#[test]
fn max_on_command_takes_minutes() {
    let rig = Rig::new();
    let mut engine = rig.engine(&test_defaults());
    assert_eq!(
        engine.handle_command(RelayCommand::SetMaxOnMinutes { channel: 3, minutes: 15 }),
        CommandReply::MaxOnMinutes { channel: 3, minutes: 15 }
    );
    assert_eq!(engine.max_on_seconds(3), Ok(900));
    assert_eq!(
        engine.handle_command(RelayCommand::SetMaxOnMinutes { channel: 0, minutes: 15 }),
        CommandReply::None
    );
}

#[test]
fn link_lost_reapplies_policy() {
    let rig = Rig::new();
    let mut engine = rig.engine(&test_defaults());
    engine.set_schedule_enforce(true).unwrap();
    assert!(engine.request_activate(3));

    rig.clock.set_minute(1100);
    assert_eq!(engine.handle_command(RelayCommand::LinkLost), CommandReply::None);
    assert!(!engine.is_on(3));
}

#[test]
fn refresh_returns_serialisable_snapshot() {
    let rig = Rig::new();
    let mut engine = rig.engine(&test_defaults());
    assert!(engine.request_activate(2));
    engine.tick();

    let CommandReply::Snapshot(snap) = engine.handle_command(RelayCommand::Refresh) else {
        panic!("expected snapshot");
    };
    assert!(snap.channels[1].is_on);
    assert_eq!(snap.channels[1].elapsed_on_secs, 1);

    let json = serde_json::to_value(&snap).unwrap();
    assert_eq!(json["channels"][1]["channel"], 2);
    assert_eq!(json["config"]["windows"]["w1"]["start_min"], 480);
    assert_eq!(json["clock_synchronized"], true);
}

#[test]
fn allow_masks_follow_the_defaults() {
    let rig = Rig::new();
    let engine = rig.engine(&test_defaults());
    assert_eq!(engine.away_allowed_mask(), 0b0001);
    assert_eq!(engine.schedule_allowed_mask(), 0b0010);
    assert_eq!(engine.tick_count(), 0);
}
