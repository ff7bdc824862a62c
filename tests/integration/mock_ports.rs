//! Mock port adapters for integration tests.
//!
//! Each mock keeps its state behind an `Arc`, so a test can hand one clone
//! to the engine and keep another to inspect (or sabotage) what the engine
//! did.  All of them are `Send`, so the same mocks serve the concurrency
//! tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use relayguard::app::channel::{Channel, ChannelSet};
use relayguard::app::engine::PolicyEngine;
use relayguard::app::events::{ForceOffReason, PolicyChange};
use relayguard::app::ports::{
    ActuatorPort, ClockSource, NotificationPort, PersistencePort, StorageError,
};
use relayguard::config::{CHANNEL_COUNT, PolicyConfig};
use relayguard::error::ActuatorError;
use relayguard::schedule::ScheduleWindows;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

// ── Relays ────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct RelayState {
    pub on: [bool; CHANNEL_COUNT],
    pub broken: bool,
    /// Every successful write, in order.
    pub writes: Vec<(u8, bool)>,
}

#[derive(Clone, Default)]
pub struct MockRelays(Arc<Mutex<RelayState>>);

#[allow(dead_code)]
impl MockRelays {
    pub fn with_on(channels: &[u8]) -> Self {
        let relays = Self::default();
        for &n in channels {
            lock(&relays.0).on[usize::from(n) - 1] = true;
        }
        relays
    }

    pub fn is_on(&self, channel: u8) -> bool {
        lock(&self.0).on[usize::from(channel) - 1]
    }

    pub fn set_broken(&self, broken: bool) {
        lock(&self.0).broken = broken;
    }

    pub fn write_count(&self) -> usize {
        lock(&self.0).writes.len()
    }
}

impl ActuatorPort for MockRelays {
    fn set_channel(&mut self, ch: Channel, on: bool) -> Result<(), ActuatorError> {
        let mut s = lock(&self.0);
        if s.broken {
            return Err(ActuatorError::GpioWriteFailed);
        }
        s.on[ch.index()] = on;
        s.writes.push((ch.number(), on));
        Ok(())
    }

    fn get_channel(&self, ch: Channel) -> bool {
        lock(&self.0).on[ch.index()]
    }
}

// ── Clock ─────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MockClock {
    minute: Arc<AtomicU32>,
    synced: Arc<AtomicBool>,
}

#[allow(dead_code)]
impl MockClock {
    pub fn at(minute: u32) -> Self {
        Self {
            minute: Arc::new(AtomicU32::new(minute)),
            synced: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn set_minute(&self, minute: u32) {
        self.minute.store(minute, Ordering::SeqCst);
    }

    pub fn set_synced(&self, synced: bool) {
        self.synced.store(synced, Ordering::SeqCst);
    }
}

impl ClockSource for MockClock {
    fn minutes_since_local_midnight(&self) -> u32 {
        self.minute.load(Ordering::SeqCst)
    }

    fn is_synchronized(&self) -> bool {
        self.synced.load(Ordering::SeqCst)
    }
}

// ── Storage ───────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct StoreState {
    pub map: HashMap<String, u32>,
    pub fail_writes: bool,
    pub write_attempts: usize,
}

#[derive(Clone, Default)]
pub struct MockStore(Arc<Mutex<StoreState>>);

#[allow(dead_code)]
impl MockStore {
    pub fn set_fail_writes(&self, fail: bool) {
        lock(&self.0).fail_writes = fail;
    }

    pub fn get(&self, key: &str) -> Option<u32> {
        lock(&self.0).map.get(key).copied()
    }

    pub fn put(&self, key: &str, value: u32) {
        lock(&self.0).map.insert(key.to_owned(), value);
    }

    pub fn write_attempts(&self) -> usize {
        lock(&self.0).write_attempts
    }
}

impl PersistencePort for MockStore {
    fn get_u32(&self, key: &str, default: u32) -> u32 {
        self.get(key).unwrap_or(default)
    }

    fn set_u32(&mut self, key: &str, value: u32) -> Result<(), StorageError> {
        let mut s = lock(&self.0);
        s.write_attempts += 1;
        if s.fail_writes {
            return Err(StorageError::IoError);
        }
        s.map.insert(key.to_owned(), value);
        Ok(())
    }
}

// ── Notifications ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Note {
    ForcedOff(u8, ForceOffReason),
    Changed(PolicyChange),
}

#[derive(Clone, Default)]
pub struct RecordingNotifier(Arc<Mutex<Vec<Note>>>);

#[allow(dead_code)]
impl RecordingNotifier {
    pub fn notes(&self) -> Vec<Note> {
        lock(&self.0).clone()
    }

    pub fn forced_off(&self) -> Vec<(u8, ForceOffReason)> {
        self.notes()
            .into_iter()
            .filter_map(|n| match n {
                Note::ForcedOff(ch, reason) => Some((ch, reason)),
                Note::Changed(_) => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        lock(&self.0).clear();
    }
}

impl NotificationPort for RecordingNotifier {
    fn on_channel_forced_off(&mut self, ch: Channel, reason: ForceOffReason) {
        lock(&self.0).push(Note::ForcedOff(ch.number(), reason));
    }

    fn on_policy_changed(&mut self, change: &PolicyChange) {
        lock(&self.0).push(Note::Changed(*change));
    }
}

// ── Rig ───────────────────────────────────────────────────────

pub type TestEngine = PolicyEngine<MockRelays, MockClock, MockStore, RecordingNotifier>;

/// Handles to every mock wired into an engine.
#[derive(Clone)]
pub struct Rig {
    pub relays: MockRelays,
    pub clock: MockClock,
    pub store: MockStore,
    pub notes: RecordingNotifier,
}

#[allow(dead_code)]
impl Rig {
    /// All relays off, clock synced at noon, empty store.
    pub fn new() -> Self {
        Self {
            relays: MockRelays::default(),
            clock: MockClock::at(720),
            store: MockStore::default(),
            notes: RecordingNotifier::default(),
        }
    }

    /// Build and start an engine over this rig's mocks.
    pub fn engine(&self, defaults: &PolicyConfig) -> TestEngine {
        let mut engine = PolicyEngine::new(
            self.relays.clone(),
            self.clock.clone(),
            self.store.clone(),
            self.notes.clone(),
            defaults,
        );
        engine.start();
        engine
    }
}

/// No restrictions, no ceilings; channel 1 away-allowed, channel 2
/// schedule-allowed; W1 08:00-17:00, W2 22:00-06:00.
#[allow(dead_code)]
pub fn test_defaults() -> PolicyConfig {
    PolicyConfig {
        away_mode: false,
        away_allowed: ChannelSet::from_mask(0b0001),
        schedule_enforce: false,
        schedule_allowed: ChannelSet::from_mask(0b0010),
        windows: ScheduleWindows::from_minutes(480, 1020, 1320, 360).unwrap(),
        max_on_seconds: [0; CHANNEL_COUNT],
    }
}
