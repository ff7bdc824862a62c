//! Thread-safe handle to the policy engine.
//!
//! The command path and the safety tick run on different tasks.  Every
//! entry point takes the same lock, so a decision and the state change it
//! authorises are observed atomically by the other side: a tick can never
//! see half of an activation, and an activation can never slip in between
//! a tick's evaluation and its forced shutdown.
//!
//! A panic while the lock is held poisons it.  The engine's invariants hold
//! between port calls, so the handle recovers the guard and carries on
//! rather than taking the relays down with it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::Result;
use crate::schedule::ScheduleWindows;

use super::commands::{CommandReply, RelayCommand};
use super::engine::PolicyEngine;
use super::events::PolicySnapshot;
use super::ports::{ActuatorPort, ClockSource, NotificationPort, PersistencePort};

pub struct SharedPolicyEngine<A, C, P, N> {
    inner: Arc<Mutex<PolicyEngine<A, C, P, N>>>,
}

impl<A, C, P, N> Clone for SharedPolicyEngine<A, C, P, N> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A, C, P, N> SharedPolicyEngine<A, C, P, N>
where
    A: ActuatorPort,
    C: ClockSource,
    P: PersistencePort,
    N: NotificationPort,
{
    pub fn new(engine: PolicyEngine<A, C, P, N>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PolicyEngine<A, C, P, N>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` with exclusive access to the engine.
    pub fn with<R>(&self, f: impl FnOnce(&mut PolicyEngine<A, C, P, N>) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn start(&self) {
        self.lock().start();
    }

    pub fn can_activate(&self, channel: u8) -> bool {
        self.lock().can_activate(channel)
    }

    pub fn request_activate(&self, channel: u8) -> bool {
        self.lock().request_activate(channel)
    }

    pub fn activate(&self, channel: u8) -> Result<()> {
        self.lock().activate(channel)
    }

    pub fn request_deactivate(&self, channel: u8) -> Result<()> {
        self.lock().request_deactivate(channel)
    }

    pub fn apply_policy_now(&self) -> usize {
        self.lock().apply_policy_now()
    }

    pub fn tick(&self) -> usize {
        self.lock().tick()
    }

    pub fn handle_command(&self, cmd: RelayCommand) -> CommandReply {
        self.lock().handle_command(cmd)
    }

    pub fn away_mode(&self) -> bool {
        self.lock().away_mode()
    }

    pub fn set_away_mode(&self, on: bool) -> Result<()> {
        self.lock().set_away_mode(on)
    }

    pub fn schedule_enforce(&self) -> bool {
        self.lock().schedule_enforce()
    }

    pub fn set_schedule_enforce(&self, on: bool) -> Result<()> {
        self.lock().set_schedule_enforce(on)
    }

    pub fn windows(&self) -> ScheduleWindows {
        self.lock().windows()
    }

    pub fn set_windows(&self, windows: ScheduleWindows) -> Result<()> {
        self.lock().set_windows(windows)
    }

    pub fn max_on_seconds(&self, channel: u8) -> Result<u32> {
        self.lock().max_on_seconds(channel)
    }

    pub fn set_max_on_seconds(&self, channel: u8, seconds: u32) -> Result<()> {
        self.lock().set_max_on_seconds(channel, seconds)
    }

    pub fn is_on(&self, channel: u8) -> bool {
        self.lock().is_on(channel)
    }

    pub fn elapsed_on_secs(&self, channel: u8) -> u32 {
        self.lock().elapsed_on_secs(channel)
    }

    pub fn snapshot(&self) -> PolicySnapshot {
        self.lock().snapshot()
    }
}
