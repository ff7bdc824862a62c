//! Policy engine: the hexagonal core.
//!
//! [`PolicyEngine`] owns the live [`PolicyConfig`], the per-channel
//! [`ElapsedTracker`], and one instance of each port.  It is the only code
//! path that switches a relay, so every activation is checked against away
//! and schedule policy and every forced shutdown is reported.
//!
//! ```text
//!  ClockSource ──▶ ┌────────────────────────┐ ──▶ NotificationPort
//!                  │      PolicyEngine       │
//! ActuatorPort ◀── │ Policy · Tracker · Cfg  │ ◀─▶ PersistencePort
//!                  └────────────────────────┘
//! ```
//!
//! Two drivers call in: the command path (`request_*`, `set_*`,
//! `handle_command`) and the periodic driver (`tick`).  The engine itself is
//! not synchronised; wrap it in [`SharedPolicyEngine`](super::shared::SharedPolicyEngine)
//! when both drivers run on different tasks.

use log::{error, info, warn};

use crate::config::{CHANNEL_COUNT, MINUTES_PER_DAY, PolicyConfig, keys};
use crate::error::{Error, Result};
use crate::safety::{ElapsedTracker, Expired};
use crate::schedule::{ScheduleWindows, TimeWindow};

use super::channel::{Channel, ChannelSet};
use super::commands::{CommandReply, RelayCommand};
use super::events::{ChannelStatus, ForceOffReason, PolicyChange, PolicySnapshot};
use super::policy::{self, Decision};
use super::ports::{ActuatorPort, ClockSource, NotificationPort, PersistencePort, StorageError};

// ───────────────────────────────────────────────────────────────
// Unsaved-value bookkeeping
// ───────────────────────────────────────────────────────────────

/// Policy fields, as units of persistence.
#[derive(Debug, Clone, Copy)]
enum Field {
    Away,
    ScheduleEnforce,
    Windows,
    MaxOn(Channel),
}

/// `Away`, `ScheduleEnforce` and `Windows`; the max-on slots follow.
const SCALAR_FIELDS: usize = 3;

impl Field {
    fn slot(self) -> usize {
        match self {
            Self::Away => 0,
            Self::ScheduleEnforce => 1,
            Self::Windows => 2,
            Self::MaxOn(ch) => SCALAR_FIELDS + ch.index(),
        }
    }
}

/// Fields whose last write failed.  A set call for such a field retries the
/// write even when the value is unchanged.
#[derive(Debug, Default)]
struct Unsaved([bool; SCALAR_FIELDS + CHANNEL_COUNT]);

impl Unsaved {
    fn contains(&self, field: Field) -> bool {
        self.0[field.slot()]
    }

    fn set(&mut self, field: Field, unsaved: bool) {
        self.0[field.slot()] = unsaved;
    }
}

// ───────────────────────────────────────────────────────────────
// PolicyEngine
// ───────────────────────────────────────────────────────────────

/// Single owner of the relays and the live policy; every switch goes through it.
pub struct PolicyEngine<A, C, P, N> {
    config: PolicyConfig,
    tracker: ElapsedTracker,
    actuator: A,
    clock: C,
    store: P,
    notifier: N,
    unsaved: Unsaved,
    tick_count: u64,
}

impl<A, C, P, N> PolicyEngine<A, C, P, N>
where
    A: ActuatorPort,
    C: ClockSource,
    P: PersistencePort,
    N: NotificationPort,
{
    /// Load the persisted policy (falling back to `defaults` per key) and
    /// record the relays' current state.  A relay that is already on starts
    /// its timer now.
    ///
    /// Does **not** enforce policy; call [`start`](Self::start) next.
    pub fn new(actuator: A, clock: C, store: P, notifier: N, defaults: &PolicyConfig) -> Self {
        let config = PolicyConfig::load(&store, defaults);
        let mut tracker = ElapsedTracker::new();
        for ch in Channel::all() {
            if actuator.get_channel(ch) {
                info!("Policy: relay {} observed on at boot", ch);
                tracker.mark_on(ch);
            }
        }

        Self {
            config,
            tracker,
            actuator,
            clock,
            store,
            notifier,
            unsaved: Unsaved::default(),
            tick_count: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Log the live policy and enforce it against the boot-time relay state.
    pub fn start(&mut self) {
        let c = &self.config;
        let (w1s, w1e, w2s, w2e) = c.windows.as_minutes();
        info!(
            "Policy init: away={}, away_mask=0x{:02X}, schedule={}, sch_mask=0x{:02X}, \
             W1={}..{}, W2={}..{}, max_on={:?}",
            c.away_mode,
            c.away_allowed.mask(),
            c.schedule_enforce,
            c.schedule_allowed.mask(),
            w1s,
            w1e,
            w2s,
            w2e,
            c.max_on_seconds,
        );
        if !self.clock.is_synchronized() {
            warn!("Policy: wall clock not synchronised yet");
        }
        self.apply_policy_now();
    }

    // ── Decisions ─────────────────────────────────────────────

    /// Whether `channel` may be switched on right now.  False for channels
    /// outside `1..=CHANNEL_COUNT`.
    pub fn can_activate(&self, channel: u8) -> bool {
        Channel::new(channel).is_some_and(|ch| self.decide(ch).is_allowed())
    }

    fn decide(&self, ch: Channel) -> Decision {
        policy::evaluate(&self.config, ch, &self.clock)
    }

    // ── Relay control ─────────────────────────────────────────

    /// Switch `channel` on if policy allows.  On denial nothing is touched.
    pub fn activate(&mut self, channel: u8) -> Result<()> {
        let ch = Channel::try_from(channel).inspect_err(|_| {
            warn!("Policy: activate rejected, invalid channel {}", channel);
        })?;

        if let Decision::Deny(reason) = self.decide(ch) {
            warn!("Policy: blocked ON relay {} ({})", ch, reason);
            return Err(Error::Denied(reason));
        }

        self.actuator.set_channel(ch, true).inspect_err(|e| {
            error!("Policy: relay {} ON failed: {}", ch, e);
        })?;
        self.tracker.mark_on(ch);
        info!("Policy: relay {} ON", ch);
        Ok(())
    }

    /// Boolean form of [`activate`](Self::activate): `true` if accepted.
    pub fn request_activate(&mut self, channel: u8) -> bool {
        self.activate(channel).is_ok()
    }

    /// Switch `channel` off.  Always permitted.
    pub fn request_deactivate(&mut self, channel: u8) -> Result<()> {
        let ch = Channel::try_from(channel).inspect_err(|_| {
            warn!("Policy: deactivate rejected, invalid channel {}", channel);
        })?;

        self.actuator.set_channel(ch, false).inspect_err(|e| {
            error!("Policy: relay {} OFF failed: {}", ch, e);
        })?;
        self.tracker.mark_off(ch);
        info!("Policy: relay {} OFF", ch);
        Ok(())
    }

    // ── Enforcement ───────────────────────────────────────────

    /// Re-check every ON channel against the current away/schedule policy
    /// and force off any that are no longer allowed.  Returns how many
    /// channels were switched off.
    pub fn apply_policy_now(&mut self) -> usize {
        let on: Expired = self.tracker.on_channels().collect();
        let mut forced = 0;
        for ch in on {
            if let Decision::Deny(reason) = self.decide(ch) {
                if self.force_off(ch, reason.into()) {
                    forced += 1;
                }
            }
        }
        forced
    }

    /// One safety tick (one second).  Advances ON timers, shuts off
    /// channels past their ceiling, then runs the away/schedule pass.
    /// Returns how many channels were switched off.
    pub fn tick(&mut self) -> usize {
        self.tick_count += 1;
        let mut forced = 0;

        for ch in self.tracker.advance(&self.config.max_on_seconds) {
            let limit_secs = self.config.max_on(ch);
            if self.force_off(ch, ForceOffReason::MaxOnElapsed { limit_secs }) {
                forced += 1;
            }
        }

        forced + self.apply_policy_now()
    }

    /// Switch `ch` off on the engine's own initiative.  If the relay write
    /// fails the channel stays recorded on and the next pass retries.
    fn force_off(&mut self, ch: Channel, reason: ForceOffReason) -> bool {
        match self.actuator.set_channel(ch, false) {
            Ok(()) => {
                self.tracker.mark_off(ch);
                warn!("Policy: OFF relay {} ({})", ch, reason);
                self.notifier.on_channel_forced_off(ch, reason);
                true
            }
            Err(e) => {
                error!("Policy: forced OFF of relay {} failed ({}): {}", ch, reason, e);
                false
            }
        }
    }

    // ── Policy setters ────────────────────────────────────────

    pub fn set_away_mode(&mut self, on: bool) -> Result<()> {
        let changed = self.config.away_mode != on;
        if !changed && !self.unsaved.contains(Field::Away) {
            return Ok(());
        }
        let persisted = self.store.set_bool(keys::AWAY, on);
        self.config.away_mode = on;
        if changed {
            warn!("Policy: away mode -> {}", on);
        }
        self.commit(Field::Away, changed, persisted, PolicyChange::AwayMode(on))
    }

    pub fn set_schedule_enforce(&mut self, on: bool) -> Result<()> {
        let changed = self.config.schedule_enforce != on;
        if !changed && !self.unsaved.contains(Field::ScheduleEnforce) {
            return Ok(());
        }
        let persisted = self.store.set_bool(keys::SCHEDULE_ENFORCE, on);
        self.config.schedule_enforce = on;
        if changed {
            warn!("Policy: schedule enforce -> {}", on);
        }
        self.commit(Field::ScheduleEnforce, changed, persisted, PolicyChange::ScheduleEnforce(on))
    }

    /// Replace both windows.  Every bound must be below 1440.
    pub fn set_windows(&mut self, windows: ScheduleWindows) -> Result<()> {
        let (w1s, w1e, w2s, w2e) = windows.as_minutes();
        let windows = ScheduleWindows {
            w1: TimeWindow::new(w1s, w1e)?,
            w2: TimeWindow::new(w2s, w2e)?,
        };

        let changed = self.config.windows != windows;
        if !changed && !self.unsaved.contains(Field::Windows) {
            return Ok(());
        }
        // Write all four keys even if one fails; report the first failure.
        let persisted = [
            (keys::W1_START, w1s),
            (keys::W1_END, w1e),
            (keys::W2_START, w2s),
            (keys::W2_END, w2e),
        ]
        .into_iter()
        .map(|(key, minute)| self.store.set_u16(key, minute))
        .fold(Ok(()), core::result::Result::and);
        self.config.windows = windows;
        if changed {
            info!("Policy: schedule windows W1={}..{} W2={}..{}", w1s, w1e, w2s, w2e);
        }
        self.commit(Field::Windows, changed, persisted, PolicyChange::Windows(windows))
    }

    /// Set the continuous ON ceiling for `channel` (0 = unlimited).
    pub fn set_max_on_seconds(&mut self, channel: u8, seconds: u32) -> Result<()> {
        let ch = Channel::try_from(channel)?;
        let changed = self.config.max_on(ch) != seconds;
        if !changed && !self.unsaved.contains(Field::MaxOn(ch)) {
            return Ok(());
        }
        let persisted = self.store.set_u32(keys::max_on(ch), seconds);
        self.config.max_on_seconds[ch.index()] = seconds;
        if changed {
            info!("Policy: relay {} max-on set to {}s", ch, seconds);
        }
        self.commit(
            Field::MaxOn(ch),
            changed,
            persisted,
            PolicyChange::MaxOnSeconds { channel: ch, seconds },
        )
    }

    /// Common tail of every setter: track the write outcome, re-enforce,
    /// and tell observers about the live value.
    fn commit(
        &mut self,
        field: Field,
        changed: bool,
        persisted: core::result::Result<(), StorageError>,
        change: PolicyChange,
    ) -> Result<()> {
        self.unsaved.set(field, persisted.is_err());
        if let Err(e) = persisted {
            warn!("Policy: persisting {:?} failed ({}), in-memory value stays live", field, e);
        }
        if changed {
            self.apply_policy_now();
            self.notifier.on_policy_changed(&change);
        }
        persisted.map_err(Error::from)
    }

    // ── Command handling ──────────────────────────────────────

    /// Process a command from the remote transport and report what the
    /// transport should publish back.
    pub fn handle_command(&mut self, cmd: RelayCommand) -> CommandReply {
        match cmd {
            RelayCommand::SetChannel { channel, on } => {
                let Some(ch) = Channel::new(channel) else {
                    warn!("Command: invalid relay channel {}", channel);
                    return CommandReply::None;
                };
                // Failures are logged where they happen; the reply carries
                // the actual state either way.
                let _ = if on {
                    self.activate(channel)
                } else {
                    self.request_deactivate(channel)
                };
                CommandReply::Relay {
                    channel,
                    on: self.tracker.is_on(ch),
                }
            }
            RelayCommand::SetAwayMode(on) => {
                let _ = self.set_away_mode(on);
                CommandReply::AwayMode(self.config.away_mode)
            }
            RelayCommand::SetScheduleEnforce(on) => {
                let _ = self.set_schedule_enforce(on);
                CommandReply::ScheduleEnforce(self.config.schedule_enforce)
            }
            RelayCommand::SetWindowField { field, minute } => {
                let minute = minute.min(u32::from(MINUTES_PER_DAY - 1)) as u16;
                let _ = self.set_windows(field.apply(self.config.windows, minute));
                CommandReply::Windows(self.config.windows)
            }
            RelayCommand::SetMaxOnMinutes { channel, minutes } => {
                let Some(ch) = Channel::new(channel) else {
                    warn!("Command: invalid relay channel {}", channel);
                    return CommandReply::None;
                };
                let _ = self.set_max_on_seconds(channel, minutes.saturating_mul(60));
                CommandReply::MaxOnMinutes {
                    channel,
                    minutes: self.config.max_on(ch) / 60,
                }
            }
            RelayCommand::LinkLost => {
                warn!("Command: link lost, re-applying policy");
                self.apply_policy_now();
                CommandReply::None
            }
            RelayCommand::Refresh => CommandReply::Snapshot(self.snapshot()),
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn away_mode(&self) -> bool {
        self.config.away_mode
    }

    pub fn schedule_enforce(&self) -> bool {
        self.config.schedule_enforce
    }

    pub fn windows(&self) -> ScheduleWindows {
        self.config.windows
    }

    pub fn max_on_seconds(&self, channel: u8) -> Result<u32> {
        Ok(self.config.max_on(Channel::try_from(channel)?))
    }

    pub fn away_allowed(&self) -> ChannelSet {
        self.config.away_allowed
    }

    pub fn schedule_allowed(&self) -> ChannelSet {
        self.config.schedule_allowed
    }

    pub fn away_allowed_mask(&self) -> u8 {
        self.config.away_allowed.mask()
    }

    pub fn schedule_allowed_mask(&self) -> u8 {
        self.config.schedule_allowed.mask()
    }

    /// Recorded on-state (false for invalid channels).
    pub fn is_on(&self, channel: u8) -> bool {
        Channel::new(channel).is_some_and(|ch| self.tracker.is_on(ch))
    }

    /// Continuous ON seconds (0 for off or invalid channels).
    pub fn elapsed_on_secs(&self, channel: u8) -> u32 {
        Channel::new(channel).map_or(0, |ch| self.tracker.elapsed_secs(ch))
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Safety ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn snapshot(&self) -> PolicySnapshot {
        let channels = Channel::each(|ch| ChannelStatus {
            channel: ch,
            is_on: self.tracker.is_on(ch),
            elapsed_on_secs: self.tracker.elapsed_secs(ch),
        });
        PolicySnapshot {
            channels,
            config: self.config.clone(),
            clock_synchronized: self.clock.is_synchronized(),
        }
    }

    // ── Port access (read-only) ───────────────────────────────

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn store(&self) -> &P {
        &self.store
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }
}
