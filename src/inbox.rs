//! Command inbox.
//!
//! The remote command transport (MQTT or otherwise) parses its payloads
//! into [`RelayCommand`]s and hands them to the main loop here.  Sending
//! also raises [`Event::CommandReceived`] so the loop wakes up.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use crate::app::commands::RelayCommand;
use crate::events::{Event, EventQueue};

/// Commands buffered between the transport and the main loop.
pub const INBOX_DEPTH: usize = 8;

pub type CommandInbox = Channel<CriticalSectionRawMutex, RelayCommand, INBOX_DEPTH>;

pub static COMMAND_INBOX: CommandInbox = Channel::new();

/// Queue `cmd` and wake the consumer of `events`.  Returns `false` (and
/// drops the command) if the inbox is full.
pub fn submit(inbox: &CommandInbox, events: &EventQueue, cmd: RelayCommand) -> bool {
    if inbox.try_send(cmd).is_err() {
        log::warn!("Inbox: full, dropped {:?}", cmd);
        return false;
    }
    // A lost wake-up is harmless: the next drain picks the command up.
    let _ = events.push(Event::CommandReceived);
    true
}

/// Hand every pending command to `handler`, oldest first.
pub fn drain(inbox: &CommandInbox, mut handler: impl FnMut(RelayCommand)) {
    while let Ok(cmd) = inbox.try_receive() {
        handler(cmd);
    }
}
