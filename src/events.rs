//! Interrupt-driven event system.
//!
//! Events are produced by:
//! - The safety tick timer (1 Hz)
//! - The command transport (link state changes, command arrival)
//!
//! Events are consumed by the main loop, which processes them one at a
//! time in FIFO order.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Tick timer  │────▶│  Event Queue │────▶│  Main Loop   │
//! │ Transport   │────▶│  (lock-free) │     │  (consumer)  │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! Command payloads travel separately through [`crate::inbox`]; the queue
//! only carries the wake-up.

use heapless::mpmc::Q32;

/// System event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// One-second safety tick.
    SafetyTick,
    /// The command transport lost its connection.
    LinkDown,
    /// The command transport (re)connected; publish the full state.
    LinkUp,
    /// A command is waiting in the inbox.
    CommandReceived,
}

/// Bounded multi-producer queue of pending [`Event`]s.
pub struct EventQueue {
    inner: Q32<Event>,
}

impl EventQueue {
    pub const fn new() -> Self {
        Self { inner: Q32::new() }
    }

    /// Push an event.  Safe from timer callbacks and other tasks.
    /// Returns `false` if the queue is full (event dropped).
    pub fn push(&self, event: Event) -> bool {
        self.inner.enqueue(event).is_ok()
    }

    pub fn pop(&self) -> Option<Event> {
        self.inner.dequeue()
    }

    /// Drain all pending events into a callback, oldest first.
    pub fn drain(&self, mut handler: impl FnMut(Event)) {
        while let Some(event) = self.pop() {
            handler(event);
        }
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// The firmware's global event queue.
pub static EVENTS: EventQueue = EventQueue::new();
