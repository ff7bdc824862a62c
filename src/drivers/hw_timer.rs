//! Safety tick source.
//!
//! Pushes [`Event::SafetyTick`] into an [`EventQueue`] at a fixed cadence.
//! On ESP-IDF the callback runs in the esp_timer task (not ISR), driven by
//! `EspTaskTimerService`.  On host a plain thread sleeps between pushes.
//!
//! A full queue drops the tick; the next one carries on.

use core::time::Duration;

use crate::events::{Event, EventQueue};

#[cfg(target_os = "espidf")]
pub use device::TickDriver;
#[cfg(not(target_os = "espidf"))]
pub use host::TickDriver;

fn push_tick(events: &EventQueue) {
    if !events.push(Event::SafetyTick) {
        log::warn!("hw_timer: event queue full, tick dropped");
    }
}

#[cfg(target_os = "espidf")]
mod device {
    use super::*;
    use esp_idf_svc::sys::EspError;
    use esp_idf_svc::timer::{EspTaskTimerService, EspTimer};
    use log::info;

    /// Periodic timer; stops when dropped.
    pub struct TickDriver {
        _timer: EspTimer<'static>,
    }

    impl TickDriver {
        pub fn start(events: &'static EventQueue, interval: Duration) -> Result<Self, EspError> {
            let service = EspTaskTimerService::new()?;
            let timer = service.timer(move || push_tick(events))?;
            timer.every(interval)?;
            info!("hw_timer: safety tick every {} ms", interval.as_millis());
            Ok(Self { _timer: timer })
        }
    }
}

#[cfg(not(target_os = "espidf"))]
mod host {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread::{self, JoinHandle};

    /// Tick thread; stops when dropped.
    pub struct TickDriver {
        stop: Arc<AtomicBool>,
        handle: Option<JoinHandle<()>>,
    }

    impl TickDriver {
        pub fn start(events: &'static EventQueue, interval: Duration) -> std::io::Result<Self> {
            let stop = Arc::new(AtomicBool::new(false));
            let flag = Arc::clone(&stop);
            let handle = thread::Builder::new().name("safety-tick".into()).spawn(move || {
                while !flag.load(Ordering::Relaxed) {
                    thread::sleep(interval);
                    push_tick(events);
                }
            })?;
            log::info!("hw_timer(sim): safety tick every {} ms", interval.as_millis());
            Ok(Self {
                stop,
                handle: Some(handle),
            })
        }
    }

    impl Drop for TickDriver {
        fn drop(&mut self) {
            self.stop.store(true, Ordering::Relaxed);
            if let Some(handle) = self.handle.take() {
                let _ = handle.join();
            }
        }
    }

}
