//! Wall-clock adapter.
//!
//! Implements [`ClockSource`] for schedule evaluation.
//!
//! - **`target_os = "espidf"`**: applies the POSIX TZ string, starts SNTP,
//!   and reads local time through `gettimeofday()` / `localtime_r()`.
//! - **`not(target_os = "espidf")`**: uses `std::time::SystemTime` in UTC
//!   for host-side testing and simulation.
//!
//! The clock counts as synchronised once epoch seconds pass
//! [`SYNCED_EPOCH_THRESHOLD`]; before that the RTC is still counting from
//! its power-on value and minute-of-day readings are meaningless.

use crate::app::ports::ClockSource;
use crate::config::SYNCED_EPOCH_THRESHOLD;

const SECS_PER_DAY: i64 = 86_400;

fn is_synced_epoch(epoch_secs: i64) -> bool {
    epoch_secs >= SYNCED_EPOCH_THRESHOLD
}

/// Minute of the UTC day for `epoch_secs`.
fn utc_minute_of_day(epoch_secs: i64) -> u32 {
    (epoch_secs.rem_euclid(SECS_PER_DAY) / 60) as u32
}

pub struct SystemClock {
    #[cfg(target_os = "espidf")]
    _sntp: Option<esp_idf_svc::sntp::EspSntp<'static>>,
}

#[cfg(target_os = "espidf")]
impl SystemClock {
    /// Apply the TZ string and start SNTP.  An SNTP start failure is logged;
    /// the clock then stays unsynchronised until something else sets it.
    pub fn new() -> Self {
        use crate::config::{SNTP_SERVER, TZ_STRING};
        use esp_idf_svc::sntp::{EspSntp, SntpConf};

        // SAFETY: called once from the main task before other tasks read
        // the environment.
        unsafe {
            std::env::set_var("TZ", TZ_STRING);
            esp_idf_svc::sys::tzset();
        }

        let mut conf = SntpConf::default();
        conf.servers[0] = SNTP_SERVER;
        let sntp = match EspSntp::new(&conf) {
            Ok(sntp) => {
                log::info!("SystemClock: TZ={} SNTP={}", TZ_STRING, SNTP_SERVER);
                Some(sntp)
            }
            Err(e) => {
                log::error!("SystemClock: SNTP start failed: {}", e);
                None
            }
        };
        Self { _sntp: sntp }
    }

    fn epoch_secs() -> i64 {
        let mut tv = esp_idf_svc::sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        // SAFETY: `tv` is a valid out-pointer; a null timezone is allowed.
        if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, core::ptr::null_mut()) } != 0 {
            return 0;
        }
        tv.tv_sec as i64
    }
}

#[cfg(target_os = "espidf")]
impl ClockSource for SystemClock {
    fn minutes_since_local_midnight(&self) -> u32 {
        let secs = Self::epoch_secs() as esp_idf_svc::sys::time_t;
        // SAFETY: `tm` is plain C data; zeroed is a valid initial value.
        let mut tm: esp_idf_svc::sys::tm = unsafe { core::mem::zeroed() };
        // SAFETY: both pointers are valid for the duration of the call.
        if unsafe { esp_idf_svc::sys::localtime_r(&secs, &mut tm) }.is_null() {
            return utc_minute_of_day(secs as i64);
        }
        (tm.tm_hour * 60 + tm.tm_min).max(0) as u32
    }

    fn is_synchronized(&self) -> bool {
        is_synced_epoch(Self::epoch_secs())
    }
}

#[cfg(not(target_os = "espidf"))]
impl SystemClock {
    pub fn new() -> Self {
        log::info!("SystemClock(sim): host UTC clock");
        Self {}
    }

    fn epoch_secs() -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |d| d.as_secs() as i64)
    }
}

#[cfg(not(target_os = "espidf"))]
impl ClockSource for SystemClock {
    fn minutes_since_local_midnight(&self) -> u32 {
        utc_minute_of_day(Self::epoch_secs())
    }

    fn is_synchronized(&self) -> bool {
        is_synced_epoch(Self::epoch_secs())
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}
