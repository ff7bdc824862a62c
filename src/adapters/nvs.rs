//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`PersistencePort`] over `u32` entries in the `cfg` namespace.
//!
//! - Atomic writes: ESP-IDF NVS commits are atomic per `nvs_commit()`, and
//!   `set_u32` only returns `Ok` after the commit.
//! - Key length: NVS keys are limited to 15 bytes; longer logical keys are
//!   truncated.
//! - Reads never fail: a missing key or a read error yields the default.
//!
//! On host the store is an in-memory map (dev/test only).

use log::info;

use crate::app::ports::{PersistencePort, StorageError};
use crate::config::keys::NAMESPACE;

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;
#[cfg(target_os = "espidf")]
use log::{error, warn};

/// Longest key NVS accepts, excluding the terminator.
const NVS_KEY_MAX: usize = 15;

/// NUL-terminated, truncated copy of `s` for the NVS C API.
fn c_key(s: &str) -> [u8; NVS_KEY_MAX + 1] {
    let mut buf = [0u8; NVS_KEY_MAX + 1];
    let bytes = s.as_bytes();
    let len = bytes.len().min(NVS_KEY_MAX);
    buf[..len].copy_from_slice(&bytes[..len]);
    buf
}

pub struct NvsStore {
    #[cfg(not(target_os = "espidf"))]
    store: HashMap<String, u32>,
}

impl NvsStore {
    /// Initialise NVS flash (erasing it on first boot or after a version
    /// mismatch).  If flash cannot be brought up the store still works, but
    /// every read returns its default and every write fails.
    pub fn new() -> Self {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: called once from the main task before any NVS access.
            let mut ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: erasing and re-initialising flash partition");
                // SAFETY: as above.
                ret = unsafe { nvs_flash_erase() };
                if ret == ESP_OK {
                    ret = unsafe { nvs_flash_init() };
                }
            }
            if ret == ESP_OK {
                info!("NvsStore: ESP-IDF NVS initialised (namespace '{}')", NAMESPACE);
            } else {
                error!("NvsStore: flash init failed (rc={}), running on defaults", ret);
            }
            Self {}
        }

        #[cfg(not(target_os = "espidf"))]
        {
            info!("NvsStore: simulation backend (namespace '{}')", NAMESPACE);
            Self {
                store: HashMap::new(),
            }
        }
    }

    /// Open the policy namespace, run `f` with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_handle<T>(write: bool, f: impl FnOnce(nvs_handle_t) -> Result<T, esp_err_t>) -> Result<T, esp_err_t> {
        let ns = c_key(NAMESPACE);
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };
        let mut handle: nvs_handle_t = 0;
        // SAFETY: `ns` is NUL-terminated and outlives the call.
        let ret = unsafe { nvs_open(ns.as_ptr().cast(), mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }
        let result = f(handle);
        // SAFETY: `handle` was opened above and is not used afterwards.
        unsafe { nvs_close(handle) };
        result
    }

    #[cfg(not(target_os = "espidf"))]
    fn sim_key(key: &str) -> String {
        String::from_utf8_lossy(&c_key(key)[..key.len().min(NVS_KEY_MAX)]).into_owned()
    }
}

impl Default for NvsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PersistencePort for NvsStore {
    fn get_u32(&self, key: &str, default: u32) -> u32 {
        #[cfg(not(target_os = "espidf"))]
        {
            self.store.get(&Self::sim_key(key)).copied().unwrap_or(default)
        }

        #[cfg(target_os = "espidf")]
        {
            let k = c_key(key);
            let result = Self::with_handle(false, |handle| {
                let mut value = 0u32;
                // SAFETY: `k` is NUL-terminated; `value` is a valid out-pointer.
                let ret = unsafe { nvs_get_u32(handle, k.as_ptr().cast(), &mut value) };
                if ret == ESP_OK { Ok(value) } else { Err(ret) }
            });
            match result {
                Ok(value) => value,
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND => default,
                Err(e) => {
                    warn!("NvsStore: read '{}' failed (rc={}), using default", key, e);
                    default
                }
            }
        }
    }

    fn set_u32(&mut self, key: &str, value: u32) -> Result<(), StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            self.store.insert(Self::sim_key(key), value);
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let k = c_key(key);
            let result = Self::with_handle(true, |handle| {
                // SAFETY: `k` is NUL-terminated.
                let ret = unsafe { nvs_set_u32(handle, k.as_ptr().cast(), value) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                // SAFETY: `handle` is open read-write.
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(())
            });
            result.map_err(|e| {
                warn!("NvsStore: write '{}' failed (rc={})", key, e);
                if e == ESP_ERR_NVS_NOT_ENOUGH_SPACE {
                    StorageError::Full
                } else {
                    StorageError::IoError
                }
            })
        }
    }
}
