//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements both [`ConfigPort`] and [`StoragePort`]. The config
//! record is a postcard-serialized [`LampConfig`] with a CRC16-CCITT
//! trailer; a record that fails the CRC or deserialization is reported
//! as [`ConfigError::Corrupted`] and the caller falls back to defaults.
//!
//! Writes go through nvs_commit, which ESP-IDF guarantees atomic across
//! power loss. The simulation backend is a plain in-memory map.

use log::info;
#[cfg(target_os = "espidf")]
use log::warn;

use crate::app::ports::{ConfigError, ConfigPort, StorageError, StoragePort};
use crate::config::LampConfig;

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

const NVS_NAMESPACE: &str = "luxnode";

/// Postcard encoding of LampConfig is well under this; the bound guards
/// against a corrupted size field in flash.
const MAX_RECORD_SIZE: usize = 64;

/// CRC16-CCITT (false), the checksum the config record trailer carries.
/// Polynomial 0x1021, init 0xFFFF, no reflection, no final xor.
pub fn crc16_ccitt_false(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in data {
        crc ^= u16::from(byte) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// Device-scoped persistent config store.
pub struct ConfigStore {
    key: crate::adapters::device_id::ConfigKey,
    #[cfg(not(target_os = "espidf"))]
    store: std::cell::RefCell<HashMap<String, Vec<u8>>>,
}

impl ConfigStore {
    /// Create the store and initialise the NVS flash partition. On a
    /// version mismatch or full partition the NVS area is erased and
    /// re-initialised (the config record is rebuilt from defaults).
    pub fn new(key: crate::adapters::device_id::ConfigKey) -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: nvs_flash_init / nvs_flash_erase run from the
            // single main-task context before any concurrent NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: erasing and re-initialising flash partition");
                let ret2 = unsafe { nvs_flash_erase() };
                if ret2 != ESP_OK {
                    return Err(ConfigError::IoError);
                }
                let ret3 = unsafe { nvs_flash_init() };
                if ret3 != ESP_OK {
                    return Err(ConfigError::IoError);
                }
            } else if ret != ESP_OK {
                return Err(ConfigError::IoError);
            }
            info!("ConfigStore: NVS initialised, record key {}", key);
        }

        #[cfg(not(target_os = "espidf"))]
        info!("ConfigStore: simulation backend, record key {}", key);

        Ok(Self {
            key,
            #[cfg(not(target_os = "espidf"))]
            store: std::cell::RefCell::new(HashMap::new()),
        })
    }

    /// Open the NVS namespace, run the closure with the handle, close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let mut ns_buf = [0u8; 16];
        let ns_bytes = NVS_NAMESPACE.as_bytes();
        ns_buf[..ns_bytes.len()].copy_from_slice(ns_bytes);

        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        let ret = unsafe { nvs_open(ns_buf.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }

        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }

    #[cfg(target_os = "espidf")]
    fn key_cstr(key: &str) -> [u8; 16] {
        let mut key_buf = [0u8; 16];
        let kb = key.as_bytes();
        let kl = kb.len().min(15);
        key_buf[..kl].copy_from_slice(&kb[..kl]);
        key_buf
    }
}

impl ConfigPort for ConfigStore {
    fn load(&self) -> Result<LampConfig, ConfigError> {
        let mut buf = [0u8; MAX_RECORD_SIZE];
        let len = self.read(self.key.as_str(), &mut buf).map_err(|e| match e {
            StorageError::NotFound => ConfigError::NotFound,
            _ => ConfigError::IoError,
        })?;
        if len < 3 {
            return Err(ConfigError::Corrupted);
        }

        let (payload, trailer) = buf[..len].split_at(len - 2);
        let stored = u16::from_be_bytes([trailer[0], trailer[1]]);
        if crc16_ccitt_false(payload) != stored {
            return Err(ConfigError::Corrupted);
        }

        let config: LampConfig =
            postcard::from_bytes(payload).map_err(|_| ConfigError::Corrupted)?;
        config.validate().map_err(ConfigError::ValidationFailed)?;
        info!("ConfigStore: loaded record ({} bytes)", len);
        Ok(config)
    }

    fn save(&mut self, config: &LampConfig) -> Result<(), ConfigError> {
        config.validate().map_err(ConfigError::ValidationFailed)?;

        let mut record = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
        let crc = crc16_ccitt_false(&record);
        record.extend_from_slice(&crc.to_be_bytes());

        let key = self.key.clone();
        self.write(key.as_str(), &record).map_err(|e| match e {
            StorageError::Full => ConfigError::StorageFull,
            _ => ConfigError::IoError,
        })
    }
}

impl StoragePort for ConfigStore {
    fn read(&self, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            match self.store.borrow().get(key) {
                Some(data) => {
                    let len = data.len().min(buf.len());
                    buf[..len].copy_from_slice(&data[..len]);
                    Ok(len)
                }
                None => Err(StorageError::NotFound),
            }
        }

        #[cfg(target_os = "espidf")]
        {
            let key_buf = Self::key_cstr(key);
            let result = Self::with_nvs_handle(false, |handle| {
                let mut size = buf.len();
                let ret = unsafe {
                    nvs_get_blob(
                        handle,
                        key_buf.as_ptr() as *const _,
                        buf.as_mut_ptr() as *mut _,
                        &mut size,
                    )
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(size)
            });
            match result {
                Ok(size) => Ok(size),
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND => Err(StorageError::NotFound),
                Err(_) => Err(StorageError::IoError),
            }
        }
    }

    fn write(&mut self, key: &str, data: &[u8]) -> Result<(), StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            self.store
                .borrow_mut()
                .insert(key.to_string(), data.to_vec());
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let key_buf = Self::key_cstr(key);
            let result = Self::with_nvs_handle(true, |handle| {
                let ret = unsafe {
                    nvs_set_blob(
                        handle,
                        key_buf.as_ptr() as *const _,
                        data.as_ptr() as *const _,
                        data.len(),
                    )
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(())
            });
            result.map_err(|e| {
                if e == ESP_ERR_NVS_NOT_ENOUGH_SPACE {
                    StorageError::Full
                } else {
                    StorageError::IoError
                }
            })
        }
    }

    fn delete(&mut self, key: &str) -> Result<(), StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            self.store.borrow_mut().remove(key);
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let key_buf = Self::key_cstr(key);
            let result = Self::with_nvs_handle(true, |handle| {
                let ret = unsafe { nvs_erase_key(handle, key_buf.as_ptr() as *const _) };
                if ret != ESP_OK && ret != ESP_ERR_NVS_NOT_FOUND {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(())
            });
            result.map_err(|_| StorageError::IoError)
        }
    }

    fn exists(&self, key: &str) -> bool {
        #[cfg(not(target_os = "espidf"))]
        {
            self.store.borrow().contains_key(key)
        }

        #[cfg(target_os = "espidf")]
        {
            let key_buf = Self::key_cstr(key);
            let result = Self::with_nvs_handle(false, |handle| {
                let ret = unsafe {
                    nvs_find_key(handle, key_buf.as_ptr() as *const _, core::ptr::null_mut())
                };
                Ok(ret == ESP_OK)
            });
            result.unwrap_or(false)
        }
    }
}
