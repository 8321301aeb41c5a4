//! NVS config store.
//!
//! Persists [`SystemConfig`] as a postcard blob under `cxcfg/syscfg`.
//! The host build keeps the blob in memory so the load/save path can be
//! exercised in tests.

use log::{info, warn};

use crate::app::ports::ConfigStore;
use crate::config::SystemConfig;
use crate::error::{Error, Result};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

/// Upper bound on a stored blob; anything larger is treated as corrupt.
const MAX_BLOB_SIZE: usize = 256;

pub struct NvsConfigStore {
    #[cfg(not(target_os = "espidf"))]
    blob: std::sync::Mutex<Option<Vec<u8>>>,
}

impl NvsConfigStore {
    /// Initialise NVS flash, erasing the partition on a layout mismatch.
    pub fn new() -> Result<Self> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: called once from the main task before any other NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES as esp_err_t
                || ret == ESP_ERR_NVS_NEW_VERSION_FOUND as esp_err_t
            {
                warn!("NVS: erasing and re-initialising flash partition");
                esp_check(unsafe { nvs_flash_erase() })?;
                esp_check(unsafe { nvs_flash_init() })?;
            } else {
                esp_check(ret)?;
            }
            info!("NvsConfigStore: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsConfigStore: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            blob: std::sync::Mutex::new(None),
        })
    }
}

/// Decode a stored blob and re-check it; a blob that no longer validates is corrupt.
pub fn decode_config(bytes: &[u8]) -> Result<SystemConfig> {
    if bytes.is_empty() || bytes.len() > MAX_BLOB_SIZE {
        return Err(Error::ConfigCorrupted);
    }
    let config: SystemConfig = postcard::from_bytes(bytes).map_err(|_| Error::ConfigCorrupted)?;
    config.validate().map_err(|_| Error::ConfigCorrupted)?;
    Ok(config)
}

pub fn encode_config(config: &SystemConfig) -> Result<Vec<u8>> {
    config.validate()?;
    postcard::to_allocvec(config).map_err(|_| Error::Config("config does not serialise"))
}

impl ConfigStore for NvsConfigStore {
    fn load(&self) -> Result<SystemConfig> {
        match self.read_blob()? {
            Some(bytes) => {
                let config = decode_config(&bytes)?;
                info!("NvsConfigStore: loaded config ({} bytes)", bytes.len());
                Ok(config)
            }
            None => {
                info!("NvsConfigStore: no stored config, using defaults");
                Ok(SystemConfig::default())
            }
        }
    }

    fn save(&self, config: &SystemConfig) -> Result<()> {
        let bytes = encode_config(config)?;
        self.write_blob(&bytes)
            .inspect_err(|e| warn!("NvsConfigStore: write failed: {}", e))?;
        info!("NvsConfigStore: config saved ({} bytes)", bytes.len());
        Ok(())
    }
}

// ── Backends ──────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
impl NvsConfigStore {
    fn read_blob(&self) -> Result<Option<Vec<u8>>> {
        Ok(self
            .blob
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone())
    }

    fn write_blob(&self, bytes: &[u8]) -> Result<()> {
        *self.blob.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = Some(bytes.to_vec());
        Ok(())
    }
}

#[cfg(target_os = "espidf")]
const NAMESPACE: &core::ffi::CStr = c"cxcfg";
#[cfg(target_os = "espidf")]
const KEY: &core::ffi::CStr = c"syscfg";

#[cfg(target_os = "espidf")]
fn esp_check(ret: esp_err_t) -> Result<()> {
    if ret == ESP_OK as esp_err_t {
        Ok(())
    } else {
        Err(Error::Storage(ret))
    }
}

/// Open the config namespace, run `f` with the handle, then close it.
#[cfg(target_os = "espidf")]
fn with_handle<T>(write: bool, f: impl FnOnce(nvs_handle_t) -> Result<T>) -> Result<T> {
    let mode = if write {
        nvs_open_mode_t_NVS_READWRITE
    } else {
        nvs_open_mode_t_NVS_READONLY
    };
    let mut handle: nvs_handle_t = 0;
    esp_check(unsafe { nvs_open(NAMESPACE.as_ptr(), mode, &mut handle) })?;
    let result = f(handle);
    unsafe { nvs_close(handle) };
    result
}

#[cfg(target_os = "espidf")]
impl NvsConfigStore {
    fn read_blob(&self) -> Result<Option<Vec<u8>>> {
        let result = with_handle(false, |handle| {
            let mut size: usize = 0;
            let ret = unsafe { nvs_get_blob(handle, KEY.as_ptr(), core::ptr::null_mut(), &mut size) };
            if ret == ESP_ERR_NVS_NOT_FOUND as esp_err_t {
                return Ok(None);
            }
            esp_check(ret)?;
            if size == 0 || size > MAX_BLOB_SIZE {
                return Err(Error::ConfigCorrupted);
            }
            let mut buf = vec![0u8; size];
            esp_check(unsafe { nvs_get_blob(handle, KEY.as_ptr(), buf.as_mut_ptr().cast(), &mut size) })?;
            buf.truncate(size);
            Ok(Some(buf))
        });
        match result {
            // A fresh partition has no namespace yet.
            Err(Error::Storage(rc)) if rc == ESP_ERR_NVS_NOT_FOUND as esp_err_t => Ok(None),
            other => other,
        }
    }

    fn write_blob(&self, bytes: &[u8]) -> Result<()> {
        with_handle(true, |handle| {
            esp_check(unsafe { nvs_set_blob(handle, KEY.as_ptr(), bytes.as_ptr().cast(), bytes.len()) })?;
            esp_check(unsafe { nvs_commit(handle) })
        })
    }
}
