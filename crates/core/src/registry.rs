//! Registry-backed taskbar settings record
//!
//! The record lives under the current user's Explorer key. Newer systems use
//! `StuckRects3`; `StuckRects2` is only consulted when the newer key holds no
//! record.

use crate::taskbar_settings::{first_available, SettingsStore, StoreError};
use std::io;
use std::time::Duration;
use tracing::{debug, warn};
use windows::core::w;
use windows::Win32::Foundation::{LPARAM, WPARAM};
use windows::Win32::UI::WindowsAndMessaging::{
    SendMessageTimeoutW, HWND_BROADCAST, SMTO_ABORTIFHUNG, WM_SETTINGCHANGE,
};
use winreg::enums::{RegType, HKEY_CURRENT_USER, KEY_READ, KEY_WRITE};
use winreg::{RegKey, RegValue};

pub const PRIMARY_KEY: &str = r"SOFTWARE\Microsoft\Windows\CurrentVersion\Explorer\StuckRects3";
pub const LEGACY_KEY: &str = r"SOFTWARE\Microsoft\Windows\CurrentVersion\Explorer\StuckRects2";
pub const VALUE_NAME: &str = "Settings";

/// `SettingsStore` over `HKEY_CURRENT_USER`
pub struct RegistrySettingsStore {
    broadcast_timeout: Duration,
}

impl RegistrySettingsStore {
    pub fn new(broadcast_timeout: Duration) -> Self {
        Self { broadcast_timeout }
    }

    /// First key, primary before legacy, that holds the record, opened with
    /// `access`
    fn locate(&self, access: u32) -> Result<(RegKey, RegValue, &'static str), StoreError> {
        let hkcu = RegKey::predef(HKEY_CURRENT_USER);
        let ((key, value), path) = first_available(&[PRIMARY_KEY, LEGACY_KEY], |path| {
            let key = match hkcu.open_subkey_with_flags(path, access) {
                Ok(key) => key,
                Err(e) => {
                    debug!("Cannot open {}: {}", path, e);
                    return Ok(None);
                }
            };
            match key.get_raw_value(VALUE_NAME) {
                Ok(value) => Ok(Some((key, value))),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e),
            }
        })?;
        Ok((key, value, path))
    }
}

impl SettingsStore for RegistrySettingsStore {
    fn load(&self) -> Result<Vec<u8>, StoreError> {
        let (_, value, path) = self.locate(KEY_READ)?;
        debug!("Read {} byte record from {}", value.bytes.len(), path);
        Ok(value.bytes)
    }

    fn store(&self, bytes: &[u8]) -> Result<(), StoreError> {
        let (key, _, path) = self.locate(KEY_READ | KEY_WRITE)?;
        let value = RegValue {
            bytes: bytes.to_vec(),
            vtype: RegType::REG_BINARY,
        };
        key.set_raw_value(VALUE_NAME, &value).map_err(StoreError::Write)?;
        debug!("Wrote {} byte record to {}", bytes.len(), path);
        Ok(())
    }

    fn announce_change(&self) {
        let timeout = u32::try_from(self.broadcast_timeout.as_millis()).unwrap_or(u32::MAX);
        let mut result = 0usize;
        let sent = unsafe {
            SendMessageTimeoutW(
                HWND_BROADCAST,
                WM_SETTINGCHANGE,
                WPARAM(0),
                LPARAM(w!("TraySettings").as_ptr() as isize),
                SMTO_ABORTIFHUNG,
                timeout,
                Some(&mut result),
            )
        };
        if sent.0 == 0 {
            warn!(
                "Settings change broadcast did not complete within {:?}",
                self.broadcast_timeout
            );
        }
    }
}
