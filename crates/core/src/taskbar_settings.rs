//! Taskbar visibility setting
//!
//! The taskbar keeps its layout in a small binary record (the `Settings`
//! value under `StuckRects3`, or `StuckRects2` on older systems). Byte 0x08
//! of that record selects between "always visible" and "auto-hide"; every
//! other byte belongs to the shell and is written back untouched.
//!
//! ```text
//! Offset  Size  Contents
//! 0x00    4     structure version (0x30 on current systems)
//! 0x04    4     flags, including the docked edge
//! 0x08    1     visibility: 0x02 always visible, 0x03 auto-hide
//! 0x09    55    position, size and reserved data
//! ```

use std::io;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Offset of the visibility byte inside the record
pub const MODE_OFFSET: usize = 0x08;

/// Size of the record written by the shell
pub const RECORD_LEN: usize = 64;

pub const ALWAYS_VISIBLE: u8 = 0x02;
pub const AUTO_HIDE: u8 = 0x03;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisibilityMode {
    #[default]
    AlwaysVisible,
    AutoHide,
}

impl VisibilityMode {
    /// Decode the mode byte. Anything other than the auto-hide code reads as
    /// always visible.
    pub fn from_byte(byte: u8) -> Self {
        if byte == AUTO_HIDE {
            VisibilityMode::AutoHide
        } else {
            VisibilityMode::AlwaysVisible
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            VisibilityMode::AlwaysVisible => ALWAYS_VISIBLE,
            VisibilityMode::AutoHide => AUTO_HIDE,
        }
    }
}

impl std::fmt::Display for VisibilityMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VisibilityMode::AlwaysVisible => write!(f, "always visible"),
            VisibilityMode::AutoHide => write!(f, "auto-hide"),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// Neither the primary nor the legacy location exists or can be opened
    #[error("taskbar settings record is not available")]
    Unavailable,

    #[error("failed to read taskbar settings record: {0}")]
    Read(#[source] std::io::Error),

    #[error("failed to write taskbar settings record: {0}")]
    Write(#[source] std::io::Error),

    #[error("taskbar settings record has unexpected length {0}")]
    Malformed(usize),
}

/// Backing storage of the raw settings record
pub trait SettingsStore {
    /// Read the whole record from the primary location, else the legacy one
    fn load(&self) -> Result<Vec<u8>, StoreError>;

    /// Write the whole record back to the location it was read from
    fn store(&self, bytes: &[u8]) -> Result<(), StoreError>;

    /// Tell other listeners the setting changed. Best effort, bounded wait.
    fn announce_change(&self);
}

/// Return the first location, in order, where `read` finds a record.
///
/// `read` yields `Ok(None)` for a location without a record. Errors do not
/// stop the search; if no location has a record the last error is reported,
/// or `Unavailable` when there was none.
pub fn first_available<T>(
    locations: &[&'static str],
    mut read: impl FnMut(&'static str) -> io::Result<Option<T>>,
) -> Result<(T, &'static str), StoreError> {
    let mut last_error: Option<io::Error> = None;

    for &location in locations {
        match read(location) {
            Ok(Some(found)) => return Ok((found, location)),
            Ok(None) => debug!("No taskbar record at {}", location),
            Err(e) => {
                debug!("Cannot read taskbar record at {}: {}", location, e);
                last_error = Some(e);
            }
        }
    }

    Err(last_error.map_or(StoreError::Unavailable, StoreError::Read))
}

/// Validated settings record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskbarRecord {
    bytes: Vec<u8>,
}

impl TaskbarRecord {
    /// Accept records long enough to hold the mode byte and no longer than
    /// the fixed layout.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, StoreError> {
        if bytes.len() <= MODE_OFFSET || bytes.len() > RECORD_LEN {
            return Err(StoreError::Malformed(bytes.len()));
        }
        Ok(Self { bytes })
    }

    pub fn mode_byte(&self) -> u8 {
        self.bytes[MODE_OFFSET]
    }

    pub fn mode(&self) -> VisibilityMode {
        VisibilityMode::from_byte(self.mode_byte())
    }

    /// Flip the mode byte and return the new mode.
    ///
    /// Always-visible becomes auto-hide; every other value, including
    /// unknown codes, becomes always-visible.
    pub fn toggle(&mut self) -> VisibilityMode {
        let next = if self.mode_byte() == ALWAYS_VISIBLE {
            VisibilityMode::AutoHide
        } else {
            VisibilityMode::AlwaysVisible
        };
        self.bytes[MODE_OFFSET] = next.as_byte();
        next
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Reads and flips the taskbar visibility mode
pub struct TaskbarSettings<S> {
    store: S,
}

impl<S: SettingsStore> TaskbarSettings<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn load_record(&self) -> Result<TaskbarRecord, StoreError> {
        TaskbarRecord::from_bytes(self.store.load()?)
    }

    /// Current mode, defaulting to always visible when the record is missing
    /// or unreadable
    pub fn read_visibility_mode(&self) -> VisibilityMode {
        match self.load_record() {
            Ok(record) => record.mode(),
            Err(e) => {
                debug!("Taskbar settings unreadable, assuming always visible: {}", e);
                VisibilityMode::AlwaysVisible
            }
        }
    }

    /// Flip the mode byte and write the record back.
    ///
    /// Returns false if the record cannot be read or written. The change
    /// notification is only sent after a successful write.
    pub fn toggle_visibility_mode(&self) -> bool {
        let mut record = match self.load_record() {
            Ok(record) => record,
            Err(e) => {
                warn!("Cannot toggle taskbar mode: {}", e);
                return false;
            }
        };

        let previous = record.mode_byte();
        let next = record.toggle();

        if let Err(e) = self.store.store(record.as_bytes()) {
            warn!("Cannot toggle taskbar mode: {}", e);
            return false;
        }

        info!(
            "Taskbar mode byte 0x{:02X} -> 0x{:02X} ({})",
            previous,
            next.as_byte(),
            next
        );
        self.store.announce_change();
        true
    }
}
