//! Taskbar Toggle Core Library
//!
//! Flips the taskbar between always-visible and auto-hide, restarts the
//! shell so the change applies, and puts open Explorer windows and the
//! foreground window back afterwards.
//!
//! Architecture:
//! - Runner process owns the tray icon and message loop, and calls
//!   `toggle::Toggler::execute_toggle`
//! - Algorithms talk to the OS through three traits: `SettingsStore`,
//!   `Desktop` and `ProcessTable`
//! - Windows implementations live in `registry` and `win32`

pub mod config;
pub mod desktop;
pub mod foreground;
pub mod process;
pub mod restore;
pub mod settle;
pub mod snapshot;
pub mod taskbar_settings;
pub mod toggle;

#[cfg(windows)]
pub mod registry;
#[cfg(windows)]
pub mod win32;

#[cfg(test)]
mod testing;

use crate::config::AppConfig;

/// Startup flags parsed from command line (used by Runner)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupFlags {
    /// Stay resident in the notification area
    pub tray_mode: bool,
    /// Snapshot and reopen Explorer windows across the restart
    pub reopen_windows: bool,
}

impl StartupFlags {
    /// Apply command-line flags on top of the configured defaults.
    ///
    /// Flags compare case-insensitively; unknown arguments are ignored.
    /// `--once` wins over `--tray` when both are given.
    pub fn from_args<I, A>(args: I, config: &AppConfig) -> Self
    where
        I: IntoIterator<Item = A>,
        A: AsRef<str>,
    {
        let mut flags = StartupFlags {
            tray_mode: config.tray_mode,
            reopen_windows: config.reopen_windows,
        };
        let mut once = false;

        for arg in args {
            match arg.as_ref().to_ascii_lowercase().as_str() {
                "--noreopenexplorer" => flags.reopen_windows = false,
                "--tray" => flags.tray_mode = true,
                "--once" => once = true,
                other => tracing::debug!("Ignoring argument {:?}", other),
            }
        }

        if once {
            flags.tray_mode = false;
        }
        flags
    }
}
