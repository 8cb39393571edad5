/// Configuration module for Taskbar Toggle.
///
/// This module provides functionality for managing application configuration,
/// including:
/// - Whether open Explorer windows are reopened after the shell restart
/// - Whether the runner stays resident in the notification area
/// - The settle delays and poll timeouts used around the restart
/// - Persisting configuration to disk as JSON
///
/// The configuration is loaded from a `config.json` file located in the
/// platform-specific application data directory
/// (%APPDATA%/TaskbarToggle/ on Windows). Missing keys take their defaults.
use anyhow::{anyhow, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE: &str = "config.json";

/// Application configuration
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Snapshot open Explorer windows and reopen them after the restart
    pub reopen_windows: bool,
    /// Stay resident with a tray icon instead of toggling once and exiting
    pub tray_mode: bool,
    pub timings: ToggleTimings,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            reopen_windows: true,
            tray_mode: true,
            timings: ToggleTimings::default(),
        }
    }
}

/// Delays and timeouts around the shell restart, in milliseconds
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct ToggleTimings {
    /// Wait after asking Explorer windows to close
    pub graceful_close_ms: u64,
    /// Upper bound on waiting for the taskbar window to reappear
    pub shell_ready_timeout_ms: u64,
    /// Fixed settle after the taskbar reappeared (or the wait timed out)
    pub shell_settle_ms: u64,
    /// Upper bound on waiting for each reopened folder window
    pub window_appear_timeout_ms: u64,
    pub poll_interval_ms: u64,
    /// Pause between showing a reopened window and moving it
    pub pre_move_delay_ms: u64,
    /// Pause between window restoration and focus restoration
    pub focus_settle_ms: u64,
    /// Delivery bound for the settings-changed broadcast
    pub broadcast_timeout_ms: u64,
    /// Delay before the tray icon is re-registered after a restart
    pub reannounce_delay_ms: u64,
}

impl Default for ToggleTimings {
    fn default() -> Self {
        ToggleTimings {
            graceful_close_ms: 150,
            shell_ready_timeout_ms: 5000,
            shell_settle_ms: 750,
            window_appear_timeout_ms: 3000,
            poll_interval_ms: 50,
            pre_move_delay_ms: 200,
            focus_settle_ms: 500,
            broadcast_timeout_ms: 1000,
            reannounce_delay_ms: 2000,
        }
    }
}

impl ToggleTimings {
    /// No waiting at all
    pub fn immediate() -> Self {
        ToggleTimings {
            graceful_close_ms: 0,
            shell_ready_timeout_ms: 0,
            shell_settle_ms: 0,
            window_appear_timeout_ms: 0,
            poll_interval_ms: 0,
            pre_move_delay_ms: 0,
            focus_settle_ms: 0,
            broadcast_timeout_ms: 0,
            reannounce_delay_ms: 0,
        }
    }

    pub fn graceful_close(&self) -> Duration {
        Duration::from_millis(self.graceful_close_ms)
    }

    pub fn shell_ready_timeout(&self) -> Duration {
        Duration::from_millis(self.shell_ready_timeout_ms)
    }

    pub fn shell_settle(&self) -> Duration {
        Duration::from_millis(self.shell_settle_ms)
    }

    pub fn window_appear_timeout(&self) -> Duration {
        Duration::from_millis(self.window_appear_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn pre_move_delay(&self) -> Duration {
        Duration::from_millis(self.pre_move_delay_ms)
    }

    pub fn focus_settle(&self) -> Duration {
        Duration::from_millis(self.focus_settle_ms)
    }

    pub fn broadcast_timeout(&self) -> Duration {
        Duration::from_millis(self.broadcast_timeout_ms)
    }

    pub fn reannounce_delay(&self) -> Duration {
        Duration::from_millis(self.reannounce_delay_ms)
    }
}

/// Get the application's data directory
/// Returns %APPDATA%/TaskbarToggle/ on Windows
/// Creates directory if it doesn't exist
pub fn get_data_directory() -> Result<PathBuf> {
    let project_dirs = ProjectDirs::from("", "", "TaskbarToggle")
        .ok_or_else(|| anyhow!("Failed to determine user data directory"))?;

    let data_dir = project_dirs.data_dir();

    fs::create_dir_all(data_dir)
        .map_err(|e| anyhow!("Failed to create data directory: {}", e))?;

    Ok(data_dir.to_path_buf())
}

/// Parse configuration JSON, falling back to defaults on error
pub fn parse_config(contents: &str) -> AppConfig {
    match serde_json::from_str(contents) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Ignoring invalid config.json: {}", e);
            AppConfig::default()
        }
    }
}

/// Location of config.json inside the data directory
pub fn config_path() -> Result<PathBuf> {
    Ok(get_data_directory()?.join(CONFIG_FILE))
}

/// Load application configuration from config.json
/// Returns default config if file doesn't exist or on error
pub fn load_config() -> AppConfig {
    let Ok(config_path) = config_path() else {
        return AppConfig::default();
    };

    if !config_path.exists() {
        return AppConfig::default();
    }

    let Ok(contents) = fs::read_to_string(&config_path) else {
        return AppConfig::default();
    };

    parse_config(&contents)
}

/// Write `config` as pretty JSON to `path`
pub fn write_config(path: &Path, config: &AppConfig) -> Result<()> {
    let json = serde_json::to_string_pretty(config)
        .map_err(|e| anyhow!("Failed to serialize config: {}", e))?;

    fs::write(path, json).map_err(|e| anyhow!("Failed to write {:?}: {}", path, e))?;

    Ok(())
}

/// Save application configuration to config.json
pub fn save_config(config: &AppConfig) -> Result<()> {
    write_config(&config_path()?, config)
}

/// Save `config` unless config.json already exists, so users get a file
/// listing every setting to edit. Returns true if a file was written.
pub fn save_config_if_missing(config: &AppConfig) -> Result<bool> {
    if config_path()?.exists() {
        return Ok(false);
    }
    save_config(config)?;
    Ok(true)
}
