//! Shell process lifecycle
//!
//! Closes Explorer windows, force-terminates every `explorer.exe` and starts
//! a single fresh instance. Individual failures are logged and skipped;
//! nothing here blocks beyond the fixed close delay.

use crate::desktop::{is_class, Desktop, EXPLORER_WINDOW_CLASS};
use crate::settle;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use sysinfo::{Pid, System};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Executable name of the shell host process
pub const SHELL_EXECUTABLE: &str = "explorer.exe";

/// Standard installation path of the shell host
pub const SHELL_LAUNCH_PATH: &str = r"C:\Windows\explorer.exe";

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("process {0} is not running")]
    NotRunning(u32),

    #[error("failed to terminate process {pid}")]
    Terminate { pid: u32 },

    #[error("failed to launch {path:?}: {source}")]
    Launch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Running-process view used by the controller
pub trait ProcessTable {
    /// Ids of running processes whose executable name matches, ignoring case
    fn pids_by_name(&mut self, name: &str) -> Vec<u32>;

    fn terminate(&mut self, pid: u32) -> Result<(), ProcessError>;

    /// Start a detached instance of the executable at `path`
    fn spawn(&mut self, path: &Path) -> Result<(), ProcessError>;

    fn current_pid(&self) -> Option<u32>;
}

/// `ProcessTable` backed by sysinfo
pub struct SystemProcessTable {
    system: System,
}

impl SystemProcessTable {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for SystemProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessTable for SystemProcessTable {
    fn pids_by_name(&mut self, name: &str) -> Vec<u32> {
        self.system.refresh_processes();
        self.system
            .processes()
            .values()
            .filter(|process| process.name().eq_ignore_ascii_case(name))
            .map(|process| process.pid().as_u32())
            .collect()
    }

    fn terminate(&mut self, pid: u32) -> Result<(), ProcessError> {
        let process = self
            .system
            .process(Pid::from_u32(pid))
            .ok_or(ProcessError::NotRunning(pid))?;

        if process.kill() {
            Ok(())
        } else {
            Err(ProcessError::Terminate { pid })
        }
    }

    fn spawn(&mut self, path: &Path) -> Result<(), ProcessError> {
        Command::new(path)
            .spawn()
            .map(|_| ())
            .map_err(|source| ProcessError::Launch {
                path: path.to_path_buf(),
                source,
            })
    }

    fn current_pid(&self) -> Option<u32> {
        sysinfo::get_current_pid().ok().map(|pid| pid.as_u32())
    }
}

/// Terminates and relaunches the shell host
pub struct ShellProcessController<P> {
    table: P,
    executable: String,
    launch_path: PathBuf,
}

impl<P: ProcessTable> ShellProcessController<P> {
    pub fn new(table: P) -> Self {
        Self {
            table,
            executable: SHELL_EXECUTABLE.to_string(),
            launch_path: PathBuf::from(SHELL_LAUNCH_PATH),
        }
    }

    pub fn table(&self) -> &P {
        &self.table
    }

    /// Post a close request to every Explorer window, then give cooperating
    /// windows `delay` to exit
    pub fn request_graceful_close<D: Desktop + ?Sized>(&self, desktop: &D, delay: Duration) {
        let mut requested = 0;
        for window in desktop.top_level_windows() {
            if !is_class(desktop, window, EXPLORER_WINDOW_CLASS) {
                continue;
            }
            match desktop.post_close(window) {
                Ok(()) => requested += 1,
                Err(e) => debug!("Close request to {:?} failed: {}", window, e),
            }
        }
        debug!("Requested close of {} Explorer windows", requested);
        settle::settle(delay);
    }

    /// Force-terminate every running instance of the shell host except the
    /// caller. Returns how many were terminated.
    pub fn terminate_all_instances(&mut self) -> usize {
        let own_pid = self.table.current_pid();
        let pids = self.table.pids_by_name(&self.executable);
        let mut terminated = 0;

        for pid in pids {
            if Some(pid) == own_pid {
                continue;
            }
            match self.table.terminate(pid) {
                Ok(()) => {
                    debug!("Terminated {} (pid {})", self.executable, pid);
                    terminated += 1;
                }
                Err(e) => warn!("Skipping {}: {}", self.executable, e),
            }
        }

        info!("Terminated {} {} instance(s)", terminated, self.executable);
        terminated
    }

    /// Start one new shell instance. Failure is tolerated since Windows
    /// usually restarts the shell on its own.
    pub fn relaunch(&mut self) -> bool {
        match self.table.spawn(&self.launch_path) {
            Ok(()) => {
                info!("Relaunched {:?}", self.launch_path);
                true
            }
            Err(e) => {
                warn!("Shell relaunch failed: {}", e);
                false
            }
        }
    }
}
