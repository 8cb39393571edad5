//! One toggle operation, start to finish
//!
//! Phases run in a fixed order and never loop back. Every failure is absorbed
//! inside its phase, so `execute_toggle` always ends with a running shell and
//! the phase back at `Idle`.

use crate::config::ToggleTimings;
use crate::desktop::{class_exists, Desktop, TASKBAR_WINDOW_CLASS};
use crate::foreground::{capture_foreground, restore_foreground, FocusOutcome, ForegroundSnapshot};
use crate::process::{ProcessTable, ShellProcessController};
use crate::restore::{restore_windows, RestoreReport};
use crate::settle;
use crate::snapshot::{capture_open_windows, WindowSnapshot};
use crate::taskbar_settings::{SettingsStore, TaskbarSettings};
use crossbeam_channel::{bounded, Receiver};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TogglePhase {
    #[default]
    Idle,
    CapturingState,
    MutatingConfig,
    RestartingProcess,
    RestoringWindows,
    RestoringFocus,
}

#[derive(Debug, Default)]
struct SharedState {
    phase: Mutex<TogglePhase>,
    restart_in_flight: AtomicBool,
}

/// Progress of the current toggle, shared with the re-announce thread and
/// the caller's event loop
#[derive(Debug, Clone, Default)]
pub struct ToggleState {
    inner: Arc<SharedState>,
}

impl ToggleState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> TogglePhase {
        *self.inner.phase.lock()
    }

    /// A toggle is running; callers should drop new requests
    pub fn is_busy(&self) -> bool {
        self.phase() != TogglePhase::Idle
    }

    /// The shell was killed and the re-announce thread has not fired yet
    pub fn restart_in_flight(&self) -> bool {
        self.inner.restart_in_flight.load(Ordering::SeqCst)
    }

    fn enter(&self, phase: TogglePhase) {
        debug!("Toggle phase -> {:?}", phase);
        *self.inner.phase.lock() = phase;
    }

    fn set_restart_in_flight(&self, value: bool) {
        self.inner.restart_in_flight.store(value, Ordering::SeqCst);
    }
}

/// Puts the phase back to `Idle` when dropped
struct PhaseGuard<'a> {
    state: &'a ToggleState,
}

impl<'a> PhaseGuard<'a> {
    fn begin(state: &'a ToggleState) -> Self {
        state.enter(TogglePhase::CapturingState);
        Self { state }
    }

    fn advance(&self, phase: TogglePhase) {
        self.state.enter(phase);
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        self.state.enter(TogglePhase::Idle);
    }
}

/// Start the background task that fires once the new shell had time to
/// create its notification area.
///
/// Returns `None` if the thread could not be started; the in-flight flag is
/// cleared right away in that case.
pub fn spawn_reannounce(state: ToggleState, delay: Duration) -> Option<Receiver<()>> {
    let (tx, rx) = bounded(1);
    state.set_restart_in_flight(true);

    let thread_state = state.clone();
    let spawned = thread::Builder::new()
        .name("reannounce".to_string())
        .spawn(move || {
            settle::settle(delay);
            thread_state.set_restart_in_flight(false);
            // The receiver may already be gone; nobody to notify then
            let _ = tx.send(());
        });

    match spawned {
        Ok(_) => Some(rx),
        Err(e) => {
            warn!("Failed to start re-announce thread: {}", e);
            state.set_restart_in_flight(false);
            None
        }
    }
}

/// Outcome of one toggle
#[derive(Debug)]
pub struct ToggleReport {
    pub config_written: bool,
    pub terminated: usize,
    pub relaunched: bool,
    /// The taskbar window came back before the ready timeout
    pub shell_ready: bool,
    pub windows: RestoreReport,
    pub focus: FocusOutcome,
    /// Fires once after the re-announce delay, if re-announcement is on
    pub reannounce: Option<Receiver<()>>,
}

/// Runs toggle operations against a settings store, a desktop and a
/// process table
pub struct Toggler<S, D, P> {
    settings: TaskbarSettings<S>,
    desktop: D,
    shell: ShellProcessController<P>,
    timings: ToggleTimings,
    state: ToggleState,
    reannounce_delay: Option<Duration>,
}

impl<S, D, P> Toggler<S, D, P>
where
    S: SettingsStore,
    D: Desktop,
    P: ProcessTable,
{
    pub fn new(
        settings: S,
        desktop: D,
        processes: P,
        timings: ToggleTimings,
        state: ToggleState,
    ) -> Self {
        Self {
            settings: TaskbarSettings::new(settings),
            desktop,
            shell: ShellProcessController::new(processes),
            timings,
            state,
            reannounce_delay: None,
        }
    }

    /// Spawn the re-announce task on every restart
    pub fn with_reannounce(mut self, delay: Duration) -> Self {
        self.reannounce_delay = Some(delay);
        self
    }

    pub fn settings(&self) -> &TaskbarSettings<S> {
        &self.settings
    }

    pub fn desktop(&self) -> &D {
        &self.desktop
    }

    pub fn processes(&self) -> &P {
        self.shell.table()
    }

    pub fn state(&self) -> &ToggleState {
        &self.state
    }

    /// Flip the taskbar mode and restart the shell, carrying open folder
    /// windows and the foreground window across the restart.
    ///
    /// Never fails; the report says what actually happened.
    pub fn execute_toggle(&mut self, reopen_windows: bool) -> ToggleReport {
        let state = self.state.clone();
        let phase = PhaseGuard::begin(&state);
        info!(
            "Toggling taskbar from {} (reopen windows: {})",
            self.settings.read_visibility_mode(),
            reopen_windows
        );

        let foreground = capture_foreground(&self.desktop);
        let snapshots = if reopen_windows {
            capture_open_windows(&self.desktop)
        } else {
            Vec::new()
        };

        phase.advance(TogglePhase::MutatingConfig);
        let config_written = self.settings.toggle_visibility_mode();

        phase.advance(TogglePhase::RestartingProcess);
        let reannounce = self
            .reannounce_delay
            .and_then(|delay| spawn_reannounce(self.state.clone(), delay));
        let (terminated, relaunched, shell_ready) = self.restart_shell();

        phase.advance(TogglePhase::RestoringWindows);
        let windows = self.restore(&snapshots);

        phase.advance(TogglePhase::RestoringFocus);
        settle::settle(self.timings.focus_settle());
        let focus = self.restore_focus(&foreground);

        info!(
            "Toggle finished, taskbar is now {}",
            self.settings.read_visibility_mode()
        );
        drop(phase);

        ToggleReport {
            config_written,
            terminated,
            relaunched,
            shell_ready,
            windows,
            focus,
            reannounce,
        }
    }

    fn restart_shell(&mut self) -> (usize, bool, bool) {
        self.shell
            .request_graceful_close(&self.desktop, self.timings.graceful_close());
        let terminated = self.shell.terminate_all_instances();
        let relaunched = self.shell.relaunch();

        let desktop = &self.desktop;
        let shell_ready = settle::poll_until(
            self.timings.shell_ready_timeout(),
            self.timings.poll_interval(),
            || class_exists(desktop, TASKBAR_WINDOW_CLASS).then_some(()),
        )
        .is_some();
        if !shell_ready {
            warn!("Taskbar did not reappear within the ready timeout, continuing");
        }
        settle::settle(self.timings.shell_settle());

        (terminated, relaunched, shell_ready)
    }

    fn restore(&self, snapshots: &[WindowSnapshot]) -> RestoreReport {
        if snapshots.is_empty() {
            return RestoreReport::default();
        }
        restore_windows(&self.desktop, snapshots, &self.timings)
    }

    fn restore_focus(&self, foreground: &ForegroundSnapshot) -> FocusOutcome {
        restore_foreground(&self.desktop, foreground)
    }
}
