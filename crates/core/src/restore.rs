//! Reopening Explorer windows after the shell restart
//!
//! The new shell hands out fresh window handles, so each reopened window is
//! found again by resolving every candidate's folder and comparing it to the
//! recorded one. Snapshots are replayed back-to-front: each reopened window
//! lands on top of the previous ones, which rebuilds the original stacking
//! with nothing more than "bring to top".

use crate::config::ToggleTimings;
use crate::desktop::{find_explorer_window, Desktop, ShowState, WindowHandle, ZPosition};
use crate::settle;
use crate::snapshot::WindowSnapshot;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// What happened to a batch of snapshots
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Folders reopened, in the order they were launched
    pub relaunched: Vec<PathBuf>,
    /// Windows found again and put back in place, in launch order
    pub restored: Vec<(PathBuf, WindowHandle)>,
    /// Snapshots without a folder; never launched
    pub skipped: usize,
    /// Launched (or attempted) but never matched to a window
    pub abandoned: usize,
    /// New handle of the window that held focus at capture time
    pub focused: Option<WindowHandle>,
}

/// Reopen every restorable snapshot and reapply its geometry
pub fn restore_windows<D: Desktop + ?Sized>(
    desktop: &D,
    snapshots: &[WindowSnapshot],
    timings: &ToggleTimings,
) -> RestoreReport {
    let mut report = RestoreReport::default();

    for snapshot in snapshots.iter().rev() {
        let Some(path) = snapshot.source_path.as_deref() else {
            report.skipped += 1;
            continue;
        };

        report.relaunched.push(path.to_path_buf());
        if let Err(e) = desktop.open_folder(path) {
            warn!("{}", e);
            report.abandoned += 1;
            continue;
        }

        let claimed: Vec<WindowHandle> = report.restored.iter().map(|(_, w)| *w).collect();
        let Some(window) = wait_for_window(desktop, path, &claimed, timings) else {
            warn!("No window appeared for {:?}, giving up on it", path);
            report.abandoned += 1;
            continue;
        };

        apply_snapshot(desktop, window, snapshot, timings);
        if snapshot.had_focus {
            report.focused = Some(window);
        }
        report.restored.push((path.to_path_buf(), window));
    }

    info!(
        "Restored {} of {} Explorer window(s) ({} skipped, {} abandoned)",
        report.restored.len(),
        snapshots.len(),
        report.skipped,
        report.abandoned
    );
    report
}

/// Poll for a window on `path` that this pass has not already put back.
/// Without the exclusion a duplicate folder would keep matching the window
/// restored just before it.
fn wait_for_window<D: Desktop + ?Sized>(
    desktop: &D,
    path: &Path,
    claimed: &[WindowHandle],
    timings: &ToggleTimings,
) -> Option<WindowHandle> {
    settle::poll_until(timings.window_appear_timeout(), timings.poll_interval(), || {
        find_explorer_window(desktop, path, claimed)
    })
}

/// Move a reopened window to its recorded rectangle, show-state and layer
fn apply_snapshot<D: Desktop + ?Sized>(
    desktop: &D,
    window: WindowHandle,
    snapshot: &WindowSnapshot,
    timings: &ToggleTimings,
) {
    let show_state = snapshot.placement.show_state;
    debug!("Restoring {:?} to {:?} {:?}", window, snapshot.bounds, show_state);

    // Size only sticks on a window in the normal state
    desktop.show_window(window, ShowState::Normal.restore_command());
    settle::settle(timings.pre_move_delay());

    if let Err(e) = desktop.move_window(window, snapshot.bounds) {
        warn!("{}", e);
    }

    if show_state != ShowState::Normal {
        desktop.show_window(window, show_state.restore_command());
    }

    let layer = if show_state == ShowState::Minimized {
        ZPosition::Bottom
    } else {
        ZPosition::Top
    };
    if let Err(e) = desktop.set_z_position(window, layer) {
        warn!("{}", e);
    }
}
