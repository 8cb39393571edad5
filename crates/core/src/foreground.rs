//! Foreground window capture and best-effort reactivation
//!
//! Windows owned by the old shell get new handles after the restart. When the
//! recorded handle no longer exists, a replacement is picked by owner and
//! title: same process id or same executable image, and a title that equals
//! or contains the recorded one. Nothing stronger is attempted.

use crate::desktop::{paths_match, Desktop, Placement, WindowHandle};
use std::path::PathBuf;
use tracing::{debug, info};

/// The window that had the foreground before the restart
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForegroundSnapshot {
    /// `None` when nothing held the foreground at capture time
    pub handle: Option<WindowHandle>,
    pub process_id: u32,
    pub executable_path: Option<PathBuf>,
    pub title: String,
    pub placement: Option<Placement>,
}

impl ForegroundSnapshot {
    pub fn is_empty(&self) -> bool {
        self.handle.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusOutcome {
    /// There was no foreground window to restore
    NothingCaptured,
    /// The original window survived and was brought back
    Reactivated(WindowHandle),
    /// A window with a matching owner and title was activated instead
    Replaced(WindowHandle),
    NotFound,
}

pub fn capture_foreground<D: Desktop + ?Sized>(desktop: &D) -> ForegroundSnapshot {
    let Some(window) = desktop.foreground_window() else {
        debug!("No foreground window to capture");
        return ForegroundSnapshot::default();
    };

    let process_id = desktop.process_id(window).unwrap_or(0);
    let executable_path = (process_id != 0)
        .then(|| desktop.process_image_path(process_id))
        .flatten();

    let snapshot = ForegroundSnapshot {
        handle: Some(window),
        process_id,
        executable_path,
        title: desktop.title(window),
        placement: desktop.placement(window),
    };
    debug!("Captured foreground {:?}", snapshot);
    snapshot
}

pub fn restore_foreground<D: Desktop + ?Sized>(
    desktop: &D,
    snapshot: &ForegroundSnapshot,
) -> FocusOutcome {
    let Some(original) = snapshot.handle else {
        return FocusOutcome::NothingCaptured;
    };

    if desktop.is_window(original) {
        bring_back(desktop, original, snapshot);
        info!("Reactivated original foreground window {:?}", original);
        return FocusOutcome::Reactivated(original);
    }

    if snapshot.title.is_empty() {
        debug!("Foreground window is gone and had no title, not searching");
        return FocusOutcome::NotFound;
    }

    let replacement = desktop.top_level_windows().into_iter().find(|&window| {
        desktop.is_visible(window)
            && same_owner(desktop, window, snapshot)
            && title_matches(&desktop.title(window), &snapshot.title)
    });

    match replacement {
        Some(window) => {
            bring_back(desktop, window, snapshot);
            info!(
                "Activated {:?} in place of vanished foreground window {:?}",
                window, snapshot.title
            );
            FocusOutcome::Replaced(window)
        }
        None => {
            info!("No replacement found for foreground window {:?}", snapshot.title);
            FocusOutcome::NotFound
        }
    }
}

fn bring_back<D: Desktop + ?Sized>(
    desktop: &D,
    window: WindowHandle,
    snapshot: &ForegroundSnapshot,
) {
    if let Some(placement) = snapshot.placement {
        desktop.show_window(window, placement.show_state.restore_command());
    }
    desktop.activate(window);
}

fn same_owner<D: Desktop + ?Sized>(
    desktop: &D,
    window: WindowHandle,
    snapshot: &ForegroundSnapshot,
) -> bool {
    let Some(pid) = desktop.process_id(window) else {
        return false;
    };
    if pid == snapshot.process_id {
        return true;
    }
    match (&snapshot.executable_path, desktop.process_image_path(pid)) {
        (Some(recorded), Some(current)) => paths_match(recorded, &current),
        _ => false,
    }
}

fn title_matches(candidate: &str, recorded: &str) -> bool {
    candidate == recorded || candidate.contains(recorded)
}
