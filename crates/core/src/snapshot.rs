//! Explorer window snapshots taken before the shell is killed

use crate::desktop::{is_class, Desktop, Placement, Rect, EXPLORER_WINDOW_CLASS};
use std::path::PathBuf;
use tracing::{debug, info};

/// One open Explorer window as it looked before the restart
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSnapshot {
    /// Folder shown by the window; `None` for virtual folders or when
    /// resolution failed, in which case the window cannot be reopened
    pub source_path: Option<PathBuf>,
    /// Restored-state rectangle
    pub bounds: Rect,
    pub placement: Placement,
    /// Position in front-to-back enumeration, 0 is the top window
    pub z_rank: usize,
    pub had_focus: bool,
}

impl WindowSnapshot {
    pub fn is_restorable(&self) -> bool {
        self.source_path.is_some()
    }
}

/// Capture every visible Explorer window in front-to-back order.
///
/// Ranks count all top-level windows, not only Explorer ones, so they
/// reflect the real stacking position.
pub fn capture_open_windows<D: Desktop + ?Sized>(desktop: &D) -> Vec<WindowSnapshot> {
    let foreground = desktop.foreground_window();
    let mut snapshots = Vec::new();

    for (rank, window) in desktop.top_level_windows().into_iter().enumerate() {
        if !desktop.is_visible(window) || !is_class(desktop, window, EXPLORER_WINDOW_CLASS) {
            continue;
        }

        // A window whose placement can't be read has already gone away
        let Some(placement) = desktop.placement(window) else {
            debug!("Window {:?} vanished during capture", window);
            continue;
        };

        let had_focus = foreground == Some(window) || desktop.has_focus_within(window);

        let source_path = match desktop.folder_location(window) {
            Ok(path) => Some(path),
            Err(e) => {
                debug!("Cannot resolve folder of {:?}: {}", window, e);
                None
            }
        };

        debug!(
            "Captured {:?} rank {} {:?} {:?}",
            window, rank, source_path, placement.show_state
        );

        snapshots.push(WindowSnapshot {
            source_path,
            bounds: placement.normal_rect,
            placement,
            z_rank: rank,
            had_focus,
        });
    }

    info!(
        "Captured {} Explorer window(s), {} restorable",
        snapshots.len(),
        snapshots.iter().filter(|s| s.is_restorable()).count()
    );
    snapshots
}
