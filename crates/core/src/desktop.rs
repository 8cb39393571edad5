//! Desktop abstraction
//!
//! Everything the restart-survival logic needs from the window system,
//! expressed as a trait so the snapshot/restore algorithms run against the
//! real Win32 desktop (`win32::Win32Desktop`) or an in-memory fake in tests.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Window class of an open File Explorer folder window
pub const EXPLORER_WINDOW_CLASS: &str = "CabinetWClass";

/// Window class of the primary taskbar, present once the shell is up
pub const TASKBAR_WINDOW_CLASS: &str = "Shell_TrayWnd";

/// Raw top-level window handle (the HWND value on Windows)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub isize);

/// Screen rectangle in virtual-screen coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }
}

/// Show-state recorded in a window placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShowState {
    #[default]
    Normal,
    Maximized,
    Minimized,
}

impl ShowState {
    /// Map a Win32 `showCmd` value (SW_SHOWMINIMIZED = 2, SW_SHOWMAXIMIZED = 3)
    pub fn from_show_cmd(cmd: u32) -> Self {
        match cmd {
            2 => ShowState::Minimized,
            3 => ShowState::Maximized,
            _ => ShowState::Normal,
        }
    }

    /// Command used to bring a window back into this state after a restart.
    ///
    /// Minimized windows are restored rather than re-minimized so the user
    /// sees them again.
    pub fn restore_command(self) -> ShowCommand {
        match self {
            ShowState::Maximized => ShowCommand::Maximize,
            ShowState::Minimized => ShowCommand::Restore,
            ShowState::Normal => ShowCommand::Normal,
        }
    }
}

/// Show command applied to a live window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowCommand {
    Normal,
    Maximize,
    Restore,
}

/// Show-state plus restored-state rectangle of a window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Placement {
    pub show_state: ShowState,
    pub normal_rect: Rect,
}

/// Where to put a window in the stacking order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZPosition {
    Top,
    Bottom,
}

#[derive(Debug, Error)]
pub enum DesktopError {
    /// A call in the shell automation chain failed
    #[error("shell automation failed at {step}: {message}")]
    Automation { step: &'static str, message: String },

    /// The window is not an open browser window or shows a virtual folder
    #[error("window {0:?} is not backed by a filesystem folder")]
    NoFolder(WindowHandle),

    #[error("failed to open folder window for {path:?}: {source}")]
    Launch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("window operation failed on {window:?}: {message}")]
    Window {
        window: WindowHandle,
        message: String,
    },
}

/// Window system operations used by the snapshot and restore engines
pub trait Desktop {
    /// All top-level windows in current front-to-back order
    fn top_level_windows(&self) -> Vec<WindowHandle>;

    fn class_name(&self, window: WindowHandle) -> Option<String>;

    fn is_visible(&self, window: WindowHandle) -> bool;

    /// Whether the handle still names an existing window
    fn is_window(&self, window: WindowHandle) -> bool;

    fn foreground_window(&self) -> Option<WindowHandle>;

    /// Whether a descendant of `window` currently holds keyboard focus
    fn has_focus_within(&self, window: WindowHandle) -> bool;

    fn placement(&self, window: WindowHandle) -> Option<Placement>;

    fn title(&self, window: WindowHandle) -> String;

    fn process_id(&self, window: WindowHandle) -> Option<u32>;

    /// Executable image of a running process, if it can be queried
    fn process_image_path(&self, pid: u32) -> Option<PathBuf>;

    /// Filesystem folder shown by a browser window, resolved through the
    /// shell automation registry
    fn folder_location(&self, window: WindowHandle) -> Result<PathBuf, DesktopError>;

    /// Ask the shell to open a new browser window on `path`
    fn open_folder(&self, path: &Path) -> Result<(), DesktopError>;

    fn move_window(&self, window: WindowHandle, rect: Rect) -> Result<(), DesktopError>;

    fn show_window(&self, window: WindowHandle, command: ShowCommand);

    fn set_z_position(&self, window: WindowHandle, position: ZPosition)
        -> Result<(), DesktopError>;

    /// Bring to foreground and give keyboard focus
    fn activate(&self, window: WindowHandle);

    /// Post a normal close request
    fn post_close(&self, window: WindowHandle) -> Result<(), DesktopError>;
}

impl<D: Desktop + ?Sized> Desktop for &D {
    fn top_level_windows(&self) -> Vec<WindowHandle> {
        (**self).top_level_windows()
    }

    fn class_name(&self, window: WindowHandle) -> Option<String> {
        (**self).class_name(window)
    }

    fn is_visible(&self, window: WindowHandle) -> bool {
        (**self).is_visible(window)
    }

    fn is_window(&self, window: WindowHandle) -> bool {
        (**self).is_window(window)
    }

    fn foreground_window(&self) -> Option<WindowHandle> {
        (**self).foreground_window()
    }

    fn has_focus_within(&self, window: WindowHandle) -> bool {
        (**self).has_focus_within(window)
    }

    fn placement(&self, window: WindowHandle) -> Option<Placement> {
        (**self).placement(window)
    }

    fn title(&self, window: WindowHandle) -> String {
        (**self).title(window)
    }

    fn process_id(&self, window: WindowHandle) -> Option<u32> {
        (**self).process_id(window)
    }

    fn process_image_path(&self, pid: u32) -> Option<PathBuf> {
        (**self).process_image_path(pid)
    }

    fn folder_location(&self, window: WindowHandle) -> Result<PathBuf, DesktopError> {
        (**self).folder_location(window)
    }

    fn open_folder(&self, path: &Path) -> Result<(), DesktopError> {
        (**self).open_folder(path)
    }

    fn move_window(&self, window: WindowHandle, rect: Rect) -> Result<(), DesktopError> {
        (**self).move_window(window, rect)
    }

    fn show_window(&self, window: WindowHandle, command: ShowCommand) {
        (**self).show_window(window, command)
    }

    fn set_z_position(
        &self,
        window: WindowHandle,
        position: ZPosition,
    ) -> Result<(), DesktopError> {
        (**self).set_z_position(window, position)
    }

    fn activate(&self, window: WindowHandle) {
        (**self).activate(window)
    }

    fn post_close(&self, window: WindowHandle) -> Result<(), DesktopError> {
        (**self).post_close(window)
    }
}

/// Does `window` belong to `class`
pub fn is_class<D: Desktop + ?Sized>(desktop: &D, window: WindowHandle, class: &str) -> bool {
    desktop.class_name(window).as_deref() == Some(class)
}

/// Whether any top-level window of `class` exists
pub fn class_exists<D: Desktop + ?Sized>(desktop: &D, class: &str) -> bool {
    desktop
        .top_level_windows()
        .into_iter()
        .any(|window| is_class(desktop, window, class))
}

/// Case-insensitive path comparison, as the Windows filesystem compares names
pub fn paths_match(a: &Path, b: &Path) -> bool {
    a.to_string_lossy().to_lowercase() == b.to_string_lossy().to_lowercase()
}

/// First visible Explorer window whose resolved folder matches `path`,
/// ignoring the handles in `skip`.
///
/// When several windows show the same folder the first one in front-to-back
/// order wins.
pub fn find_explorer_window<D: Desktop + ?Sized>(
    desktop: &D,
    path: &Path,
    skip: &[WindowHandle],
) -> Option<WindowHandle> {
    desktop.top_level_windows().into_iter().find(|&window| {
        !skip.contains(&window)
            && desktop.is_visible(window)
            && is_class(desktop, window, EXPLORER_WINDOW_CLASS)
            && desktop
                .folder_location(window)
                .map(|location| paths_match(&location, path))
                .unwrap_or(false)
    })
}
