//! Win32 implementation of the desktop seam

mod shell_windows;

use crate::desktop::{
    Desktop, DesktopError, Placement, Rect, ShowCommand, ShowState, WindowHandle, ZPosition,
};
use std::ffi::c_void;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};
use windows::core::PWSTR;
use windows::Win32::Foundation::{CloseHandle, BOOL, FALSE, HWND, LPARAM, TRUE, WPARAM};
use windows::Win32::System::Com::{CoInitializeEx, CoUninitialize, COINIT_APARTMENTTHREADED};
use windows::Win32::System::Threading::{
    AttachThreadInput, GetCurrentThreadId, OpenProcess, QueryFullProcessImageNameW,
    PROCESS_NAME_WIN32, PROCESS_QUERY_LIMITED_INFORMATION,
};
use windows::Win32::UI::WindowsAndMessaging::{
    BringWindowToTop, EnumWindows, GetClassNameW, GetForegroundWindow, GetGUIThreadInfo,
    GetWindowPlacement, GetWindowTextW, GetWindowThreadProcessId, IsChild, IsWindow,
    IsWindowVisible, PostMessageW, SetForegroundWindow, SetWindowPos, ShowWindow,
    GUITHREADINFO, HWND_BOTTOM, HWND_TOP, SWP_NOACTIVATE, SWP_NOMOVE, SWP_NOSIZE, SWP_NOZORDER,
    SW_MAXIMIZE, SW_RESTORE, SW_SHOWNORMAL, WINDOWPLACEMENT, WM_CLOSE,
};

/// Executable used to open folder windows
const FOLDER_OPENER: &str = "explorer.exe";

/// COM apartment for the current thread, released on drop
pub struct ComApartment {
    initialized: bool,
}

impl ComApartment {
    pub fn init() -> Self {
        let result = unsafe { CoInitializeEx(None, COINIT_APARTMENTTHREADED) };
        if result.is_err() {
            // Already initialised with another model; usable, but not ours to release
            warn!("CoInitializeEx failed: {:?}", result);
        }
        Self {
            initialized: result.is_ok(),
        }
    }
}

impl Drop for ComApartment {
    fn drop(&mut self) {
        if self.initialized {
            unsafe { CoUninitialize() };
        }
    }
}

fn hwnd(window: WindowHandle) -> HWND {
    HWND(window.0 as *mut c_void)
}

fn handle(hwnd: HWND) -> Option<WindowHandle> {
    (!hwnd.0.is_null()).then(|| WindowHandle(hwnd.0 as isize))
}

unsafe extern "system" fn collect_window(hwnd: HWND, lparam: LPARAM) -> BOOL {
    let windows = &mut *(lparam.0 as *mut Vec<WindowHandle>);
    windows.push(WindowHandle(hwnd.0 as isize));
    TRUE
}

impl From<WINDOWPLACEMENT> for Placement {
    fn from(wp: WINDOWPLACEMENT) -> Self {
        let rc = wp.rcNormalPosition;
        Placement {
            show_state: ShowState::from_show_cmd(wp.showCmd),
            normal_rect: Rect::new(rc.left, rc.top, rc.right, rc.bottom),
        }
    }
}

/// The interactive desktop of the current session
#[derive(Debug, Default, Clone, Copy)]
pub struct Win32Desktop;

impl Win32Desktop {
    pub fn new() -> Self {
        Self
    }
}

impl Desktop for Win32Desktop {
    fn top_level_windows(&self) -> Vec<WindowHandle> {
        let mut windows: Vec<WindowHandle> = Vec::new();
        unsafe {
            // EnumWindows walks top-level windows in z-order, top first
            let _ = EnumWindows(
                Some(collect_window),
                LPARAM(&mut windows as *mut Vec<WindowHandle> as isize),
            );
        }
        windows
    }

    fn class_name(&self, window: WindowHandle) -> Option<String> {
        let mut buf = [0u16; 256];
        let len = unsafe { GetClassNameW(hwnd(window), &mut buf) };
        (len > 0).then(|| String::from_utf16_lossy(&buf[..len as usize]))
    }

    fn is_visible(&self, window: WindowHandle) -> bool {
        unsafe { IsWindowVisible(hwnd(window)).as_bool() }
    }

    fn is_window(&self, window: WindowHandle) -> bool {
        unsafe { IsWindow(hwnd(window)).as_bool() }
    }

    fn foreground_window(&self) -> Option<WindowHandle> {
        handle(unsafe { GetForegroundWindow() })
    }

    fn has_focus_within(&self, window: WindowHandle) -> bool {
        unsafe {
            let thread = GetWindowThreadProcessId(hwnd(window), None);
            if thread == 0 {
                return false;
            }
            let mut info = GUITHREADINFO {
                cbSize: std::mem::size_of::<GUITHREADINFO>() as u32,
                ..Default::default()
            };
            if GetGUIThreadInfo(thread, &mut info).is_err() || info.hwndFocus.0.is_null() {
                return false;
            }
            IsChild(hwnd(window), info.hwndFocus).as_bool()
        }
    }

    fn placement(&self, window: WindowHandle) -> Option<Placement> {
        let mut wp = WINDOWPLACEMENT {
            length: std::mem::size_of::<WINDOWPLACEMENT>() as u32,
            ..Default::default()
        };
        unsafe { GetWindowPlacement(hwnd(window), &mut wp) }.ok()?;
        Some(wp.into())
    }

    fn title(&self, window: WindowHandle) -> String {
        let mut buf = [0u16; 512];
        let len = unsafe { GetWindowTextW(hwnd(window), &mut buf) };
        if len <= 0 {
            return String::new();
        }
        String::from_utf16_lossy(&buf[..len as usize])
    }

    fn process_id(&self, window: WindowHandle) -> Option<u32> {
        let mut pid: u32 = 0;
        unsafe { GetWindowThreadProcessId(hwnd(window), Some(&mut pid)) };
        (pid != 0).then_some(pid)
    }

    fn process_image_path(&self, pid: u32) -> Option<PathBuf> {
        unsafe {
            let process = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, FALSE, pid).ok()?;
            let mut buf = [0u16; 1024];
            let mut len = buf.len() as u32;
            let queried = QueryFullProcessImageNameW(
                process,
                PROCESS_NAME_WIN32,
                PWSTR(buf.as_mut_ptr()),
                &mut len,
            );
            let _ = CloseHandle(process);
            queried.ok()?;
            Some(PathBuf::from(String::from_utf16_lossy(&buf[..len as usize])))
        }
    }

    fn folder_location(&self, window: WindowHandle) -> Result<PathBuf, DesktopError> {
        shell_windows::folder_of(window)
    }

    fn open_folder(&self, path: &Path) -> Result<(), DesktopError> {
        debug!("Opening folder window for {:?}", path);
        Command::new(FOLDER_OPENER)
            .arg(path)
            .spawn()
            .map(|_| ())
            .map_err(|source| DesktopError::Launch {
                path: path.to_path_buf(),
                source,
            })
    }

    fn move_window(&self, window: WindowHandle, rect: Rect) -> Result<(), DesktopError> {
        unsafe {
            SetWindowPos(
                hwnd(window),
                HWND::default(),
                rect.left,
                rect.top,
                rect.width(),
                rect.height(),
                SWP_NOZORDER | SWP_NOACTIVATE,
            )
        }
        .map_err(|e| DesktopError::Window {
            window,
            message: e.message().to_string(),
        })
    }

    fn show_window(&self, window: WindowHandle, command: ShowCommand) {
        let cmd = match command {
            ShowCommand::Normal => SW_SHOWNORMAL,
            ShowCommand::Maximize => SW_MAXIMIZE,
            ShowCommand::Restore => SW_RESTORE,
        };
        unsafe {
            let _ = ShowWindow(hwnd(window), cmd);
        }
    }

    fn set_z_position(
        &self,
        window: WindowHandle,
        position: ZPosition,
    ) -> Result<(), DesktopError> {
        let after = match position {
            ZPosition::Top => HWND_TOP,
            ZPosition::Bottom => HWND_BOTTOM,
        };
        unsafe {
            SetWindowPos(
                hwnd(window),
                after,
                0,
                0,
                0,
                0,
                SWP_NOMOVE | SWP_NOSIZE | SWP_NOACTIVATE,
            )
        }
        .map_err(|e| DesktopError::Window {
            window,
            message: e.message().to_string(),
        })
    }

    fn activate(&self, window: WindowHandle) {
        unsafe {
            let target = hwnd(window);
            let current_thread = GetCurrentThreadId();
            let foreground_thread = GetWindowThreadProcessId(GetForegroundWindow(), None);

            // Foreground changes are only honoured from the input-owning thread
            let attached = foreground_thread != 0
                && foreground_thread != current_thread
                && AttachThreadInput(current_thread, foreground_thread, TRUE).as_bool();

            let _ = BringWindowToTop(target);
            if !SetForegroundWindow(target).as_bool() {
                debug!("SetForegroundWindow refused for {:?}", window);
            }

            if attached {
                let _ = AttachThreadInput(current_thread, foreground_thread, FALSE);
            }
        }
    }

    fn post_close(&self, window: WindowHandle) -> Result<(), DesktopError> {
        unsafe { PostMessageW(hwnd(window), WM_CLOSE, WPARAM(0), LPARAM(0)) }.map_err(|e| {
            DesktopError::Window {
                window,
                message: e.message().to_string(),
            }
        })
    }
}
