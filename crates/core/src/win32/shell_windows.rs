//! Folder resolution through the shell automation registry
//!
//! `IShellWindows` lists every open browser instance. The one whose
//! top-level handle matches is walked down to its current folder:
//! browser -> top-level shell browser -> active view -> folder -> PIDL -> path.

use crate::desktop::{DesktopError, WindowHandle};
use std::ffi::c_void;
use std::path::PathBuf;
use windows::core::{Interface, VARIANT};
use windows::Win32::System::Com::{CoCreateInstance, CoTaskMemFree, IServiceProvider, CLSCTX_ALL};
use windows::Win32::UI::Shell::{
    IFolderView, IPersistFolder2, IShellBrowser, IShellWindows, IWebBrowserApp,
    SHGetPathFromIDListW, ShellWindows, SID_STopLevelBrowser,
};

const MAX_PATH: usize = 260;

fn automation(step: &'static str) -> impl Fn(windows::core::Error) -> DesktopError {
    move |e| DesktopError::Automation {
        step,
        message: e.message().to_string(),
    }
}

/// Resolve the filesystem folder shown by the browser window `window`.
///
/// Requires an initialised COM apartment on the calling thread.
pub fn folder_of(window: WindowHandle) -> Result<PathBuf, DesktopError> {
    unsafe {
        let shell_windows: IShellWindows = CoCreateInstance(&ShellWindows, None, CLSCTX_ALL)
            .map_err(automation("CoCreateInstance(ShellWindows)"))?;
        let count = shell_windows.Count().map_err(automation("IShellWindows::Count"))?;

        for index in 0..count {
            let Ok(dispatch) = shell_windows.Item(&VARIANT::from(index)) else {
                continue;
            };
            let Ok(browser) = dispatch.cast::<IWebBrowserApp>() else {
                continue;
            };
            match browser.HWND() {
                Ok(handle) if handle.0 == window.0 => return browser_folder(&browser, window),
                _ => continue,
            }
        }
    }

    Err(DesktopError::NoFolder(window))
}

unsafe fn browser_folder(
    browser: &IWebBrowserApp,
    window: WindowHandle,
) -> Result<PathBuf, DesktopError> {
    let provider: IServiceProvider = browser
        .cast()
        .map_err(automation("IWebBrowserApp -> IServiceProvider"))?;
    let shell_browser: IShellBrowser = provider
        .QueryService(&SID_STopLevelBrowser)
        .map_err(automation("QueryService(SID_STopLevelBrowser)"))?;
    let view = shell_browser
        .QueryActiveShellView()
        .map_err(automation("IShellBrowser::QueryActiveShellView"))?;
    let folder_view: IFolderView = view
        .cast()
        .map_err(automation("IShellView -> IFolderView"))?;
    let folder: IPersistFolder2 = folder_view
        .GetFolder()
        .map_err(automation("IFolderView::GetFolder"))?;
    let pidl = folder
        .GetCurFolder()
        .map_err(automation("IPersistFolder2::GetCurFolder"))?;

    let mut buffer = [0u16; MAX_PATH];
    let resolved = SHGetPathFromIDListW(pidl, &mut buffer).as_bool();
    CoTaskMemFree(Some(pidl as *const c_void));

    if !resolved {
        // Virtual folders (This PC, Network, ...) have no filesystem path
        return Err(DesktopError::NoFolder(window));
    }

    let len = buffer.iter().position(|&c| c == 0).unwrap_or(buffer.len());
    Ok(PathBuf::from(String::from_utf16_lossy(&buffer[..len])))
}
