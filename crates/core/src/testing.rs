//! In-memory stand-ins for the registry, the window system and the process
//! table. Every side-effecting call is recorded so tests can assert order.

use crate::desktop::{
    Desktop, DesktopError, Placement, Rect, ShowCommand, ShowState, WindowHandle, ZPosition,
    EXPLORER_WINDOW_CLASS, TASKBAR_WINDOW_CLASS,
};
use crate::process::{ProcessError, ProcessTable};
use crate::taskbar_settings::{SettingsStore, StoreError, MODE_OFFSET, RECORD_LEN};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Pid given to Explorer-owned fake windows
pub(crate) const EXPLORER_PID: u32 = 100;

/// A 64-byte record with distinct bytes everywhere and `mode` at 0x08
pub(crate) fn sample_record(mode: u8) -> Vec<u8> {
    let mut bytes: Vec<u8> = (0..RECORD_LEN).map(|i| (i as u8).wrapping_mul(7) ^ 0x5A).collect();
    bytes[0] = 0x30;
    bytes[MODE_OFFSET] = mode;
    bytes
}

// ---------------------------------------------------------------------------
// Settings store
// ---------------------------------------------------------------------------

pub(crate) struct MemoryStore {
    record: RefCell<Option<Vec<u8>>>,
    fail_writes: Cell<bool>,
    writes: Cell<usize>,
    announcements: Cell<usize>,
}

impl MemoryStore {
    pub(crate) fn with_record(bytes: Vec<u8>) -> Self {
        Self {
            record: RefCell::new(Some(bytes)),
            fail_writes: Cell::new(false),
            writes: Cell::new(0),
            announcements: Cell::new(0),
        }
    }

    /// Neither registry location exists
    pub(crate) fn missing() -> Self {
        Self {
            record: RefCell::new(None),
            fail_writes: Cell::new(false),
            writes: Cell::new(0),
            announcements: Cell::new(0),
        }
    }

    pub(crate) fn failing_writes(self) -> Self {
        self.fail_writes.set(true);
        self
    }

    pub(crate) fn record(&self) -> Option<Vec<u8>> {
        self.record.borrow().clone()
    }

    pub(crate) fn writes(&self) -> usize {
        self.writes.get()
    }

    pub(crate) fn announcements(&self) -> usize {
        self.announcements.get()
    }
}

impl SettingsStore for MemoryStore {
    fn load(&self) -> Result<Vec<u8>, StoreError> {
        self.record.borrow().clone().ok_or(StoreError::Unavailable)
    }

    fn store(&self, bytes: &[u8]) -> Result<(), StoreError> {
        if self.record.borrow().is_none() {
            return Err(StoreError::Unavailable);
        }
        if self.fail_writes.get() {
            return Err(StoreError::Write(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "access denied",
            )));
        }
        self.writes.set(self.writes.get() + 1);
        *self.record.borrow_mut() = Some(bytes.to_vec());
        Ok(())
    }

    fn announce_change(&self) {
        self.announcements.set(self.announcements.get() + 1);
    }
}

// ---------------------------------------------------------------------------
// Desktop
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DesktopCall {
    OpenFolder(PathBuf),
    Move(WindowHandle, Rect),
    Show(WindowHandle, ShowCommand),
    ZOrder(WindowHandle, ZPosition),
    Activate(WindowHandle),
    Close(WindowHandle),
}

#[derive(Debug, Clone)]
pub(crate) struct FakeWindow {
    pub handle: WindowHandle,
    pub class: String,
    pub title: String,
    pub visible: bool,
    pub pid: u32,
    pub location: Option<PathBuf>,
    pub placement: Placement,
    pub focus_within: bool,
}

impl FakeWindow {
    fn new(class: &str, title: &str, pid: u32) -> Self {
        Self {
            handle: WindowHandle(0),
            class: class.to_string(),
            title: title.to_string(),
            visible: true,
            pid,
            location: None,
            placement: Placement::default(),
            focus_within: false,
        }
    }

    /// Explorer folder window showing `path`
    pub(crate) fn explorer(path: &str) -> Self {
        let title = path.rsplit('\\').next().unwrap_or(path);
        Self::new(EXPLORER_WINDOW_CLASS, title, EXPLORER_PID).with_location(path)
    }

    /// Explorer window on a virtual folder with no filesystem path
    pub(crate) fn unresolved_explorer(title: &str) -> Self {
        Self::new(EXPLORER_WINDOW_CLASS, title, EXPLORER_PID)
    }

    pub(crate) fn app(title: &str, pid: u32) -> Self {
        Self::new("AppWindow", title, pid)
    }

    pub(crate) fn taskbar() -> Self {
        Self::new(TASKBAR_WINDOW_CLASS, "", EXPLORER_PID)
    }

    pub(crate) fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub(crate) fn with_location(mut self, path: &str) -> Self {
        self.location = Some(PathBuf::from(path));
        self
    }

    pub(crate) fn with_placement(mut self, show_state: ShowState, rect: Rect) -> Self {
        self.placement = Placement {
            show_state,
            normal_rect: rect,
        };
        self
    }

    pub(crate) fn with_focus_within(mut self) -> Self {
        self.focus_within = true;
        self
    }
}

/// Window list ordered front-to-back (index 0 is the top window)
pub(crate) struct FakeDesktop {
    windows: RefCell<Vec<FakeWindow>>,
    foreground: Cell<Option<WindowHandle>>,
    next_handle: Cell<isize>,
    calls: RefCell<Vec<DesktopCall>>,
    enumerations: Cell<usize>,
    images: RefCell<HashMap<u32, PathBuf>>,
    open_creates_window: Cell<bool>,
    delay_creation: Cell<bool>,
    /// Windows from `open_folder` still counting down enumerations
    pending: RefCell<Vec<(usize, FakeWindow)>>,
}

impl FakeDesktop {
    pub(crate) fn new() -> Self {
        Self {
            windows: RefCell::new(Vec::new()),
            foreground: Cell::new(None),
            next_handle: Cell::new(0x100),
            calls: RefCell::new(Vec::new()),
            enumerations: Cell::new(0),
            images: RefCell::new(HashMap::new()),
            open_creates_window: Cell::new(true),
            delay_creation: Cell::new(false),
            pending: RefCell::new(Vec::new()),
        }
    }

    /// Add a window on top of the stack and return its handle
    pub(crate) fn add(&self, mut window: FakeWindow) -> WindowHandle {
        let handle = WindowHandle(self.next_handle.get());
        self.next_handle.set(handle.0 + 0x10);
        window.handle = handle;
        self.windows.borrow_mut().insert(0, window);
        handle
    }

    pub(crate) fn remove(&self, handle: WindowHandle) {
        self.windows.borrow_mut().retain(|w| w.handle != handle);
    }

    pub(crate) fn set_foreground(&self, handle: WindowHandle) {
        self.foreground.set(Some(handle));
    }

    pub(crate) fn set_image(&self, pid: u32, path: &str) {
        self.images.borrow_mut().insert(pid, PathBuf::from(path));
    }

    /// Make `open_folder` succeed without a window ever appearing
    pub(crate) fn without_window_creation(self) -> Self {
        self.open_creates_window.set(false);
        self
    }

    /// Windows opened by `open_folder` only show up from the second
    /// enumeration after the call
    pub(crate) fn with_delayed_window_creation(self) -> Self {
        self.delay_creation.set(true);
        self
    }

    pub(crate) fn window(&self, handle: WindowHandle) -> Option<FakeWindow> {
        self.windows
            .borrow()
            .iter()
            .find(|w| w.handle == handle)
            .cloned()
    }

    pub(crate) fn front_to_back(&self) -> Vec<WindowHandle> {
        self.windows.borrow().iter().map(|w| w.handle).collect()
    }

    /// Resolved locations of Explorer windows, front-to-back
    pub(crate) fn explorer_locations(&self) -> Vec<PathBuf> {
        self.windows
            .borrow()
            .iter()
            .filter(|w| w.class == EXPLORER_WINDOW_CLASS)
            .filter_map(|w| w.location.clone())
            .collect()
    }

    pub(crate) fn calls(&self) -> Vec<DesktopCall> {
        self.calls.borrow().clone()
    }

    pub(crate) fn opened_folders(&self) -> Vec<PathBuf> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                DesktopCall::OpenFolder(path) => Some(path.clone()),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn enumerations(&self) -> usize {
        self.enumerations.get()
    }

    fn record(&self, call: DesktopCall) {
        self.calls.borrow_mut().push(call);
    }

    fn with_window<T>(
        &self,
        handle: WindowHandle,
        f: impl FnOnce(&mut FakeWindow) -> T,
    ) -> Option<T> {
        self.windows
            .borrow_mut()
            .iter_mut()
            .find(|w| w.handle == handle)
            .map(f)
    }

    fn missing(handle: WindowHandle) -> DesktopError {
        DesktopError::Window {
            window: handle,
            message: "invalid window handle".to_string(),
        }
    }
}

impl Desktop for FakeDesktop {
    fn top_level_windows(&self) -> Vec<WindowHandle> {
        self.enumerations.set(self.enumerations.get() + 1);

        let ready: Vec<FakeWindow> = {
            let mut pending = self.pending.borrow_mut();
            let (ready, waiting): (Vec<_>, Vec<_>) =
                pending.drain(..).partition(|(countdown, _)| *countdown == 0);
            *pending = waiting
                .into_iter()
                .map(|(countdown, window)| (countdown - 1, window))
                .collect();
            ready.into_iter().map(|(_, window)| window).collect()
        };
        for window in ready {
            self.add(window);
        }

        self.front_to_back()
    }

    fn class_name(&self, window: WindowHandle) -> Option<String> {
        self.window(window).map(|w| w.class)
    }

    fn is_visible(&self, window: WindowHandle) -> bool {
        self.window(window).map(|w| w.visible).unwrap_or(false)
    }

    fn is_window(&self, window: WindowHandle) -> bool {
        self.window(window).is_some()
    }

    fn foreground_window(&self) -> Option<WindowHandle> {
        self.foreground.get()
    }

    fn has_focus_within(&self, window: WindowHandle) -> bool {
        self.window(window).map(|w| w.focus_within).unwrap_or(false)
    }

    fn placement(&self, window: WindowHandle) -> Option<Placement> {
        self.window(window).map(|w| w.placement)
    }

    fn title(&self, window: WindowHandle) -> String {
        self.window(window).map(|w| w.title).unwrap_or_default()
    }

    fn process_id(&self, window: WindowHandle) -> Option<u32> {
        self.window(window).map(|w| w.pid).filter(|&pid| pid != 0)
    }

    fn process_image_path(&self, pid: u32) -> Option<PathBuf> {
        self.images.borrow().get(&pid).cloned()
    }

    fn folder_location(&self, window: WindowHandle) -> Result<PathBuf, DesktopError> {
        self.window(window)
            .filter(|w| w.class == EXPLORER_WINDOW_CLASS)
            .and_then(|w| w.location)
            .ok_or(DesktopError::NoFolder(window))
    }

    fn open_folder(&self, path: &Path) -> Result<(), DesktopError> {
        self.record(DesktopCall::OpenFolder(path.to_path_buf()));
        if self.open_creates_window.get() {
            let window = FakeWindow::explorer(&path.to_string_lossy());
            if self.delay_creation.get() {
                self.pending.borrow_mut().push((1, window));
            } else {
                self.add(window);
            }
        }
        Ok(())
    }

    fn move_window(&self, window: WindowHandle, rect: Rect) -> Result<(), DesktopError> {
        self.record(DesktopCall::Move(window, rect));
        self.with_window(window, |w| w.placement.normal_rect = rect)
            .ok_or_else(|| Self::missing(window))
    }

    fn show_window(&self, window: WindowHandle, command: ShowCommand) {
        self.record(DesktopCall::Show(window, command));
        self.with_window(window, |w| {
            w.placement.show_state = match command {
                ShowCommand::Maximize => ShowState::Maximized,
                ShowCommand::Normal | ShowCommand::Restore => ShowState::Normal,
            };
        });
    }

    fn set_z_position(
        &self,
        window: WindowHandle,
        position: ZPosition,
    ) -> Result<(), DesktopError> {
        self.record(DesktopCall::ZOrder(window, position));
        let mut windows = self.windows.borrow_mut();
        let index = windows
            .iter()
            .position(|w| w.handle == window)
            .ok_or_else(|| Self::missing(window))?;
        let moved = windows.remove(index);
        match position {
            ZPosition::Top => windows.insert(0, moved),
            ZPosition::Bottom => windows.push(moved),
        }
        Ok(())
    }

    fn activate(&self, window: WindowHandle) {
        self.record(DesktopCall::Activate(window));
        self.foreground.set(Some(window));
    }

    fn post_close(&self, window: WindowHandle) -> Result<(), DesktopError> {
        self.record(DesktopCall::Close(window));
        // Explorer windows honour the close request
        if self.class_name(window).as_deref() == Some(EXPLORER_WINDOW_CLASS) {
            self.remove(window);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Process table
// ---------------------------------------------------------------------------

pub(crate) struct FakeProcessTable {
    processes: Vec<(u32, String)>,
    own_pid: u32,
    next_pid: u32,
    protected: Vec<u32>,
    terminated: Vec<u32>,
    spawned: Vec<PathBuf>,
    fail_spawn: bool,
}

impl FakeProcessTable {
    pub(crate) fn new(own_pid: u32) -> Self {
        Self {
            processes: vec![(own_pid, "TaskbarToggle.exe".to_string())],
            own_pid,
            next_pid: 1000,
            protected: Vec::new(),
            terminated: Vec::new(),
            spawned: Vec::new(),
            fail_spawn: false,
        }
    }

    pub(crate) fn with_process(mut self, name: &str) -> Self {
        self.add_process(name);
        self
    }

    pub(crate) fn add_process(&mut self, name: &str) -> u32 {
        let pid = self.next_pid;
        self.next_pid += 4;
        self.processes.push((pid, name.to_string()));
        pid
    }

    /// Terminating `pid` will fail with access denied
    pub(crate) fn protect(&mut self, pid: u32) {
        self.protected.push(pid);
    }

    pub(crate) fn failing_spawn(mut self) -> Self {
        self.fail_spawn = true;
        self
    }

    pub(crate) fn count(&self, name: &str) -> usize {
        self.processes
            .iter()
            .filter(|(_, n)| n.eq_ignore_ascii_case(name))
            .count()
    }

    pub(crate) fn terminated(&self) -> &[u32] {
        &self.terminated
    }

    pub(crate) fn spawned(&self) -> &[PathBuf] {
        &self.spawned
    }
}

impl ProcessTable for FakeProcessTable {
    fn pids_by_name(&mut self, name: &str) -> Vec<u32> {
        self.processes
            .iter()
            .filter(|(_, n)| n.eq_ignore_ascii_case(name))
            .map(|(pid, _)| *pid)
            .collect()
    }

    fn terminate(&mut self, pid: u32) -> Result<(), ProcessError> {
        if self.protected.contains(&pid) {
            return Err(ProcessError::Terminate { pid });
        }
        let before = self.processes.len();
        self.processes.retain(|(p, _)| *p != pid);
        if self.processes.len() == before {
            return Err(ProcessError::NotRunning(pid));
        }
        self.terminated.push(pid);
        Ok(())
    }

    fn spawn(&mut self, path: &Path) -> Result<(), ProcessError> {
        if self.fail_spawn {
            return Err(ProcessError::Launch {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
            });
        }
        self.spawned.push(path.to_path_buf());
        let name = path
            .to_string_lossy()
            .rsplit('\\')
            .next()
            .unwrap_or_default()
            .to_string();
        self.add_process(&name);
        Ok(())
    }

    fn current_pid(&self) -> Option<u32> {
        Some(self.own_pid)
    }
}
