//! TaskbarToggle - Taskbar auto-hide switch
//!
//! This process:
//! - Parses startup flags (--tray, --once, --noreopenexplorer)
//! - Runs a single toggle and exits, or stays resident with a tray icon
//! - Pumps the Win32 message loop for tray icon events
//! - Rebuilds the tray icon once the restarted shell is up

#![windows_subsystem = "windows"]

#[cfg(windows)]
mod tray;

use anyhow::Result;
use taskbar_toggle_core::config::{self, AppConfig};
use taskbar_toggle_core::StartupFlags;

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    tracing::info!("TaskbarToggle starting...");

    let app_config = config::load_config();
    match config::save_config_if_missing(&app_config) {
        Ok(true) => tracing::info!("Wrote default config.json"),
        Ok(false) => {}
        Err(e) => tracing::warn!("Could not write default config.json: {}", e),
    }
    let flags = StartupFlags::from_args(std::env::args().skip(1), &app_config);

    tracing::info!(
        "Tray mode: {}, reopen Explorer windows: {}",
        flags.tray_mode,
        flags.reopen_windows
    );

    run(&app_config, &flags)
}

#[cfg(not(windows))]
fn run(_app_config: &AppConfig, _flags: &StartupFlags) -> Result<()> {
    anyhow::bail!("TaskbarToggle only runs on Windows")
}

#[cfg(windows)]
fn run(app_config: &AppConfig, flags: &StartupFlags) -> Result<()> {
    use taskbar_toggle_core::process::SystemProcessTable;
    use taskbar_toggle_core::registry::RegistrySettingsStore;
    use taskbar_toggle_core::toggle::{ToggleState, Toggler};
    use taskbar_toggle_core::win32::{ComApartment, Win32Desktop};

    let _com = ComApartment::init();

    let timings = app_config.timings.clone();
    let toggler = Toggler::new(
        RegistrySettingsStore::new(timings.broadcast_timeout()),
        Win32Desktop::new(),
        SystemProcessTable::new(),
        timings.clone(),
        ToggleState::new(),
    );

    if !flags.tray_mode {
        let mut toggler = toggler;
        let report = toggler.execute_toggle(flags.reopen_windows);
        tracing::info!("Toggle report: {:?}", report);
        return Ok(());
    }

    tray_loop::run(
        toggler.with_reannounce(timings.reannounce_delay()),
        flags.reopen_windows,
    )
}

#[cfg(windows)]
mod tray_loop {
    use crate::tray::TrayManager;
    use anyhow::{Context, Result};
    use crossbeam_channel::TryRecvError;
    use std::time::Duration;
    use taskbar_toggle_core::desktop::Desktop;
    use taskbar_toggle_core::process::ProcessTable;
    use taskbar_toggle_core::taskbar_settings::SettingsStore;
    use taskbar_toggle_core::toggle::Toggler;
    use tray_icon::menu::MenuEvent;
    use tray_icon::{MouseButton, MouseButtonState, TrayIconEvent};
    use windows::Win32::Foundation::HWND;
    use windows::Win32::UI::WindowsAndMessaging::*;

    pub fn run<S, D, P>(mut toggler: Toggler<S, D, P>, reopen_windows: bool) -> Result<()>
    where
        S: SettingsStore,
        D: Desktop,
        P: ProcessTable,
    {
        let mut tray = TrayManager::new(toggler.settings().read_visibility_mode())
            .context("Failed to create tray icon")?;

        let (event_tx, event_rx) = std::sync::mpsc::channel::<TrayIconEvent>();
        let (menu_tx, menu_rx) = std::sync::mpsc::channel::<MenuEvent>();

        TrayIconEvent::set_event_handler(Some(move |event| {
            tracing::debug!("Tray event: {:?}", event);
            let _ = event_tx.send(event);
        }));

        MenuEvent::set_event_handler(Some(move |event| {
            tracing::debug!("Menu event: {:?}", event);
            let _ = menu_tx.send(event);
        }));

        tracing::info!("Event handlers set, entering message loop");

        let mut reannounce = None;

        unsafe {
            let mut msg = MSG::default();
            loop {
                // Pump Windows messages (required for tray icon events)
                while PeekMessageW(&mut msg, HWND::default(), 0, 0, PM_REMOVE).as_bool() {
                    if msg.message == WM_QUIT {
                        tracing::info!("WM_QUIT received, exiting");
                        return Ok(());
                    }
                    let _ = TranslateMessage(&msg);
                    DispatchMessageW(&msg);
                }

                if let Ok(TrayIconEvent::Click {
                    button: MouseButton::Left,
                    button_state: MouseButtonState::Up,
                    ..
                }) = event_rx.try_recv()
                {
                    if toggler.state().is_busy() {
                        tracing::debug!("Toggle already running, ignoring click");
                    } else {
                        tracing::info!("Tray clicked - toggling taskbar");
                        let report = toggler.execute_toggle(reopen_windows);
                        tracing::debug!("Toggle report: {:?}", report);
                        reannounce = report.reannounce;
                        tray.set_mode(toggler.settings().read_visibility_mode());

                        // Clicks that queued up while the toggle ran are dropped
                        while event_rx.try_recv().is_ok() {}
                    }
                }

                if let Some(receiver) = &reannounce {
                    match receiver.try_recv() {
                        Ok(()) => {
                            tracing::info!("Shell restarted, re-registering tray icon");
                            if let Err(e) = tray.rebuild(toggler.settings().read_visibility_mode())
                            {
                                tracing::error!("Failed to rebuild tray icon: {}", e);
                            }
                            reannounce = None;
                        }
                        Err(TryRecvError::Empty) => {}
                        Err(TryRecvError::Disconnected) => reannounce = None,
                    }
                }

                if let Ok(event) = menu_rx.try_recv() {
                    if event.id == tray.menu_item_quit {
                        tracing::info!("Quit menu clicked");
                        return Ok(());
                    }
                }

                // Small sleep to avoid busy-waiting
                std::thread::sleep(Duration::from_millis(10));
            }
        }
    }
}
