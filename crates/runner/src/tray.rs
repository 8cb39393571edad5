/// Tray icon for the resident runner
///
/// Left click runs a toggle, right click opens a menu with "Quit". The icon
/// has to be rebuilt after every shell restart because the notification
/// area it was registered with is gone.
use anyhow::{anyhow, Result};
use taskbar_toggle_core::taskbar_settings::VisibilityMode;
use tray_icon::menu::{Menu, MenuId, MenuItem};
use tray_icon::{Icon, TrayIcon, TrayIconBuilder};

const ICON_FILE: &str = "tray16.ico";
const ICON_SIZE: u32 = 16;

/// Load the tray icon from tray16.ico beside the executable
fn load_tray_icon() -> Result<Icon> {
    let paths_to_try = [
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.join(ICON_FILE))),
        Some(std::path::PathBuf::from(ICON_FILE)),
    ];

    for path in paths_to_try.into_iter().flatten() {
        if !path.exists() {
            continue;
        }
        let icon_data =
            std::fs::read(&path).map_err(|e| anyhow!("Failed to read {:?}: {}", path, e))?;
        let img = image::load_from_memory(&icon_data)
            .map_err(|e| anyhow!("Failed to decode icon: {}", e))?;
        let img = img.resize_exact(ICON_SIZE, ICON_SIZE, image::imageops::FilterType::Lanczos3);

        return Icon::from_rgba(img.to_rgba8().into_raw(), ICON_SIZE, ICON_SIZE)
            .map_err(|e| anyhow!("Failed to create icon from image: {:?}", e));
    }

    tracing::debug!("{} not found, using generated icon", ICON_FILE);
    fallback_icon()
}

/// Dark square with a light bar along the bottom edge
fn fallback_icon() -> Result<Icon> {
    let icon_rgba: Vec<u8> = (0..ICON_SIZE * ICON_SIZE)
        .flat_map(|i| {
            if i / ICON_SIZE >= ICON_SIZE - 4 {
                [0xE0, 0xE0, 0xE0, 0xFF]
            } else {
                [0x20, 0x40, 0x70, 0xFF]
            }
        })
        .collect();
    Icon::from_rgba(icon_rgba, ICON_SIZE, ICON_SIZE)
        .map_err(|e| anyhow!("Failed to create fallback icon: {:?}", e))
}

fn tooltip(mode: VisibilityMode) -> String {
    format!("Taskbar Toggle - {} (click to switch)", mode)
}

pub struct TrayManager {
    tray_icon: TrayIcon,
    pub menu_item_quit: MenuId,
}

impl TrayManager {
    pub fn new(mode: VisibilityMode) -> Result<Self> {
        tracing::info!("Creating tray icon");

        let icon = load_tray_icon()?;

        let menu = Menu::new();
        let quit_item = MenuItem::new("Quit", true, None);
        menu.append(&quit_item)
            .map_err(|e| anyhow!("Failed to add quit item: {}", e))?;
        let menu_item_quit = quit_item.id().clone();

        let tray_icon = TrayIconBuilder::new()
            .with_tooltip(tooltip(mode))
            .with_icon(icon)
            .with_menu(Box::new(menu))
            .with_menu_on_left_click(false)
            .build()
            .map_err(|e| anyhow!("Failed to create tray icon: {}", e))?;

        Ok(Self {
            tray_icon,
            menu_item_quit,
        })
    }

    pub fn set_mode(&self, mode: VisibilityMode) {
        if let Err(e) = self.tray_icon.set_tooltip(Some(tooltip(mode))) {
            tracing::warn!("Failed to update tooltip: {}", e);
        }
    }

    /// Register a fresh icon with the new shell. On failure the old icon
    /// is kept.
    pub fn rebuild(&mut self, mode: VisibilityMode) -> Result<()> {
        *self = Self::new(mode)?;
        Ok(())
    }
}
