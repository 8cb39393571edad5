//! Build script for TaskbarToggle
//! Embeds Windows resource metadata and the tray icon

fn main() {
    #[cfg(windows)]
    {
        let mut res = winresource::WindowsResource::new();
        res.set("FileDescription", "Taskbar auto-hide toggle");
        res.set("ProductName", "Taskbar Toggle");
        res.set("InternalName", "TaskbarToggle");
        res.set("OriginalFilename", "TaskbarToggle.exe");
        res.set("LegalCopyright", "Copyright © 2026");

        if std::path::Path::new("tray16.ico").exists() {
            res.set_icon("tray16.ico");
        }

        if let Err(e) = res.compile() {
            println!("cargo:warning=Failed to compile Windows resources: {}", e);
        }
    }
}
