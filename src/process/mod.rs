use std::path::Path;
#[cfg(target_os = "windows")]
use std::process::{Command, Stdio};

use log::info;

/// Start a downloaded installer detached from this process.
#[cfg(target_os = "windows")]
pub fn launch_installer(installer: &Path) -> Result<(), String> {
    let is_msi = installer
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("msi"));
    let mut cmd = if is_msi {
        let mut command = Command::new("msiexec");
        command.arg("/i").arg(installer);
        command
    } else {
        Command::new(installer)
    };
    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    info!("installer: launching {}", installer.display());
    cmd.spawn()
        .map(|_| ())
        .map_err(|e| format!("failed to run installer: {e}"))
}

#[cfg(not(target_os = "windows"))]
pub fn launch_installer(installer: &Path) -> Result<(), String> {
    log::warn!(
        "installer: refusing to launch {} on this platform",
        installer.display()
    );
    Err("automatic updates are only supported on Windows".into())
}

/// Reveal a directory in the platform file manager.
pub fn open_directory(dir: &Path) -> Result<(), String> {
    if !dir.is_dir() {
        return Err(format!("{} is not a directory", dir.display()));
    }
    info!("open: revealing {}", dir.display());
    open::that(dir).map_err(|e| format!("failed to open directory: {e}"))
}
