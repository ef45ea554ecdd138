use std::env;
use std::path::PathBuf;

const APP_DIR_NAME: &str = "priconevh";
const CONFIG_FILE: &str = "config.json";

/// Per-user configuration root (mirrors the platform conventions of `dirs::config_dir`).
pub fn config_root() -> PathBuf {
    match env::consts::OS {
        "windows" => env::var_os("APPDATA").map(PathBuf::from),
        "macos" => home_dir().map(|home| home.join("Library").join("Application Support")),
        _ => env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| home_dir().map(|home| home.join(".config"))),
    }
    .unwrap_or_else(|| PathBuf::from("."))
}

pub fn config_file() -> PathBuf {
    config_root().join(APP_DIR_NAME).join(CONFIG_FILE)
}

pub fn home_dir() -> Option<PathBuf> {
    let var = if cfg!(target_os = "windows") {
        "USERPROFILE"
    } else {
        "HOME"
    };
    env::var_os(var).map(PathBuf::from)
}

/// Scratch directory for translation downloads; removed after each install.
pub fn translation_temp_dir() -> PathBuf {
    env::temp_dir().join("priconevh_temp")
}

pub fn update_temp_dir() -> PathBuf {
    env::temp_dir().join("priconevh_update")
}
