//! Where xmlcolor keeps its files
//!
//! `config.yaml`, user themes and rotated logs share one per-user directory;
//! every other module asks here instead of building paths itself.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

const APP_DIR: &str = "xmlcolor";

/// Per-user directory: `$XDG_CONFIG_HOME/xmlcolor`, falling back to
/// `~/.config/xmlcolor`; `%APPDATA%\xmlcolor` on Windows.
///
/// `None` when neither the variable nor a home directory is available.
pub fn config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        env::var("APPDATA")
            .ok()
            .map(|appdata| PathBuf::from(appdata).join(APP_DIR))
    }

    #[cfg(not(target_os = "windows"))]
    {
        env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
            .map(|config| config.join(APP_DIR))
    }
}

/// User theme files, one `<id>.yaml` each
pub fn themes_dir() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("themes"))
}

/// Highlighter settings file
pub fn config_file() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.yaml"))
}

/// Daily log files written by the tracing file layer
pub fn logs_dir() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("logs"))
}

fn ensure_dir(path: &Path) -> Result<(), String> {
    fs::create_dir_all(path)
        .map_err(|e| format!("Failed to create directory {}: {}", path.display(), e))
}

/// Create the log directory if needed and return it
pub fn ensure_logs_dir() -> Result<PathBuf, String> {
    let logs = logs_dir().ok_or_else(|| "No config directory available".to_string())?;
    ensure_dir(&logs)?;
    Ok(logs)
}
