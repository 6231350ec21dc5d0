//! Where Switchboard keeps its files
//!
//! Everything lives in one directory, `~/.config/switchboard/` by default:
//!
//! - `mail-settings.json`: page size, scroll threshold and retry settings
//! - `gmail-token.json`: the Gmail access token when it is not in the
//!   environment
//!
//! `SWITCHBOARD_CONFIG_DIR` points the whole directory somewhere else, which
//! is how tests and side-by-side accounts keep their files apart.

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "switchboard";

/// Overrides the config directory when set and non-empty
pub const CONFIG_DIR_ENV: &str = "SWITCHBOARD_CONFIG_DIR";

/// Create the config directory and return it. Run once at startup.
pub fn init() -> Result<PathBuf> {
    let dir = config_dir().context("No config directory: set SWITCHBOARD_CONFIG_DIR")?;
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
    Ok(dir)
}

pub fn config_dir() -> Option<PathBuf> {
    resolve_config_dir(std::env::var_os(CONFIG_DIR_ENV), dirs::config_dir())
}

fn resolve_config_dir(override_dir: Option<OsString>, platform: Option<PathBuf>) -> Option<PathBuf> {
    match override_dir.filter(|dir| !dir.is_empty()) {
        Some(dir) => Some(PathBuf::from(dir)),
        None => platform.map(|root| root.join(APP_DIR)),
    }
}

pub fn config_path(filename: &str) -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(filename))
}

pub fn config_exists(filename: &str) -> bool {
    config_path(filename).is_some_and(|path| path.is_file())
}

/// Read `filename` from the config directory
pub fn load_json<T: DeserializeOwned>(filename: &str) -> Result<T> {
    let path = config_path(filename).context("Could not determine config directory")?;
    load_json_file(&path)
}

pub fn load_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Write `filename` into the config directory, creating it if needed
pub fn save_json<T: Serialize>(filename: &str, value: &T) -> Result<()> {
    let dir = init()?;
    save_json_file(&dir.join(filename), value)
}

/// Write pretty JSON to `path`
///
/// The content goes to a sibling `.tmp` file first and is renamed into
/// place, so a crash never leaves a half-written token or settings file.
pub fn save_json_file<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let mut staging = path.as_os_str().to_owned();
    staging.push(".tmp");
    let staging = PathBuf::from(staging);
    std::fs::write(&staging, content)
        .with_context(|| format!("Failed to write config file: {}", staging.display()))?;
    std::fs::rename(&staging, path)
        .with_context(|| format!("Failed to replace config file: {}", path.display()))?;
    Ok(())
}
