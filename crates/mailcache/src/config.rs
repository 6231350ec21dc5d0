//! Configuration loading for the mail cache
//!
//! Settings come from `mail-settings.json` in the Switchboard config
//! directory, with defaults for anything missing and environment overrides
//! on top. The Gmail access token is read from (in order of priority):
//! 1. The `GMAIL_ACCESS_TOKEN` environment variable
//! 2. `gmail-token.json` in the config directory

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Settings filename in the Switchboard config directory
const SETTINGS_FILE: &str = "mail-settings.json";

/// Token filename in the Switchboard config directory
const TOKEN_FILE: &str = "gmail-token.json";

/// Tunables for paging and remote calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailSettings {
    /// Messages requested per provider page
    pub page_size: usize,
    /// Fraction of the scrollable height that triggers load-more
    pub scroll_threshold: f64,
    /// Quiet period after the last scroll event
    pub scroll_debounce_ms: u64,
    /// Attempts per message fetch before giving up
    pub max_retries: u32,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            page_size: 50,
            scroll_threshold: 0.8,
            scroll_debounce_ms: 100,
            max_retries: 3,
        }
    }
}

impl MailSettings {
    /// Load settings from the config directory, falling back to defaults
    pub fn load() -> Self {
        let settings = if config::config_exists(SETTINGS_FILE) {
            config::load_json::<MailSettings>(SETTINGS_FILE).unwrap_or_else(|e| {
                warn!("Ignoring unreadable {}: {:#}", SETTINGS_FILE, e);
                Self::default()
            })
        } else {
            Self::default()
        };
        settings.with_env_overrides()
    }

    /// Load settings from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        config::load_json_file(path)
    }

    /// Apply `SWITCHBOARD_PAGE_SIZE` if set and valid
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(value) = std::env::var("SWITCHBOARD_PAGE_SIZE") {
            match value.parse::<usize>() {
                Ok(size) if size > 0 => self.page_size = size,
                _ => warn!("Ignoring invalid SWITCHBOARD_PAGE_SIZE: {}", value),
            }
        }
        self
    }

    pub fn scroll_debounce(&self) -> Duration {
        Duration::from_millis(self.scroll_debounce_ms)
    }

    /// Save settings to the config directory
    pub fn save(&self) -> Result<()> {
        config::save_json(SETTINGS_FILE, self)
    }
}

/// Bearer token for the Gmail API
///
/// Obtaining and refreshing the token happens elsewhere; this only reads it.
#[derive(Clone, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken").finish_non_exhaustive()
    }
}

impl AccessToken {
    /// Load the token from the environment, then the config directory
    pub fn load() -> Result<Self> {
        if let Ok(token) = Self::from_env() {
            return Ok(token);
        }
        let token: AccessToken = config::load_json(TOKEN_FILE)
            .context("No GMAIL_ACCESS_TOKEN set and no token file found")?;
        Ok(token)
    }

    pub fn from_env() -> Result<Self> {
        let access_token = std::env::var("GMAIL_ACCESS_TOKEN")
            .context("GMAIL_ACCESS_TOKEN environment variable not set")?;
        Ok(Self { access_token })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        config::load_json_file(path)
    }

    /// Check if a token is available (env var or file)
    pub fn is_available() -> bool {
        std::env::var("GMAIL_ACCESS_TOKEN").is_ok() || config::config_exists(TOKEN_FILE)
    }
}
