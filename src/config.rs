//! Configuration for ansiscreen.
//!
//! Settings are read from `~/.ansiscreen/config.toml`:
//!
//! ```toml
//! [query]
//! # Give up on a reply after this many milliseconds (0 = wait for end of input)
//! timeout_ms = 500
//! # Give up once a reply grows past this many bytes (0 = no limit)
//! max_reply_bytes = 64
//!
//! [cursor]
//! # Use CSI s / CSI u instead of ESC 7 / ESC 8 for cursor save/restore.
//! # Omit to use the host default: false on macOS, true elsewhere.
//! ansi_save_restore = true
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::QueryOptions;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to access config file: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Could not determine config path")]
    NoConfigPath,
}

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Reply read bounds
    pub query: QueryConfig,
    /// Cursor save/restore settings
    pub cursor: CursorConfig,
}

/// Query configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub timeout_ms: u64,
    pub max_reply_bytes: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        let options = QueryOptions::default();
        Self {
            timeout_ms: options.timeout.map_or(0, |t| t.as_millis() as u64),
            max_reply_bytes: options.max_reply_bytes.unwrap_or(0),
        }
    }
}

impl QueryConfig {
    pub fn options(&self) -> QueryOptions {
        QueryOptions {
            timeout: (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms)),
            max_reply_bytes: (self.max_reply_bytes > 0).then_some(self.max_reply_bytes),
        }
    }
}

/// Cursor configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CursorConfig {
    pub ansi_save_restore: Option<bool>,
}

impl CursorConfig {
    /// Configured save/restore form, or the host default.
    ///
    /// macOS Terminal does not restore reliably from `CSI s`/`CSI u`, so the
    /// DEC form is the default there.
    pub fn resolve_ansi_mode(&self) -> bool {
        self.ansi_save_restore.unwrap_or(!cfg!(target_os = "macos"))
    }
}

impl Config {
    /// Load configuration from file, falling back to defaults
    pub fn load() -> Self {
        let Some(path) = Self::get_config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::get_config_path().ok_or(ConfigError::NoConfigPath)?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// `~/.ansiscreen`, also where the binary writes its log
    pub fn config_dir() -> Option<PathBuf> {
        home_dir().map(|home| home.join(".ansiscreen"))
    }

    /// Get config file path
    pub fn get_config_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("config.toml"))
    }
}

/// Get home directory
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}
