//! Configuration management.
//!
//! Configuration is loaded from the XDG config directory
//! (`~/.config/chatsum/config.toml`); every section falls back to defaults
//! so a missing file is not an error.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine config directory")]
    NoConfigDir,

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// History paging behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Messages requested per history page.
    pub page_size: usize,
    /// Minimum delay between history requests, enforced by the backend.
    pub rate_limit_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            page_size: 100,
            rate_limit_ms: 350,
        }
    }
}

/// Export output behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Default output format when --format is not given.
    pub format: String,
    /// Directory exports are written to, relative to the working directory.
    pub dir: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: "text".into(),
            dir: "exports".into(),
        }
    }
}

/// Logging behavior. Logs go to a file while the TUI owns the terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

/// Local archive backend settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Directory holding the archived conversation corpus.
    pub path: Option<PathBuf>,
}

/// Main configuration struct.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fetch: FetchConfig,
    pub export: ExportConfig,
    pub log: LogConfig,
    pub archive: ArchiveConfig,
}

impl Config {
    /// Load configuration from the default config file, creating it with
    /// defaults when it does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_file_path()?)
    }

    /// Load configuration from an explicit path. On the first run the file
    /// does not exist yet; defaults are written there so the user has a
    /// template to edit.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            tracing::info!(path = %path.display(), "no config file found, wrote defaults");
            return Ok(config);
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Save configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let content = toml::to_string_pretty(self).expect("config serializes");
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), "saved configuration");
        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf, ConfigError> {
        let dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(dir.join("chatsum").join("config.toml"))
    }

    /// Directory for runtime data such as the log file.
    pub fn data_dir() -> Result<PathBuf, ConfigError> {
        let dir = dirs::data_dir().ok_or(ConfigError::NoConfigDir)?;
        let path = dir.join("chatsum");
        std::fs::create_dir_all(&path).map_err(|source| ConfigError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}
