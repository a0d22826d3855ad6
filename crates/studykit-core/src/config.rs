//! Application configuration management.
//!
//! Configuration is stored at `~/.config/studykit/config.json`. A missing
//! file yields the defaults; a partial file fills the gaps with defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::offline::OfflineSettings;

/// Application name used for config/data directory paths
const APP_NAME: &str = "studykit";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Overrides the data directory from the environment (or `.env`).
pub const DATA_DIR_ENV: &str = "STUDYKIT_DATA_DIR";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not find {0} directory")]
    NoDirectory(&'static str),

    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: Option<PathBuf>,
    pub offline: OfflineSettings,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents).map_err(io_err)
    }

    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoDirectory("config"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Where the participant store lives: `$STUDYKIT_DATA_DIR`, then the
    /// configured path, then the platform data directory.
    pub fn data_dir(&self) -> Result<PathBuf, ConfigError> {
        let from_env = std::env::var_os(DATA_DIR_ENV).map(PathBuf::from);
        self.resolve_data_dir(from_env)
    }

    fn resolve_data_dir(&self, from_env: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
        if let Some(dir) = from_env.filter(|d| !d.as_os_str().is_empty()) {
            return Ok(dir);
        }
        if let Some(ref dir) = self.data_dir {
            return Ok(dir.clone());
        }
        let data_dir = dirs::data_dir().ok_or(ConfigError::NoDirectory("data"))?;
        Ok(data_dir.join(APP_NAME))
    }

    /// Offline cache buckets, kept beside the store.
    pub fn cache_dir(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.data_dir()?.join("cache"))
    }
}
