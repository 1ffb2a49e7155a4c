//! Application configuration management.
//!
//! This module handles loading and saving the configuration, which holds
//! the store directory, the default TTL and the per-value size limit.
//!
//! Configuration is stored at `~/.config/shelflife/config.json`. The
//! `SHELFLIFE_DIR` and `SHELFLIFE_TTL_MINUTES` environment variables
//! override the file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::{ExpiringStore, DEFAULT_TTL_MINUTES};
use crate::store::FileStore;

/// Application name used for config/data directory paths
const APP_NAME: &str = "shelflife";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Subdirectory of the data directory holding entries
const STORE_DIR: &str = "store";

/// Browsers allow roughly 5 MiB per storage area
const DEFAULT_MAX_VALUE_BYTES: usize = 5 * 1024 * 1024;

pub const DIR_ENV: &str = "SHELFLIFE_DIR";
pub const TTL_ENV: &str = "SHELFLIFE_TTL_MINUTES";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: Option<PathBuf>,
    pub default_ttl_minutes: f64,
    pub max_value_bytes: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            default_ttl_minutes: DEFAULT_TTL_MINUTES,
            max_value_bytes: Some(DEFAULT_MAX_VALUE_BYTES),
        }
    }
}

impl Config {
    /// Load the config file (if any) and apply environment overrides
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = Self::load_from(&path)?;
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Override fields from environment variables, looked up through `var`
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(dir) = var(DIR_ENV).filter(|d| !d.trim().is_empty()) {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(ttl) = var(TTL_ENV) {
            let minutes = ttl
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|m| m.is_finite())
                .with_context(|| format!("{} must be a number of minutes, got {:?}", TTL_ENV, ttl))?;
            self.default_ttl_minutes = minutes;
        }
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn store_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.data_dir {
            return Ok(dir.clone());
        }
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME).join(STORE_DIR))
    }

    /// Open the file store this config points at
    pub fn open_store(&self) -> Result<FileStore> {
        let dir = self.store_dir()?;
        let store = FileStore::open(&dir)
            .with_context(|| format!("Failed to open store at {}", dir.display()))?;
        Ok(match self.max_value_bytes {
            Some(limit) => store.with_max_value_bytes(limit),
            None => store,
        })
    }

    pub fn expiring_store(&self) -> ExpiringStore {
        ExpiringStore::new().with_default_ttl(self.default_ttl_minutes)
    }
}
