//! Application configuration management.
//!
//! This module handles loading and saving the configuration, which holds the
//! data file location, the weekly occurrence day, the regularity threshold
//! table, the default page size and the manager webhook.
//!
//! Configuration is stored at `~/.config/congregate/config.json`. The
//! `CONGREGATE_DATA` and `CONGREGATE_WEBHOOK_URL` environment variables
//! override the file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::attendance::RegularityThresholds;
use crate::calendar::DEFAULT_OCCURRENCE_WEEKDAY;
use crate::report::ReportSettings;

/// Application name used for config/data directory paths
const APP_NAME: &str = "congregate";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Data snapshot file name
const DATA_FILE: &str = "data.json";

/// Rows returned by the first request of a report view
const DEFAULT_TAKE: usize = 20;

const ENV_DATA: &str = "CONGREGATE_DATA";
const ENV_WEBHOOK_URL: &str = "CONGREGATE_WEBHOOK_URL";

fn default_weekday() -> Weekday {
    DEFAULT_OCCURRENCE_WEEKDAY
}

fn default_take() -> usize {
    DEFAULT_TAKE
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub data_file: Option<PathBuf>,
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default)]
    pub webhook_token: Option<String>,
    #[serde(default = "default_weekday")]
    pub occurrence_weekday: Weekday,
    #[serde(default)]
    pub regularity: RegularityThresholds,
    #[serde(default = "default_take")]
    pub default_take: usize,
    /// Directory for rolling log files; stderr only when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_file: None,
            webhook_url: None,
            webhook_token: None,
            occurrence_weekday: DEFAULT_OCCURRENCE_WEEKDAY,
            regularity: RegularityThresholds::default(),
            default_take: DEFAULT_TAKE,
            log_dir: None,
        }
    }
}

impl Config {
    /// Load from the default location, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            config.validate()?;
            Ok(config)
        } else {
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

    pub fn validate(&self) -> Result<()> {
        self.regularity
            .validate()
            .context("Invalid regularity table in config")?;
        if self.default_take == 0 {
            anyhow::bail!("default_take must be at least 1");
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var(ENV_DATA) {
            if !path.is_empty() {
                self.data_file = Some(PathBuf::from(path));
            }
        }
        if let Ok(url) = std::env::var(ENV_WEBHOOK_URL) {
            if !url.is_empty() {
                self.webhook_url = Some(url);
            }
        }
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Data snapshot location: the configured file, or the platform data dir
    pub fn data_path(&self) -> Result<PathBuf> {
        if let Some(ref path) = self.data_file {
            return Ok(path.clone());
        }
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME).join(DATA_FILE))
    }

    pub fn report_settings(&self) -> ReportSettings {
        ReportSettings {
            weekday: self.occurrence_weekday,
            thresholds: self.regularity,
        }
    }
}
