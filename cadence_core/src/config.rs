//! Configuration file support for Cadence.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/cadence/config.toml`.

use crate::{Error, Result, Weekday};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub ledger: LedgerConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,

    #[serde(default)]
    pub day_parts: DayPartsConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Completion ledger behaviour
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct LedgerConfig {
    /// When true, a completion that is not counted because the period already
    /// met its target does not extend the streak either
    #[serde(default)]
    pub streak_follows_target_cap: bool,
}

/// Defaults applied to newly created habits
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct ScheduleConfig {
    #[serde(default)]
    pub default_week_start: Weekday,
}

/// Hours at which each part of the day begins
///
/// Anything before `morning` or from `night` onwards is night.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DayPartsConfig {
    #[serde(default = "default_morning")]
    pub morning: u32,
    #[serde(default = "default_afternoon")]
    pub afternoon: u32,
    #[serde(default = "default_evening")]
    pub evening: u32,
    #[serde(default = "default_night")]
    pub night: u32,
}

impl Default for DayPartsConfig {
    fn default() -> Self {
        Self {
            morning: default_morning(),
            afternoon: default_afternoon(),
            evening: default_evening(),
            night: default_night(),
        }
    }
}

impl DayPartsConfig {
    /// Check that the boundaries are increasing hours of the day
    pub fn validate(&self) -> Result<()> {
        let hours = [self.morning, self.afternoon, self.evening, self.night];
        if hours.iter().any(|h| *h > 24) || hours.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::Config(format!(
                "day_parts must be increasing hours within 0..=24, got {:?}",
                hours
            )));
        }
        Ok(())
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".local/share")
    });
    base.join("cadence")
}

fn default_morning() -> u32 {
    5
}

fn default_afternoon() -> u32 {
    12
}

fn default_evening() -> u32 {
    17
}

fn default_night() -> u32 {
    21
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.day_parts.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config")
        });
        base.join("cadence").join("config.toml")
    }

    /// Path of the habit collection inside the data directory
    pub fn habits_path(&self) -> PathBuf {
        self.data.data_dir.join("habits.json")
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
