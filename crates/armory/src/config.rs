//! Configuration management for armory.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{Days, NaiveDate};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::custody::{CustodyPolicy, DEFAULT_AMMUNITION_CONDITION, DEFAULT_RETURN_NOTE};
use crate::error::{Error, Result};
use crate::storage::StorageOptions;
use crate::weapon::{SerialFormat, DEFAULT_SERIAL_PATTERN};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "armory";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "armory.db";

/// Prefix for environment overrides.
const ENV_PREFIX: &str = "ARMORY_";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (`ARMORY_<SECTION>__<KEY>`, e.g.
///    `ARMORY_STORAGE__BUSY_TIMEOUT_MS`)
/// 2. TOML config file at `~/.config/armory/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Weapon registry configuration.
    pub registry: RegistryConfig,
    /// Custody event defaults.
    pub custody: CustodyConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/armory/armory.db`
    pub database_path: Option<PathBuf>,
    /// How long a custody event waits for a competing writer, in milliseconds.
    pub busy_timeout_ms: u64,
}

/// Weapon registry configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Regex a trimmed serial number must match.
    pub serial_pattern: String,
}

/// Defaults for issue and return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustodyConfig {
    /// Loan period used when an issue gives no due date.
    pub default_loan_days: u32,
    /// Return note used when a return gives none.
    pub default_return_note: String,
    /// Condition recorded for returned ammunition when none is given.
    pub default_ammunition_condition: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None, // Will be resolved to default at runtime
            busy_timeout_ms: 5_000,
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            serial_pattern: DEFAULT_SERIAL_PATTERN.to_string(),
        }
    }
}

impl Default for CustodyConfig {
    fn default() -> Self {
        Self {
            default_loan_days: 7,
            default_return_note: DEFAULT_RETURN_NOTE.to_string(),
            default_ammunition_condition: DEFAULT_AMMUNITION_CONDITION.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `ARMORY_`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a single TOML file on top of the defaults, ignoring
    /// the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, malformed or invalid.
    pub fn load_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigValidation {
                message: format!("config file not found: {}", path.display()),
            });
        }

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.storage.busy_timeout_ms == 0 {
            return Err(Error::ConfigValidation {
                message: "busy_timeout_ms must be greater than 0".to_string(),
            });
        }

        if self.custody.default_loan_days == 0 {
            return Err(Error::ConfigValidation {
                message: "default_loan_days must be greater than 0".to_string(),
            });
        }

        if self.custody.default_return_note.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "default_return_note cannot be empty".to_string(),
            });
        }

        if self.custody.default_ammunition_condition.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "default_ammunition_condition cannot be empty".to_string(),
            });
        }

        SerialFormat::new(&self.registry.serial_pattern)?;

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the busy timeout as a Duration.
    #[must_use]
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.storage.busy_timeout_ms)
    }

    /// Build the storage options described by this configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the serial pattern does not compile.
    pub fn storage_options(&self) -> Result<StorageOptions> {
        Ok(StorageOptions {
            busy_timeout: self.busy_timeout(),
            serial_format: SerialFormat::new(&self.registry.serial_pattern)?,
        })
    }

    /// Return defaults for the custody coordinator.
    #[must_use]
    pub fn custody_policy(&self) -> CustodyPolicy {
        CustodyPolicy {
            default_return_note: self.custody.default_return_note.clone(),
            default_ammunition_condition: self.custody.default_ammunition_condition.clone(),
        }
    }

    /// Due date for an issue made on `issued_on` that gives no due date.
    #[must_use]
    pub fn default_due_date(&self, issued_on: NaiveDate) -> NaiveDate {
        issued_on
            .checked_add_days(Days::new(u64::from(self.custody.default_loan_days)))
            .unwrap_or(NaiveDate::MAX)
    }
}
