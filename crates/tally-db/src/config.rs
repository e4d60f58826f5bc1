//! # Engine Configuration
//!
//! Configuration for the settlement engine and its database.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TALLY_DB_PATH=/srv/tally/tally.db                                  │
//! │     TALLY_FREE_ITEM_DECREMENTS_STOCK=true                              │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     $TALLY_CONFIG, or                                                  │
//! │     ~/.config/tally-pos/tally.toml (Linux)                             │
//! │     ~/Library/Application Support/com.tally.pos/tally.toml (macOS)     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     tally.db in the platform data dir, free items not destocked       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The loyalty exchange rate is NOT configured here: it is business data
//! stored in `system_configs` and edited at runtime (see
//! [`crate::repository::config`]).
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "/srv/tally/tally.db"
//! max_connections = 5
//!
//! [policy]
//! free_item_decrements_stock = false
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tally_core::SettlementPolicy;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::pool::DbConfig;

// =============================================================================
// Errors
// =============================================================================

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// Failed to read or write the config file.
    #[error("Config file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse the config file.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Failed to serialize the config file.
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// No explicit path and no platform config directory.
    #[error("No config path available")]
    NoConfigPath,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

/// `[database]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// SQLite file path.
    pub path: PathBuf,

    /// Pool size. SQLite serializes writers, so a handful is plenty.
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: 5,
        }
    }
}

fn default_database_path() -> PathBuf {
    directories::ProjectDirs::from("com", "tally", "pos")
        .map(|dirs| dirs.data_dir().join("tally.db"))
        .unwrap_or_else(|| PathBuf::from("tally.db"))
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TallyConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub policy: SettlementPolicy,
}

impl TallyConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`config_path`, `$TALLY_CONFIG`, or the platform default)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        let path = config_path
            .or_else(|| std::env::var_os("TALLY_CONFIG").map(PathBuf::from))
            .or_else(Self::default_config_path);

        if let Some(path) = path {
            if path.exists() {
                info!(?path, "Loading tally config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load tally config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Parses a TOML document; missing sections fall back to defaults.
    pub fn from_toml_str(contents: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<&Path>) -> ConfigResult<()> {
        let path = config_path
            .map(Path::to_path_buf)
            .or_else(Self::default_config_path)
            .ok_or(ConfigError::NoConfigPath)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&path, toml::to_string_pretty(self)?)?;

        info!(?path, "Tally config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database.path must not be empty".into()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Applies `TALLY_*` overrides read through `lookup`.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("TALLY_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(max) = lookup("TALLY_DB_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring invalid TALLY_DB_MAX_CONNECTIONS"),
            }
        }

        if let Some(flag) = lookup("TALLY_FREE_ITEM_DECREMENTS_STOCK") {
            match parse_bool(&flag) {
                Some(on) => {
                    debug!(on, "Overriding free item stock policy from environment");
                    self.policy.free_item_decrements_stock = on;
                }
                None => warn!(value = %flag, "Ignoring invalid TALLY_FREE_ITEM_DECREMENTS_STOCK"),
            }
        }
    }

    /// Database pool configuration derived from `[database]`.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path).max_connections(self.database.max_connections)
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "tally", "pos")
            .map(|dirs| dirs.config_dir().join("tally.toml"))
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = TallyConfig::default();
        assert_eq!(config.database.max_connections, 5);
        assert!(!config.policy.free_item_decrements_stock);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = TallyConfig::from_toml_str(
            r#"
            [policy]
            free_item_decrements_stock = true
            "#,
        )
        .unwrap();
        assert!(config.policy.free_item_decrements_stock);
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_full_toml() {
        let config = TallyConfig::from_toml_str(
            r#"
            [database]
            path = "/tmp/tally-test.db"
            max_connections = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.database.path, PathBuf::from("/tmp/tally-test.db"));
        assert_eq!(config.db_config().max_connections, 2);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("TALLY_DB_PATH", "/data/pos.db"),
            ("TALLY_DB_MAX_CONNECTIONS", "3"),
            ("TALLY_FREE_ITEM_DECREMENTS_STOCK", "yes"),
        ]
        .into_iter()
        .collect();

        let mut config = TallyConfig::default();
        config.apply_env_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.database.path, PathBuf::from("/data/pos.db"));
        assert_eq!(config.database.max_connections, 3);
        assert!(config.policy.free_item_decrements_stock);
    }

    #[test]
    fn test_invalid_env_values_are_ignored() {
        let mut config = TallyConfig::default();
        config.apply_env_overrides(|k| match k {
            "TALLY_DB_MAX_CONNECTIONS" => Some("many".into()),
            "TALLY_FREE_ITEM_DECREMENTS_STOCK" => Some("maybe".into()),
            _ => None,
        });
        assert_eq!(config.database.max_connections, 5);
        assert!(!config.policy.free_item_decrements_stock);
    }

    #[test]
    fn test_validate_rejects_zero_connections() {
        let mut config = TallyConfig::default();
        config.database.max_connections = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_malformed_toml_is_a_parse_error() {
        assert!(matches!(
            TallyConfig::from_toml_str("[database\npath ="),
            Err(ConfigError::Parse(_))
        ));
    }
}
