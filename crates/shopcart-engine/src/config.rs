//! # Shopcart Configuration
//!
//! Configuration for the engine, the SQLite adapter and logging.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     SHOPCART_DB_PATH=/var/lib/shopcart/shopcart.db                     │
//! │     SHOPCART_MAX_CART_LINES=50                                         │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/shopcart/shopcart.toml (Linux)                           │
//! │     ~/Library/Application Support/dev.shopcart.shopcart/... (macOS)    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "/var/lib/shopcart/shopcart.db"
//! max_connections = 5
//! busy_timeout_secs = 5
//!
//! [engine]
//! max_cart_lines = 100
//! require_color = true
//!
//! [engine.display_fields]
//! title = true
//! image = true
//! slug = false
//!
//! [logging]
//! filter = "info,shopcart=debug,sqlx=warn"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use shopcart_core::cart::BackfillPolicy;
use shopcart_core::DEFAULT_MAX_CART_LINES;

/// Default tracing directive when neither config nor `RUST_LOG` set one.
pub const DEFAULT_LOG_FILTER: &str = "info";

// =============================================================================
// Config Error
// =============================================================================

/// Errors raised while loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("No config path available")]
    NoConfigPath,
}

/// Convenience type alias for Results with ConfigError.
pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Database Settings
// =============================================================================

/// Settings for the SQLite adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Database file. Defaults to the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Pool size.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a writer waits for the SQLite lock before failing.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    5
}

fn default_busy_timeout() -> u64 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: default_max_connections(),
            busy_timeout_secs: default_busy_timeout(),
        }
    }
}

impl DatabaseSettings {
    /// Returns the configured path, or `<data dir>/shopcart.db`.
    pub fn resolved_path(&self) -> Option<PathBuf> {
        self.path.clone().or_else(|| {
            project_dirs().map(|dirs| dirs.data_dir().join("shopcart.db"))
        })
    }
}

// =============================================================================
// Engine Settings
// =============================================================================

/// Behavior switches for `CartEngine`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// A cart may not grow past this many distinct lines.
    #[serde(default = "default_max_cart_lines")]
    pub max_cart_lines: usize,

    /// Reject add/update requests without a color.
    #[serde(default = "default_true")]
    pub require_color: bool,

    /// Which display fields are copied from the product when missing.
    #[serde(default)]
    pub display_fields: BackfillPolicy,
}

fn default_max_cart_lines() -> usize {
    DEFAULT_MAX_CART_LINES
}

fn default_true() -> bool {
    true
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            max_cart_lines: default_max_cart_lines(),
            require_color: true,
            display_fields: BackfillPolicy::default(),
        }
    }
}

// =============================================================================
// Logging Settings
// =============================================================================

/// Tracing settings. `RUST_LOG` wins over `filter` when set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            filter: default_log_filter(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete Shopcart configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub engine: EngineSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl ShopConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (shopcart.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                config = Self::from_file(&path)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns defaults if loading fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Parses a TOML file without applying overrides.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or(ConfigError::NoConfigPath)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.engine.max_cart_lines == 0 {
            return Err(ConfigError::Invalid(
                "engine.max_cart_lines must be greater than 0".into(),
            ));
        }

        if self.logging.filter.trim().is_empty() {
            return Err(ConfigError::Invalid("logging.filter must not be empty".into()));
        }

        Ok(())
    }

    /// Applies `SHOPCART_*` environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from any key/value source.
    fn apply_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = var("SHOPCART_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(value) = var("SHOPCART_DB_MAX_CONNECTIONS") {
            match value.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %value, "Ignoring invalid SHOPCART_DB_MAX_CONNECTIONS"),
            }
        }

        if let Some(value) = var("SHOPCART_DB_BUSY_TIMEOUT_SECS") {
            match value.parse::<u64>() {
                Ok(n) => self.database.busy_timeout_secs = n,
                Err(_) => warn!(value = %value, "Ignoring invalid SHOPCART_DB_BUSY_TIMEOUT_SECS"),
            }
        }

        if let Some(value) = var("SHOPCART_MAX_CART_LINES") {
            match value.parse::<usize>() {
                Ok(n) => {
                    debug!(max_cart_lines = n, "Overriding cart line limit from environment");
                    self.engine.max_cart_lines = n;
                }
                Err(_) => warn!(value = %value, "Ignoring invalid SHOPCART_MAX_CART_LINES"),
            }
        }

        if let Some(value) = var("SHOPCART_REQUIRE_COLOR") {
            match value.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.engine.require_color = true,
                "0" | "false" | "no" => self.engine.require_color = false,
                _ => warn!(value = %value, "Ignoring invalid SHOPCART_REQUIRE_COLOR"),
            }
        }

        if let Some(filter) = var("SHOPCART_LOG") {
            self.logging.filter = filter;
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("shopcart.toml"))
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("dev", "shopcart", "shopcart")
}
