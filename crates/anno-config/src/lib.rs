//! # anno-config
//!
//! Layered configuration loading for annograph using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`ANNOGRAPH_*` prefix, `__` as separator)
//! 2. Project-level `.annograph/config.toml`
//! 3. User-level `~/.config/annograph/config.toml`
//! 4. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `ANNOGRAPH_DATABASE__PATH` -> `database.path`,
//! `ANNOGRAPH_CLOSURE__SEPARATOR` -> `closure.separator`, etc.
//!
//! # Usage
//!
//! ```no_run
//! use anno_config::AnnoConfig;
//!
//! let config = AnnoConfig::load_with_dotenv().expect("config");
//! println!("database: {}", config.database.path);
//! ```

mod alignment;
mod closure;
mod database;
mod error;
mod import;
mod query;

pub use alignment::AlignmentConfig;
pub use closure::ClosureConfig;
pub use database::DatabaseConfig;
pub use error::ConfigError;
pub use import::ImportConfig;
pub use query::QueryConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AnnoConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub closure: ClosureConfig,
    #[serde(default)]
    pub alignment: AlignmentConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub import: ImportConfig,
}

impl AnnoConfig {
    /// Load configuration from all sources (TOML files + environment variables).
    ///
    /// Does NOT call `dotenvy` -- use [`Self::load_with_dotenv`] for `.env` loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if extraction fails or a value is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let config: Self = Self::figment().extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with `.env` file support.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if extraction fails or a value is invalid.
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::load()
    }

    /// Build the figment provider chain.
    ///
    /// Public so tests can inspect the figment directly or add providers on top.
    #[must_use]
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        let local_path = PathBuf::from(".annograph/config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        figment.merge(Env::prefixed("ANNOGRAPH_").split("__"))
    }

    /// Reject values the engines cannot work with.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for an empty closure separator,
    /// an empty database path, or a zero progress interval.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.closure.separator.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "closure.separator".into(),
                reason: "must not be empty".into(),
            });
        }
        if self.database.path.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "database.path".into(),
                reason: "must not be empty".into(),
            });
        }
        if self.import.progress_every == 0 {
            return Err(ConfigError::InvalidValue {
                field: "import.progress_every".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("annograph").join("config.toml"))
    }
}
