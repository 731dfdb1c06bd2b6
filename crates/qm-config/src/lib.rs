//! # qm-config
//!
//! Layered configuration loading for the Quest Manager data layer using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`QUESTMANAGER_*` prefix, `__` as separator)
//! 2. Project-level `.questmanager/config.toml`
//! 3. User-level `~/.config/questmanager/config.toml`
//! 4. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `QUESTMANAGER_DATABASE__PATH` -> `database.path`,
//! `QUESTMANAGER_LOG__FILTER` -> `log.filter`.
//!
//! # Usage
//!
//! ```no_run
//! use qm_config::QmConfig;
//!
//! let config = QmConfig::load_with_dotenv().expect("config");
//! println!("database: {}", config.database.path);
//! ```

mod database;
mod error;
mod log;

pub use database::DatabaseConfig;
pub use error::ConfigError;
pub use log::LogConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct QmConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl QmConfig {
    /// Load configuration from all sources (TOML files + environment variables).
    ///
    /// Does NOT call `dotenvy`; use [`QmConfig::load_with_dotenv`] for `.env` loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a source cannot be parsed or the result is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let config: Self = Self::figment().extract()?;
        config.database.validate()?;
        Ok(config)
    }

    /// Load configuration after reading `.env` from the workspace root.
    ///
    /// # Errors
    ///
    /// Same as [`QmConfig::load`].
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        Self::load_dotenv_from_workspace();
        Self::load()
    }

    /// Build the figment provider chain.
    ///
    /// Public so tests can inspect the figment or layer more providers on top.
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        let local_path = PathBuf::from(".questmanager/config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        figment.merge(Env::prefixed("QUESTMANAGER_").split("__"))
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("questmanager").join("config.toml"))
    }

    /// Load `.env` walking up from `CARGO_MANIFEST_DIR`, falling back to the
    /// current directory. Silently does nothing if no `.env` is found.
    fn load_dotenv_from_workspace() {
        if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
            let mut dir = PathBuf::from(manifest_dir);
            // crate -> crates/ -> workspace root
            for _ in 0..3 {
                let env_path = dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                    return;
                }
                if !dir.pop() {
                    break;
                }
            }
        }

        let _ = dotenvy::dotenv();
    }
}
