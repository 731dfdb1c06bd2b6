//! Database location and connection settings.

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Default database file, relative to the working directory.
fn default_path() -> String {
    "questmanager.db".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Path to the libSQL database file, or `:memory:`.
    #[serde(default = "default_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
        }
    }
}

impl DatabaseConfig {
    /// Config pointing at a specific database path.
    pub fn at(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// Reject settings that cannot open a database.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the path is blank.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.path.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "database.path".into(),
                reason: "must not be empty".into(),
            });
        }
        Ok(())
    }
}
