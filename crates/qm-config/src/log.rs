//! Logging configuration.

use serde::{Deserialize, Serialize};

fn default_filter() -> String {
    "warn".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive, e.g. `qm_db=debug`.
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}
