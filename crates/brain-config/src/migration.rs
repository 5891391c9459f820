//! Legacy record migration settings.

use serde::{Deserialize, Serialize};

use crate::ConfigError;

const fn default_workers() -> usize {
    4
}

const fn default_error_preview() -> usize {
    10
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MigrationConfig {
    /// Size of the worker pool used by batch migration.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// How many per-record failures are kept in the report.
    #[serde(default = "default_error_preview")]
    pub error_preview: usize,

    /// Run every step except writing records back.
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            error_preview: default_error_preview(),
            dry_run: false,
        }
    }
}

impl MigrationConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::invalid("migration.workers", "must be at least 1"));
        }
        Ok(())
    }
}
