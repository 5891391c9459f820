//! # brain-config
//!
//! Layered configuration loading for Brain using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`BRAIN_*` prefix, `__` as separator)
//! 2. Project-level `.brain/config.toml`
//! 3. User-level `~/.config/brain/config.toml`
//! 4. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `BRAIN_EVENTS__COMPACTION_THRESHOLD` -> `events.compaction_threshold`,
//! `BRAIN_STORE__ROOT` -> `store.root`, etc.
//!
//! # Usage
//!
//! ```no_run
//! use brain_config::BrainConfig;
//!
//! let config = BrainConfig::load_with_dotenv().expect("config");
//! println!("records live under {}", config.store.root.display());
//! ```

mod confidence;
mod error;
mod events;
mod migration;
mod store;

pub use confidence::ConfidenceConfig;
pub use error::ConfigError;
pub use events::EventsConfig;
pub use migration::MigrationConfig;
pub use store::StoreConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Project-relative location of the local config file.
pub const LOCAL_CONFIG_PATH: &str = ".brain/config.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct BrainConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub events: EventsConfig,
    #[serde(default)]
    pub confidence: ConfidenceConfig,
    #[serde(default)]
    pub migration: MigrationConfig,
}

impl BrainConfig {
    /// Load configuration from all sources, using the current directory as
    /// the project root.
    ///
    /// Does NOT call `dotenvy`; use [`BrainConfig::load_with_dotenv`] for
    /// `.env` support.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Figment` for unreadable or mistyped sources and
    /// `ConfigError::InvalidValue` when validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Path::new("."))
    }

    /// Load configuration with `.brain/config.toml` looked up under
    /// `project_dir`.
    ///
    /// # Errors
    ///
    /// Same as [`BrainConfig::load`].
    pub fn load_from(project_dir: &Path) -> Result<Self, ConfigError> {
        let config: Self = Self::figment(project_dir).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load `.env` from the current directory, then [`BrainConfig::load`].
    ///
    /// # Errors
    ///
    /// Same as [`BrainConfig::load`].
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::load()
    }

    /// Build the figment provider chain.
    ///
    /// Public so tests can inspect the figment or layer extra providers on top.
    #[must_use]
    pub fn figment(project_dir: &Path) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global_path) = Self::global_config_path().filter(|p| p.exists()) {
            figment = figment.merge(Toml::file(global_path));
        }

        let local_path = project_dir.join(LOCAL_CONFIG_PATH);
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        figment.merge(Env::prefixed("BRAIN_").split("__"))
    }

    /// Reject values the store cannot work with.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.events.validate()?;
        self.confidence.validate()?;
        self.migration.validate()
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("brain").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = BrainConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.events.compaction_threshold, 10);
        assert!(!config.events.archive_compacted);
        assert_eq!(config.migration.workers, 4);
        assert_eq!(config.migration.error_preview, 10);
        assert_eq!(config.store.registry_path, PathBuf::from(".brain/registry.json"));
    }

    #[test]
    fn zero_workers_is_rejected() {
        let mut config = BrainConfig::default();
        config.migration.workers = 0;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "migration.workers"));
    }

    #[test]
    fn tiny_compaction_threshold_is_rejected() {
        let mut config = BrainConfig::default();
        config.events.compaction_threshold = 1;
        assert!(config.validate().is_err());
    }
}
