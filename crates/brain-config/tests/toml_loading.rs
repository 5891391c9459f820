//! Integration tests for TOML configuration loading.
//!
//! Uses `figment::Jail` for sandboxed working directories and env vars.

use std::path::{Path, PathBuf};

use brain_config::{BrainConfig, ConfigError};
use figment::{
    Figment, Jail,
    providers::{Format, Serialized, Toml},
};
use pretty_assertions::assert_eq;

#[test]
fn loads_sections_from_toml() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[store]
root = "/srv/brain"
registry_path = "index/registry.json"

[events]
compaction_threshold = 25
archive_compacted = true

[confidence]
decay_rate = 0.02
floor = 0.25
stale_threshold_days = 30

[migration]
workers = 8
error_preview = 3
"#,
        )?;

        let config: BrainConfig = Figment::from(Serialized::defaults(BrainConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        assert_eq!(config.store.root, PathBuf::from("/srv/brain"));
        assert_eq!(
            config.store.registry_file(),
            PathBuf::from("/srv/brain/index/registry.json")
        );
        assert_eq!(config.store.archive_dir, PathBuf::from(".brain/archive"));
        assert_eq!(config.events.compaction_threshold, 25);
        assert!(config.events.archive_compacted);
        assert!((config.confidence.decay_rate - 0.02).abs() < f64::EPSILON);
        assert!((config.confidence.decay_policy().floor - 0.25).abs() < f64::EPSILON);
        assert_eq!(config.confidence.stale_threshold_days, 30);
        assert_eq!(config.migration.workers, 8);
        assert_eq!(config.migration.error_preview, 3);
        assert!(!config.migration.dry_run);
        Ok(())
    });
}

#[test]
fn project_local_file_is_picked_up() {
    Jail::expect_with(|jail| {
        std::fs::create_dir(".brain").map_err(|e| e.to_string())?;
        jail.create_file(
            ".brain/config.toml",
            r"
[events]
compaction_threshold = 4
",
        )?;

        let config = BrainConfig::load_from(Path::new(".")).expect("config loads");
        assert_eq!(config.events.compaction_threshold, 4);
        assert_eq!(config.migration.workers, 4);
        Ok(())
    });
}

#[test]
fn invalid_local_value_fails_validation() {
    Jail::expect_with(|jail| {
        std::fs::create_dir(".brain").map_err(|e| e.to_string())?;
        jail.create_file(
            ".brain/config.toml",
            r"
[migration]
workers = 0
",
        )?;

        let err = BrainConfig::load_from(Path::new(".")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
        Ok(())
    });
}

#[test]
fn mistyped_value_is_a_figment_error() {
    Jail::expect_with(|jail| {
        std::fs::create_dir(".brain").map_err(|e| e.to_string())?;
        jail.create_file(
            ".brain/config.toml",
            r#"
[events]
compaction_threshold = "lots"
"#,
        )?;

        let err = BrainConfig::load_from(Path::new(".")).unwrap_err();
        assert!(matches!(err, ConfigError::Figment(_)));
        Ok(())
    });
}
