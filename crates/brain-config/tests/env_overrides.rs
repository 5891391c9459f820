//! `BRAIN_*` environment variables override file and default values.

use std::path::{Path, PathBuf};

use brain_config::BrainConfig;
use figment::Jail;

#[test]
fn env_overrides_nested_sections() {
    Jail::expect_with(|jail| {
        jail.set_env("BRAIN_EVENTS__COMPACTION_THRESHOLD", "6");
        jail.set_env("BRAIN_STORE__ROOT", "/data/brain");
        jail.set_env("BRAIN_MIGRATION__DRY_RUN", "true");

        let config = BrainConfig::load_from(Path::new(".")).expect("config loads");
        assert_eq!(config.events.compaction_threshold, 6);
        assert_eq!(config.store.root, PathBuf::from("/data/brain"));
        assert!(config.migration.dry_run);
        Ok(())
    });
}

#[test]
fn env_beats_project_file() {
    Jail::expect_with(|jail| {
        std::fs::create_dir(".brain").map_err(|e| e.to_string())?;
        jail.create_file(
            ".brain/config.toml",
            r"
[confidence]
stale_threshold_days = 10
",
        )?;
        jail.set_env("BRAIN_CONFIDENCE__STALE_THRESHOLD_DAYS", "45");

        let config = BrainConfig::load_from(Path::new(".")).expect("config loads");
        assert_eq!(config.confidence.stale_threshold_days, 45);
        Ok(())
    });
}

#[test]
fn env_value_is_validated() {
    Jail::expect_with(|jail| {
        jail.set_env("BRAIN_CONFIDENCE__FLOOR", "2.0");
        assert!(BrainConfig::load_from(Path::new(".")).is_err());
        Ok(())
    });
}
