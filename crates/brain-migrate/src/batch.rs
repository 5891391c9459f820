//! Batch driver: discover legacy records and upgrade them into the store
//! layout.
//!
//! An upgraded record is written to its canonical `<type-dir>/<slug>.md`
//! path under the scanned root and the legacy file is removed, so every
//! migrated record is reachable through the store and the registry.
//!
//! Records are independent, so the batch fans out over a bounded rayon pool
//! (or runs sequentially with a single worker) and merges the per-record
//! outcomes once every worker is done. A failing record is reported and the
//! batch carries on.

use std::io::Write;
use std::path::{Path, PathBuf};

use brain_config::MigrationConfig;
use brain_core::entities::Entity;
use brain_core::responses::{MigrationFailure, MigrationReport};
use brain_schema::SchemaRegistry;
use brain_store::{Brain, EntityStore, EventHelper};
use chrono::{DateTime, Utc};
use ignore::WalkBuilder;
use rayon::prelude::*;

use crate::error::MigrationError;
use crate::infer::TypeQuality;
use crate::upgrade::upgrade_record;

/// Per-directory ignore file honoured during discovery.
pub const IGNORE_FILENAME: &str = ".brainignore";

/// Directories never scanned for records.
const SKIPPED_DIRS: [&str; 2] = [".brain", ".git"];

/// What happened to one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    Migrated(TypeQuality),
    /// Already carried `$schema`.
    Skipped,
}

/// Upgrades every legacy record under a root directory.
pub struct Migrator {
    config: MigrationConfig,
    helper: EventHelper,
    schema: SchemaRegistry,
}

impl Migrator {
    #[must_use]
    pub fn new(config: MigrationConfig, helper: EventHelper) -> Self {
        Self {
            config,
            helper,
            schema: SchemaRegistry::new(),
        }
    }

    /// A migrator sharing the service's migration settings and event helper.
    #[must_use]
    pub fn for_brain(brain: &Brain) -> Self {
        Self::new(brain.config().migration.clone(), brain.helper().clone())
    }

    #[must_use]
    pub const fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Every Markdown file under `root`, sorted.
    ///
    /// `.gitignore` and [`IGNORE_FILENAME`] rules apply; `.brain/` and
    /// `.git/` are always skipped. Unreadable directory entries are logged
    /// and skipped.
    #[must_use]
    pub fn discover(root: &Path) -> Vec<PathBuf> {
        let mut builder = WalkBuilder::new(root);
        builder.hidden(false);
        builder.add_custom_ignore_filename(IGNORE_FILENAME);
        builder.filter_entry(|entry| {
            let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
            !(is_dir && SKIPPED_DIRS.iter().any(|d| entry.file_name() == *d))
        });

        let mut paths: Vec<PathBuf> = builder
            .build()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!("skipping unreadable entry: {e}");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
            .map(ignore::DirEntry::into_path)
            .filter(|path| path.extension().is_some_and(|ext| ext == "md"))
            .collect();
        paths.sort();
        paths
    }

    /// Upgrade one record and write it to its store path under `root`,
    /// removing the legacy file when the path differs. Nothing is written
    /// or removed on a dry run.
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Io` on read or write failures,
    /// `MigrationError::Encode` if the upgraded record cannot be rendered,
    /// `MigrationError::Conflict` if another record already occupies the
    /// store path, and whatever [`upgrade_record`] returns.
    pub fn migrate_file(
        &self,
        path: &Path,
        root: &Path,
        at: DateTime<Utc>,
    ) -> Result<FileOutcome, MigrationError> {
        let text = std::fs::read_to_string(path).map_err(|source| MigrationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let Some(upgrade) = upgrade_record(path, root, &text, &self.helper, at)? else {
            return Ok(FileOutcome::Skipped);
        };

        self.check_schema(&upgrade.record.entity, path);
        let rendered = upgrade.record.render().map_err(|e| MigrationError::Encode {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let target = EntityStore::new(root).path_for(&upgrade.record.entity.id)?;
        if target == path {
            if !self.config.dry_run {
                std::fs::write(path, rendered).map_err(|source| MigrationError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
            }
        } else if self.config.dry_run {
            if target.exists() {
                return Err(MigrationError::Conflict {
                    path: path.to_path_buf(),
                    target,
                });
            }
        } else {
            write_new(path, &target, &rendered)?;
            std::fs::remove_file(path).map_err(|source| MigrationError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            tracing::debug!("moved {} to {}", path.display(), target.display());
        }
        if upgrade.type_quality == TypeQuality::Defaulted {
            tracing::debug!(
                "{}: no type found, defaulted to {}",
                path.display(),
                upgrade.record.entity.kind
            );
        }
        Ok(FileOutcome::Migrated(upgrade.type_quality))
    }

    /// Discover and upgrade every record under `root`.
    ///
    /// `on_progress` is called once per record after it is processed, from
    /// whichever worker processed it.
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Pool` if the worker pool cannot be started.
    /// Per-record failures are collected in the report instead.
    pub fn run(
        &self,
        root: &Path,
        on_progress: &(dyn Fn(&Path) + Sync),
    ) -> Result<MigrationReport, MigrationError> {
        let paths = Self::discover(root);
        let at = Utc::now();
        tracing::info!(
            "migrating {} records under {} with {} worker(s)",
            paths.len(),
            root.display(),
            self.config.workers
        );

        let process = |path: &PathBuf| {
            let outcome = self.migrate_file(path, root, at);
            on_progress(path);
            outcome
        };
        let outcomes: Vec<Result<FileOutcome, MigrationError>> = if self.config.workers <= 1 {
            paths.iter().map(process).collect()
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.workers)
                .build()
                .map_err(|e| MigrationError::Pool(e.to_string()))?;
            pool.install(|| paths.par_iter().map(process).collect())
        };

        let mut report = MigrationReport {
            scanned: paths.len(),
            dry_run: self.config.dry_run,
            ..MigrationReport::default()
        };
        for (path, outcome) in paths.iter().zip(outcomes) {
            match outcome {
                Ok(FileOutcome::Migrated(_)) => report.migrated += 1,
                Ok(FileOutcome::Skipped) => report.skipped += 1,
                Err(e) => {
                    tracing::warn!("failed to migrate {}: {e}", path.display());
                    let relative = path.strip_prefix(root).unwrap_or(path);
                    report.record_failure(
                        MigrationFailure {
                            path: relative.display().to_string(),
                            message: e.to_string(),
                        },
                        self.config.error_preview,
                    );
                }
            }
        }
        tracing::info!(
            "migration done: {} migrated, {} skipped, {} errors",
            report.migrated,
            report.skipped,
            report.errors
        );
        Ok(report)
    }

    fn check_schema(&self, entity: &Entity, path: &Path) {
        match serde_json::to_value(entity) {
            Ok(value) => {
                if let Err(e) = self.schema.validate("entity", &value) {
                    tracing::warn!("{}: upgraded entity failed schema validation: {e}", path.display());
                }
            }
            Err(e) => tracing::warn!("{}: upgraded entity could not be encoded: {e}", path.display()),
        }
    }
}

/// Write `contents` to `target`, failing if the file already exists.
fn write_new(source: &Path, target: &Path, contents: &str) -> Result<(), MigrationError> {
    let io_error = |path: &Path, source: std::io::Error| MigrationError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = target.parent() {
        std::fs::create_dir_all(dir).map_err(|e| io_error(dir, e))?;
    }
    let mut file = match std::fs::OpenOptions::new().write(true).create_new(true).open(target) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            return Err(MigrationError::Conflict {
                path: source.to_path_buf(),
                target: target.to_path_buf(),
            });
        }
        Err(e) => return Err(io_error(target, e)),
    };
    file.write_all(contents.as_bytes()).map_err(|e| io_error(target, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn discovery_skips_store_internals_and_other_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for sub in ["people", ".brain/archive", ".git", "drafts"] {
            std::fs::create_dir_all(root.join(sub)).unwrap();
        }
        for file in [
            "people/jane.md",
            "people/notes.txt",
            ".brain/archive/x.md",
            ".git/HEAD.md",
            "drafts/wip.md",
            "README.md",
        ] {
            std::fs::write(root.join(file), "---\nname: x\n---\n").unwrap();
        }
        std::fs::write(root.join(IGNORE_FILENAME), "drafts/\n").unwrap();

        let found: Vec<String> = Migrator::discover(root)
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().display().to_string())
            .collect();
        assert_eq!(found, vec!["README.md", "people/jane.md"]);
    }
}
