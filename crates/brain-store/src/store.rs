//! File-backed entity records, one Markdown file per entity.
//!
//! Layout: `<root>/<type-dir>/<slug>.md`, where the type directory is the
//! plural of the entity type (`people`, `teams`, `squads`, ...).

use std::path::{Path, PathBuf};

use brain_core::enums::EntityType;
use brain_core::errors::CoreError;
use brain_core::ids::parse_entity_id;

use crate::error::StoreError;
use crate::record::{EntityRecord, Record};

/// Extension of entity record files.
pub const RECORD_EXTENSION: &str = "md";

/// Reads and writes entity records under a root directory.
#[derive(Debug, Clone)]
pub struct EntityStore {
    root: PathBuf,
}

impl EntityStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Record path for an entity id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Core` if the id is malformed or its type segment
    /// is not a known entity type.
    pub fn path_for(&self, id: &str) -> Result<PathBuf, StoreError> {
        let (segment, slug) = parse_entity_id(id)?;
        let kind: EntityType = segment.parse().map_err(|_| {
            CoreError::Validation(format!("entity id '{id}' has no storable type"))
        })?;
        Ok(self
            .root
            .join(kind.dir_name())
            .join(format!("{slug}.{RECORD_EXTENSION}")))
    }

    #[must_use]
    pub fn exists(&self, id: &str) -> bool {
        self.path_for(id).is_ok_and(|p| p.is_file())
    }

    /// Load and decode one record.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no file exists for the id,
    /// `StoreError::Parse` if it is legacy or malformed, and `StoreError::Io`
    /// on read failures.
    pub fn load(&self, id: &str) -> Result<EntityRecord, StoreError> {
        let path = self.path_for(id)?;
        if !path.is_file() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        let record = Self::load_path(&path)?;
        if record.entity.id != id {
            tracing::warn!(
                "record at {} declares id {} (expected {id})",
                path.display(),
                record.entity.id
            );
        }
        Ok(record)
    }

    /// Load and decode a record from an explicit path.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` or `StoreError::Parse`.
    pub fn load_path(path: &Path) -> Result<EntityRecord, StoreError> {
        let text = std::fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
        let record = Record::parse(&text).map_err(|e| StoreError::parse(path, e))?;
        if !record.is_upgraded() {
            return Err(StoreError::parse(path, "legacy record (no $schema)"));
        }
        EntityRecord::from_record(record).map_err(|e| StoreError::parse(path, e))
    }

    /// Encode and write a record, creating the type directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Serialize` if encoding fails and `StoreError::Io`
    /// on write failures.
    pub fn save(&self, record: &EntityRecord) -> Result<PathBuf, StoreError> {
        let path = self.path_for(&record.entity.id)?;
        let text = record
            .render()
            .map_err(|e| StoreError::Serialize(e.to_string()))?;
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;
        }
        std::fs::write(&path, text).map_err(|e| StoreError::io(&path, e))?;
        tracing::debug!("saved {} v{}", record.entity.id, record.entity.version);
        Ok(path)
    }

    /// Every upgraded record under the type directories, sorted by path.
    ///
    /// Legacy files are skipped silently; unreadable or malformed ones are
    /// skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` only if a type directory exists but cannot
    /// be listed.
    pub fn list(&self) -> Result<Vec<EntityRecord>, StoreError> {
        let mut paths = Vec::new();
        for kind in EntityType::ALL {
            let dir = self.root.join(kind.dir_name());
            if !dir.is_dir() {
                continue;
            }
            let entries = std::fs::read_dir(&dir).map_err(|e| StoreError::io(&dir, e))?;
            for entry in entries {
                let path = entry.map_err(|e| StoreError::io(&dir, e))?.path();
                if path.is_file() && path.extension().is_some_and(|ext| ext == RECORD_EXTENSION) {
                    paths.push(path);
                }
            }
        }
        paths.sort();

        let mut records = Vec::with_capacity(paths.len());
        for path in paths {
            match Self::load_path(&path) {
                Ok(record) => records.push(record),
                Err(StoreError::Parse { message, .. }) if message.starts_with("legacy") => {
                    tracing::debug!("skipping legacy record {}", path.display());
                }
                Err(e) => tracing::warn!("skipping {}: {e}", path.display()),
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brain_core::entities::{Entity, NewEntity};
    use pretty_assertions::assert_eq;

    fn record(kind: EntityType, name: &str) -> EntityRecord {
        EntityRecord::new(
            Entity::create(kind, NewEntity::named(name), "tester").unwrap(),
            format!("About {name}.\n"),
        )
    }

    #[test]
    fn path_uses_plural_type_dir() {
        let store = EntityStore::new("/brain");
        assert_eq!(
            store.path_for("entity/person/jane-smith").unwrap(),
            PathBuf::from("/brain/people/jane-smith.md")
        );
        assert_eq!(
            store.path_for("entity/squad/core").unwrap(),
            PathBuf::from("/brain/squads/core.md")
        );
        assert!(store.path_for("entity/unknown/x").is_err());
        assert!(store.path_for("jane-smith").is_err());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = EntityStore::new(dir.path());
        let original = record(EntityType::Team, "Platform");

        let path = store.save(&original).unwrap();
        assert_eq!(path, dir.path().join("teams/platform.md"));
        assert!(store.exists("entity/team/platform"));

        let loaded = store.load("entity/team/platform").unwrap();
        assert_eq!(loaded, original);
    }

    #[test]
    fn load_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = EntityStore::new(dir.path());
        assert!(matches!(
            store.load("entity/person/ghost"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn list_skips_legacy_and_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = EntityStore::new(dir.path());
        store.save(&record(EntityType::Person, "Jane")).unwrap();
        store.save(&record(EntityType::Project, "Atlas")).unwrap();
        std::fs::write(dir.path().join("people/legacy.md"), "---\nname: Old\n---\nbody").unwrap();
        std::fs::write(dir.path().join("people/notes.txt"), "ignored").unwrap();
        std::fs::write(dir.path().join("people/broken.md"), "---\n$schema: [\n---\n").unwrap();

        let ids: Vec<String> = store.list().unwrap().into_iter().map(|r| r.entity.id).collect();
        assert_eq!(ids, vec!["entity/person/jane", "entity/project/atlas"]);
    }
}
