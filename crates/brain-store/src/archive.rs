//! JSONL sidecar for events dropped by compaction.
//!
//! Appends dropped `ChangeEvent`s to `<archive_dir>/<type>/<slug>.jsonl`
//! using `serde_jsonlines::append_json_lines`, one event per line. The entity
//! record itself stays bounded; the archive is optional audit history.

use std::path::{Path, PathBuf};

use brain_core::events::ChangeEvent;
use brain_core::ids::parse_entity_id;

use crate::error::StoreError;

/// Appends compacted events to per-entity JSONL files.
#[derive(Debug, Clone)]
pub struct CompactionArchive {
    dir: PathBuf,
    enabled: bool,
}

impl CompactionArchive {
    /// Create an enabled archive rooted at `dir`. The directory is created
    /// lazily on first append.
    #[must_use]
    pub const fn new(dir: PathBuf) -> Self {
        Self { dir, enabled: true }
    }

    /// An archive that discards everything.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            dir: PathBuf::new(),
            enabled: false,
        }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Archive file for an entity id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Core` for a malformed id.
    pub fn path_for(&self, entity_id: &str) -> Result<PathBuf, StoreError> {
        let (segment, slug) = parse_entity_id(entity_id)?;
        Ok(self.dir.join(segment).join(format!("{slug}.jsonl")))
    }

    /// Append dropped events, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the directory or file cannot be written.
    pub fn append(&self, entity_id: &str, events: &[ChangeEvent]) -> Result<(), StoreError> {
        if !self.enabled || events.is_empty() {
            return Ok(());
        }

        let path = self.path_for(entity_id)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        serde_jsonlines::append_json_lines(&path, events).map_err(|e| StoreError::io(&path, e))?;
        tracing::debug!("archived {} events for {entity_id}", events.len());
        Ok(())
    }

    /// Read back everything archived for an entity. Missing file = empty.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` on read or decode failures.
    pub fn read(&self, entity_id: &str) -> Result<Vec<ChangeEvent>, StoreError> {
        let path = self.path_for(entity_id)?;
        if !path.is_file() {
            return Ok(Vec::new());
        }
        serde_jsonlines::json_lines(&path)
            .map_err(|e| StoreError::io(&path, e))?
            .collect::<std::io::Result<Vec<ChangeEvent>>>()
            .map_err(|e| StoreError::io(&path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brain_core::events::{EventOptions, create_event};
    use pretty_assertions::assert_eq;

    fn events(n: usize) -> Vec<ChangeEvent> {
        (0..n)
            .map(|i| {
                create_event(
                    "field-update",
                    "alice",
                    EventOptions::default().with_message(format!("change {i}")),
                )
                .unwrap()
            })
            .collect()
    }

    #[test]
    fn appends_accumulate() {
        let dir = tempfile::tempdir().unwrap();
        let archive = CompactionArchive::new(dir.path().join("archive"));
        let first = events(2);
        let second = events(3);

        archive.append("entity/person/jane", &first).unwrap();
        archive.append("entity/person/jane", &second).unwrap();

        let stored = archive.read("entity/person/jane").unwrap();
        assert_eq!(stored.len(), 5);
        assert_eq!(stored[..2], first[..]);
        assert_eq!(stored[2..], second[..]);
        assert!(dir.path().join("archive/person/jane.jsonl").is_file());
    }

    #[test]
    fn disabled_archive_writes_nothing() {
        let archive = CompactionArchive::disabled();
        archive.append("entity/person/jane", &events(1)).unwrap();
        assert!(!archive.is_enabled());
        assert!(archive.read("entity/person/jane").unwrap().is_empty());
    }
}
