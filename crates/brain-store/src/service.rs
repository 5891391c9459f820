//! Service layer tying the store, the event helper, the registry, and
//! schema validation together.
//!
//! `Brain` is built from an explicit `BrainConfig`; there is no global
//! state. Every mutation follows the same protocol:
//! 1. Resolve the reference (id, slug, or alias) to an entity id
//! 2. Load the record
//! 3. Apply the change through `EventHelper` (event + version + compaction)
//! 4. Validate the result against the entity schema (warn-only)
//! 5. Write the record back
//!
//! The registry is derived data and only changes on `rebuild_registry`.

use std::path::PathBuf;

use brain_config::BrainConfig;
use brain_core::entities::{Entity, NewEntity};
use brain_core::enums::EntityType;
use brain_core::ids::parse_entity_id;
use brain_core::registry::{Registry, RegistryEntry};
use brain_schema::SchemaRegistry;
use chrono::Utc;

use crate::archive::CompactionArchive;
use crate::error::StoreError;
use crate::helper::EventHelper;
use crate::record::EntityRecord;
use crate::store::EntityStore;

/// Result of a full registry rebuild.
#[derive(Debug, Clone)]
pub struct RegistryRebuild {
    pub registry: Registry,
    /// Slugs claimed by more than one entity id.
    pub collisions: Vec<String>,
    pub path: PathBuf,
}

/// Construct / Mutate / Query entry point over a record directory.
pub struct Brain {
    config: BrainConfig,
    store: EntityStore,
    helper: EventHelper,
    schema: SchemaRegistry,
}

impl Brain {
    /// Build a service from configuration.
    #[must_use]
    pub fn new(config: BrainConfig) -> Self {
        let archive = if config.events.archive_compacted {
            CompactionArchive::new(config.store.archive_path())
        } else {
            CompactionArchive::disabled()
        };
        let helper = EventHelper::new(config.events.compaction_threshold, archive);
        let store = EntityStore::new(config.store.root.clone());
        Self {
            config,
            store,
            helper,
            schema: SchemaRegistry::new(),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &BrainConfig {
        &self.config
    }

    #[must_use]
    pub const fn store(&self) -> &EntityStore {
        &self.store
    }

    #[must_use]
    pub const fn helper(&self) -> &EventHelper {
        &self.helper
    }

    #[must_use]
    pub const fn schema(&self) -> &SchemaRegistry {
        &self.schema
    }

    // ---------------------------------------------------------------------
    // Construct
    // ---------------------------------------------------------------------

    /// Create and persist a new entity with an optional Markdown body.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AlreadyExists` if a record with the derived id is
    /// present, `StoreError::Core` for invalid seeds, or I/O errors.
    pub fn create(
        &self,
        kind: EntityType,
        seed: NewEntity,
        actor: &str,
        body: &str,
    ) -> Result<EntityRecord, StoreError> {
        let entity = Entity::create(kind, seed, actor)?;
        if self.store.exists(&entity.id) {
            return Err(StoreError::AlreadyExists(entity.id));
        }
        self.check_schema(&entity);
        let record = EntityRecord::new(entity, body.to_string());
        self.store.save(&record)?;
        tracing::info!("created {}", record.entity.id);
        Ok(record)
    }

    // ---------------------------------------------------------------------
    // Mutate
    // ---------------------------------------------------------------------

    /// Load the referenced entity, apply `change` through the event helper,
    /// and write it back.
    ///
    /// The record is saved only when `change` succeeds and actually changed
    /// the entity.
    ///
    /// # Errors
    ///
    /// Returns resolution, load, or save errors, or whatever `change` returns.
    pub fn mutate<T, F>(&self, reference: &str, change: F) -> Result<(EntityRecord, T), StoreError>
    where
        F: FnOnce(&EventHelper, &mut Entity) -> Result<T, StoreError>,
    {
        let id = self.resolve_id(reference)?;
        let mut record = self.store.load(&id)?;
        let before = record.entity.clone();
        let outcome = change(&self.helper, &mut record.entity)?;

        if record.entity != before {
            self.check_schema(&record.entity);
            self.store.save(&record)?;
        }
        Ok((record, outcome))
    }

    // ---------------------------------------------------------------------
    // Query
    // ---------------------------------------------------------------------

    /// Load the referenced entity.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the reference cannot be resolved.
    pub fn get(&self, reference: &str) -> Result<EntityRecord, StoreError> {
        let id = self.resolve_id(reference)?;
        self.store.load(&id)
    }

    /// Turn an entity id, slug, or alias into an entity id.
    ///
    /// Well-formed ids are returned as-is; anything else goes through the
    /// persisted registry.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the registry has no match.
    pub fn resolve_id(&self, reference: &str) -> Result<String, StoreError> {
        let reference = reference.trim();
        if parse_entity_id(reference).is_ok() {
            return Ok(reference.to_string());
        }
        self.resolve(reference)?
            .map(|entry| entry.reference)
            .ok_or_else(|| StoreError::NotFound(reference.to_string()))
    }

    /// Registry lookup by slug or alias. `Ok(None)` on a miss.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no registry has been built yet.
    pub fn resolve(&self, slug_or_alias: &str) -> Result<Option<RegistryEntry>, StoreError> {
        let registry = self.load_registry()?.ok_or_else(|| {
            StoreError::NotFound("registry (run `brain registry rebuild` first)".to_string())
        })?;
        Ok(registry.get_entity(slug_or_alias).cloned())
    }

    // ---------------------------------------------------------------------
    // Registry
    // ---------------------------------------------------------------------

    /// Scan every record, rebuild the registry with stats, and persist it.
    ///
    /// # Errors
    ///
    /// Returns I/O or serialization errors. Unreadable records are skipped.
    pub fn rebuild_registry(&self) -> Result<RegistryRebuild, StoreError> {
        let records = self.store.list()?;
        let mut registry = Registry::new(Utc::now());
        let mut collisions = Vec::new();

        for record in &records {
            if let Some(previous) = registry.add_entity(&record.entity) {
                if previous.reference != record.entity.id {
                    tracing::warn!(
                        "slug {} claimed by {} and {}",
                        record.entity.slug(),
                        previous.reference,
                        record.entity.id
                    );
                    collisions.push(record.entity.slug().to_string());
                }
            }
        }
        // overwritten entries may have left stale aliases behind
        registry.rebuild_alias_index();
        registry.compute_stats();

        let path = self.save_registry(&registry)?;
        tracing::info!(
            "rebuilt registry: {} entities, {} aliases",
            registry.entities.len(),
            registry.alias_index.len()
        );
        Ok(RegistryRebuild {
            registry,
            collisions,
            path,
        })
    }

    /// Read the persisted registry. `Ok(None)` if it has never been built.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` or `StoreError::Parse`.
    pub fn load_registry(&self) -> Result<Option<Registry>, StoreError> {
        let path = self.config.store.registry_file();
        if !path.is_file() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&path).map_err(|e| StoreError::io(&path, e))?;
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| StoreError::parse(&path, e))
    }

    /// Write the registry as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Serialize` or `StoreError::Io`.
    pub fn save_registry(&self, registry: &Registry) -> Result<PathBuf, StoreError> {
        let path = self.config.store.registry_file();
        let json = serde_json::to_string_pretty(registry).map_err(|e| StoreError::Serialize(e.to_string()))?;
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;
        }
        std::fs::write(&path, json).map_err(|e| StoreError::io(&path, e))?;
        Ok(path)
    }

    fn check_schema(&self, entity: &Entity) {
        match serde_json::to_value(entity) {
            Ok(value) => {
                if let Err(e) = self.schema.validate("entity", &value) {
                    tracing::warn!("entity {} failed schema validation: {e}", entity.id);
                }
            }
            Err(e) => tracing::warn!("entity {} could not be encoded for validation: {e}", entity.id),
        }
    }
}
