//! The denormalized, alias-indexed entity directory.
//!
//! The registry is derived data: it is rebuilt from a full scan of entity
//! records and never updated implicitly by mutations. Entries are keyed by
//! entity slug; `alias_index` maps lowercased aliases (and names) to slugs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::confidence::Confidence;
use crate::entities::Entity;
use crate::enums::{EntityStatus, EntityType};
use crate::ids::{REGISTRY_FORMAT_VERSION, REGISTRY_SCHEMA_URI, slug_of};

/// Summary of one entity for fast lookup without loading the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RegistryEntry {
    /// Full entity id (`entity/<type>/<slug>`).
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(rename = "type")]
    pub kind: EntityType,
    pub name: String,
    pub status: EntityStatus,
    pub version: u32,
    pub updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead: Option<String>,
    pub relationships_count: usize,
    pub confidence: Confidence,
}

impl RegistryEntry {
    #[must_use]
    pub fn from_entity(entity: &Entity) -> Self {
        Self {
            reference: entity.id.clone(),
            kind: entity.kind,
            name: entity.name.clone(),
            status: entity.status,
            version: entity.version,
            updated: entity.updated,
            aliases: entity.aliases.clone(),
            role: entity.profile.role.clone(),
            team: entity.profile.team.clone(),
            manager: entity.profile.manager.clone(),
            owner: entity.profile.owner.clone(),
            lead: entity.profile.lead.clone(),
            relationships_count: entity.relationships.len(),
            confidence: entity.confidence,
        }
    }

    /// The registry key for this entry.
    #[must_use]
    pub fn slug(&self) -> &str {
        slug_of(&self.reference)
    }
}

/// Aggregate counts, recomputed in full by [`Registry::compute_stats`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RegistryStats {
    pub total: usize,
    pub active: usize,
    pub by_type: BTreeMap<String, usize>,
    pub by_status: BTreeMap<String, usize>,
}

/// The registry record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Registry {
    #[serde(rename = "$schema")]
    pub schema_uri: String,
    pub format_version: u32,
    pub generated: DateTime<Utc>,
    #[serde(default)]
    pub entities: BTreeMap<String, RegistryEntry>,
    #[serde(default)]
    pub alias_index: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<RegistryStats>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Registry {
    #[must_use]
    pub fn new(generated: DateTime<Utc>) -> Self {
        Self {
            schema_uri: REGISTRY_SCHEMA_URI.to_string(),
            format_version: REGISTRY_FORMAT_VERSION,
            generated,
            entities: BTreeMap::new(),
            alias_index: BTreeMap::new(),
            stats: None,
        }
    }

    /// Build a registry from a set of entities, with stats.
    #[must_use]
    pub fn from_entities<'a>(entities: impl IntoIterator<Item = &'a Entity>, generated: DateTime<Utc>) -> Self {
        let mut registry = Self::new(generated);
        for entity in entities {
            registry.add_entity(entity);
        }
        registry.compute_stats();
        registry
    }

    /// Insert or replace the entry under `slug` and index its name and
    /// aliases.
    ///
    /// Returns the entry previously stored under the same slug, which signals
    /// a slug collision when it belongs to a different id.
    pub fn insert(&mut self, slug: impl Into<String>, entry: RegistryEntry) -> Option<RegistryEntry> {
        let slug = slug.into();
        index_entry(&mut self.alias_index, &slug, &entry);
        self.entities.insert(slug, entry)
    }

    /// [`Registry::insert`] keyed by the entity's slug.
    pub fn add_entity(&mut self, entity: &Entity) -> Option<RegistryEntry> {
        let entry = RegistryEntry::from_entity(entity);
        self.insert(entry.slug().to_string(), entry)
    }

    /// Look up a slug by alias, ignoring case.
    #[must_use]
    pub fn resolve_alias(&self, alias: &str) -> Option<&str> {
        self.alias_index
            .get(&normalize_alias(alias))
            .map(String::as_str)
    }

    /// Find an entry by slug, full id, or alias. An exact slug always wins.
    #[must_use]
    pub fn get_entity(&self, slug_or_alias: &str) -> Option<&RegistryEntry> {
        let key = slug_or_alias.trim();
        self.entities
            .get(key)
            .or_else(|| {
                self.entities
                    .get(slug_of(key))
                    .filter(|entry| entry.reference == key)
            })
            .or_else(|| self.resolve_alias(key).and_then(|slug| self.entities.get(slug)))
    }

    #[must_use]
    pub fn get_entities_by_type(&self, kind: EntityType) -> Vec<&RegistryEntry> {
        self.entities.values().filter(|e| e.kind == kind).collect()
    }

    #[must_use]
    pub fn get_active_entities(&self) -> Vec<&RegistryEntry> {
        self.entities
            .values()
            .filter(|e| e.status == EntityStatus::Active)
            .collect()
    }

    /// Recompute `stats` from scratch.
    pub fn compute_stats(&mut self) -> &RegistryStats {
        let mut stats = RegistryStats {
            total: self.entities.len(),
            ..RegistryStats::default()
        };
        for entry in self.entities.values() {
            if entry.status == EntityStatus::Active {
                stats.active += 1;
            }
            *stats.by_type.entry(entry.kind.as_str().to_string()).or_default() += 1;
            *stats.by_status.entry(entry.status.as_str().to_string()).or_default() += 1;
        }
        self.stats.insert(stats)
    }

    /// Clear and rebuild `alias_index` from the current entries.
    pub fn rebuild_alias_index(&mut self) {
        self.alias_index.clear();
        for (slug, entry) in &self.entities {
            index_entry(&mut self.alias_index, slug, entry);
        }
    }
}

/// Names are indexed only when the key is free; explicit aliases replace
/// whatever is there.
fn index_entry(index: &mut BTreeMap<String, String>, slug: &str, entry: &RegistryEntry) {
    let name = normalize_alias(&entry.name);
    if !name.is_empty() {
        index.entry(name).or_insert_with(|| slug.to_string());
    }
    for alias in &entry.aliases {
        let alias = normalize_alias(alias);
        if !alias.is_empty() {
            index.insert(alias, slug.to_string());
        }
    }
}

fn normalize_alias(alias: &str) -> String {
    alias.trim().to_lowercase()
}
