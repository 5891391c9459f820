//! Upgrade of a single legacy record.
//!
//! [`upgrade_record`] is pure apart from the compaction archive reachable
//! through the event helper: it takes the record's text and returns the
//! upgraded entity, leaving reading and writing to the batch driver.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use brain_core::entities::{Entity, NewEntity, Profile, Relationship};
use brain_core::enums::{EntityStatus, EntityType, EventType, RelationshipType};
use brain_core::errors::CoreError;
use brain_core::events::{EventOptions, FieldChange, new_event};
use brain_core::ids::{entity_id, slug_of};
use brain_store::record::{Record, scalar_to_string};
use brain_store::{AppendOptions, EntityRecord, EventHelper};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_yaml::Value;

use crate::error::MigrationError;
use crate::infer::{TypeQuality, infer_confidence, infer_name, infer_slug, infer_source, infer_type};
use crate::links::{NormalizedRef, extract_wiki_links, normalize_reference};

/// Actor recorded on the upgrade event.
pub const MIGRATOR_ACTOR: &str = "system:schema-migrator";

/// Source recorded on the upgrade event and on inferred relationships.
pub const MIGRATION_SOURCE: &str = "migration";

/// Prefix for legacy keys that would collide with entity fields.
pub const LEGACY_KEY_PREFIX: &str = "legacy_";

/// Legacy keys that become relationships, with the relationship type and
/// the entity type implied for the target.
const REFERENCE_EDGES: [(&str, RelationshipType, Option<EntityType>); 3] = [
    ("manager", RelationshipType::ReportsTo, Some(EntityType::Person)),
    ("team", RelationshipType::MemberOf, Some(EntityType::Team)),
    ("owner", RelationshipType::OwnedBy, None),
];

/// Content keys of an entity. Legacy values under these names are only kept
/// when they were consumed with the right shape.
const RESERVED_KEYS: [&str; 4] = ["name", "description", "links", "metadata"];

/// An upgraded record and what the heuristics reported about it.
#[derive(Debug, Clone)]
pub struct Upgrade {
    pub record: EntityRecord,
    pub type_quality: TypeQuality,
    /// Legacy keys that could not be carried over.
    pub dropped_keys: Vec<String>,
}

/// Upgrade the legacy record at `path`, read from `text`.
///
/// Returns `Ok(None)` if the record already carries `$schema`. Malformed
/// metadata is treated as empty. The body is kept byte-for-byte.
///
/// # Errors
///
/// Returns `MigrationError::Core` if no entity can be assembled (for example
/// the filename yields no slug), or `MigrationError::Store` if archiving
/// compacted events fails.
pub fn upgrade_record(
    path: &Path,
    root: &Path,
    text: &str,
    helper: &EventHelper,
    at: DateTime<Utc>,
) -> Result<Option<Upgrade>, MigrationError> {
    let legacy = Record::parse_lenient(text);
    if legacy.is_upgraded() {
        return Ok(None);
    }

    let inferred = infer_type(path, root, &legacy);
    let kind = inferred.kind;
    let slug = infer_slug(path).ok_or_else(|| {
        CoreError::Validation(format!("file name of {} yields no slug", path.display()))
    })?;
    let id = entity_id(kind, &slug);

    let mut consumed: BTreeSet<&str> = BTreeSet::new();
    if inferred.quality == TypeQuality::Metadata {
        consumed.insert("type");
    }
    consumed.extend(["name", "title"].into_iter().find(|k| legacy.get_str(k).is_some()));

    let description = legacy.get_str("description");
    let tags = split_list(&legacy, "tags");
    let aliases = split_list(&legacy, "aliases");
    let links = string_map(&legacy, "links");
    for (key, present) in [
        ("source", legacy.get_str("source").is_some()),
        ("description", description.is_some()),
        ("tags", tags.is_some()),
        ("aliases", aliases.is_some()),
        ("links", links.is_some()),
    ] {
        if present {
            consumed.insert(key);
        }
    }

    let mut profile = Profile::default();
    for &field in Profile::fields_for(kind) {
        let first = values(&legacy, field).and_then(|v| v.into_iter().next());
        if let (Some(value), Some(slot)) = (first, profile.slot_mut(field)) {
            *slot = Some(value);
            consumed.insert(field);
        }
    }

    let status = legacy
        .get_str("status")
        .and_then(|s| s.parse::<EntityStatus>().ok());
    let created = legacy.get_str("created").as_deref().and_then(parse_timestamp);
    let updated = legacy.get_str("updated").as_deref().and_then(parse_timestamp);
    for (key, parsed) in [
        ("status", status.is_some()),
        ("created", created.is_some()),
        ("updated", updated.is_some()),
    ] {
        if parsed {
            consumed.insert(key);
        }
    }

    // the id comes from the file name, so the display name may be any script
    let seed = NewEntity {
        name: slug.clone(),
        source: infer_source(&legacy),
        description,
        profile,
        aliases: aliases.unwrap_or_default(),
        tags: tags.unwrap_or_default(),
        links: links.unwrap_or_default(),
        valid_from: None,
    };
    let mut entity = Entity::create_at(kind, seed, MIGRATOR_ACTOR, at)?;
    entity.id.clone_from(&id);
    let name = infer_name(path, &legacy);
    if !name.trim().is_empty() {
        entity.name = name.trim().to_string();
    }
    entity.events.clear();
    entity.confidence = infer_confidence(&legacy);
    entity.created = created.unwrap_or(at);
    entity.updated = updated.unwrap_or(entity.created);
    if let Some(status) = status {
        entity.status = status;
    }
    entity.relationships = infer_relationships(&id, &legacy);

    let dropped_keys = carry_over(&legacy, &consumed, &mut entity.extra);
    for key in &dropped_keys {
        tracing::warn!("{}: legacy key '{key}' could not be carried over", path.display());
    }

    let options = EventOptions::default()
        .with_change(FieldChange::set("$schema", entity.schema_uri.clone().into()))
        .with_message(format!("Upgraded legacy record to {}", entity.schema_uri))
        .with_source(MIGRATION_SOURCE);
    let event = new_event(EventType::EntityCreate, MIGRATOR_ACTOR, options, at)?;
    helper.append(&mut entity, event, AppendOptions::silent())?;

    Ok(Some(Upgrade {
        record: EntityRecord::new(entity, legacy.body),
        type_quality: inferred.quality,
        dropped_keys,
    }))
}

/// Relationships implied by reference keys and by wiki-links anywhere in
/// the record.
///
/// Reference keys come first, then one `related-to` edge per distinct
/// wiki-link target.
fn infer_relationships(own_id: &str, legacy: &Record) -> Vec<Relationship> {
    let mut edges: Vec<Relationship> = Vec::new();
    for (key, kind, hint) in REFERENCE_EDGES {
        for raw in values(legacy, key).unwrap_or_default() {
            if let Some(target) = normalize_reference(&raw, hint) {
                push_edge(&mut edges, own_id, kind.clone(), target);
            }
        }
    }

    let mut texts: Vec<&str> = Vec::new();
    for value in legacy.metadata.values() {
        collect_strings(value, &mut texts);
    }
    texts.push(&legacy.body);

    for link in texts.into_iter().flat_map(extract_wiki_links) {
        if let Some(target) = normalize_reference(&link.target, None) {
            push_edge(&mut edges, own_id, RelationshipType::RelatedTo, target);
        }
    }
    edges
}

/// Append an edge unless it duplicates one already present or points back
/// at the record itself. An untyped target with the record's own slug
/// counts as a self reference.
fn push_edge(edges: &mut Vec<Relationship>, own_id: &str, kind: RelationshipType, target: NormalizedRef) {
    let is_self = target.id == own_id || (target.kind.is_none() && slug_of(&target.id) == slug_of(own_id));
    if is_self || edges.iter().any(|e| e.matches(&kind, &target.id)) {
        return;
    }
    edges.push(
        Relationship::new(kind, target.id)
            .with_confidence(target.quality.confidence())
            .with_source(MIGRATION_SOURCE),
    );
}

fn collect_strings<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
    match value {
        Value::String(s) => out.push(s),
        Value::Sequence(items) => items.iter().for_each(|v| collect_strings(v, out)),
        Value::Mapping(map) => map.values().for_each(|v| collect_strings(v, out)),
        Value::Tagged(tagged) => collect_strings(&tagged.value, out),
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

/// Copy unconsumed legacy keys into `extra`. Returns the keys that were
/// dropped because they could not be represented.
fn carry_over(
    legacy: &Record,
    consumed: &BTreeSet<&str>,
    extra: &mut BTreeMap<String, serde_json::Value>,
) -> Vec<String> {
    let mut dropped = Vec::new();
    for (key, value) in &legacy.metadata {
        let Some(key) = scalar_to_string(key) else {
            dropped.push(format!("{key:?}"));
            continue;
        };
        if consumed.contains(key.as_str()) {
            continue;
        }
        let target = if is_reserved(&key) {
            format!("{LEGACY_KEY_PREFIX}{}", key.trim_start_matches('$'))
        } else {
            key.clone()
        };
        match serde_json::to_value(value) {
            Ok(json) if !extra.contains_key(&target) => {
                extra.insert(target, json);
            }
            _ => dropped.push(key),
        }
    }
    dropped
}

fn is_reserved(key: &str) -> bool {
    key.starts_with('$') || RESERVED_KEYS.contains(&key) || Profile::FIELDS.contains(&key)
}

/// Scalar or list-of-scalars value of `key`.
fn values(legacy: &Record, key: &str) -> Option<Vec<String>> {
    match legacy.metadata.get(key)? {
        Value::Sequence(items) => Some(items.iter().filter_map(scalar_to_string).collect()),
        other => scalar_to_string(other).map(|s| vec![s]),
    }
}

/// Like [`values`], with comma-separated strings split apart.
fn split_list(legacy: &Record, key: &str) -> Option<Vec<String>> {
    values(legacy, key).map(|items| {
        items
            .iter()
            .flat_map(|item| item.split(','))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    })
}

/// A mapping of scalar values, or `None` if `key` is missing or shaped
/// differently.
fn string_map(legacy: &Record, key: &str) -> Option<BTreeMap<String, String>> {
    let Value::Mapping(map) = legacy.metadata.get(key)? else {
        return None;
    };
    map.iter()
        .map(|(k, v)| Some((scalar_to_string(k)?, scalar_to_string(v)?)))
        .collect()
}

/// RFC 3339, `YYYY-MM-DD HH:MM:SS`, or a bare date (midnight UTC).
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.and_utc())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN).and_utc())
        })
}
