use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::confidence::{Confidence, DecayPolicy, today};
use crate::entities::{Profile, Relationship};
use crate::enums::{EntityStatus, EntityType, EventType, OrphanReason, RelationshipType, Source};
use crate::errors::CoreError;
use crate::events::{ChangeEvent, EventOptions, FieldChange, new_event};
use crate::ids::{entity_id, entity_schema_uri, slug_of, slugify};
use crate::metadata::Metadata;

/// Prefix that marks structural (identity/version/temporal/quality/collection)
/// fields in records and in `FieldChange::field`.
pub const STRUCTURAL_PREFIX: char = '$';

/// A versioned, typed record of a tracked real-world object.
///
/// Structural fields serialize with the `$` prefix; content fields (`name`,
/// `description`, `links`, `metadata`, profile fields, and any unrecognized
/// keys carried over from older records) serialize without it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Entity {
    #[serde(rename = "$schema")]
    pub schema_uri: String,
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "$type")]
    pub kind: EntityType,
    #[serde(rename = "$version")]
    pub version: u32,
    #[serde(rename = "$created")]
    pub created: DateTime<Utc>,
    #[serde(rename = "$updated")]
    pub updated: DateTime<Utc>,
    #[serde(rename = "$valid_from", default, skip_serializing_if = "Option::is_none")]
    pub valid_from: Option<NaiveDate>,
    #[serde(rename = "$valid_to", default, skip_serializing_if = "Option::is_none")]
    pub valid_to: Option<NaiveDate>,
    #[serde(rename = "$confidence", default)]
    pub confidence: Confidence,
    #[serde(rename = "$source", default)]
    #[schemars(with = "String")]
    pub source: Source,
    #[serde(rename = "$last_verified", default, skip_serializing_if = "Option::is_none")]
    pub last_verified: Option<NaiveDate>,
    #[serde(rename = "$status", default)]
    pub status: EntityStatus,
    #[serde(rename = "$orphan_reason", default, skip_serializing_if = "Option::is_none")]
    pub orphan_reason: Option<OrphanReason>,
    #[serde(rename = "$relationships", default)]
    pub relationships: Vec<Relationship>,
    #[serde(rename = "$tags", default)]
    pub tags: Vec<String>,
    #[serde(rename = "$aliases", default)]
    pub aliases: Vec<String>,
    #[serde(rename = "$events", default)]
    pub events: Vec<ChangeEvent>,

    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub links: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
    #[serde(flatten)]
    pub profile: Profile,
    /// Content fields this layer does not model, kept verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Seed fields for constructing a new entity.
#[derive(Debug, Clone, Default)]
pub struct NewEntity {
    pub name: String,
    pub source: Source,
    pub description: Option<String>,
    pub profile: Profile,
    pub aliases: Vec<String>,
    pub tags: Vec<String>,
    pub links: BTreeMap<String, String>,
    pub valid_from: Option<NaiveDate>,
}

impl NewEntity {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

impl Entity {
    /// Construct a version-1 entity with a derived id and schema URI.
    ///
    /// Initial confidence is the reliability of the declared source. The
    /// `entity-create` event is recorded without bumping the version.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` for an empty name or profile fields
    /// that do not apply to `kind`.
    pub fn create(kind: EntityType, seed: NewEntity, actor: &str) -> Result<Self, CoreError> {
        Self::create_at(kind, seed, actor, Utc::now())
    }

    /// [`Entity::create`] with an explicit creation time.
    ///
    /// # Errors
    ///
    /// Same as [`Entity::create`].
    pub fn create_at(
        kind: EntityType,
        seed: NewEntity,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<Self, CoreError> {
        let name = seed.name.trim().to_string();
        if name.is_empty() {
            return Err(CoreError::Validation("entity name must not be empty".into()));
        }
        let allowed = Profile::fields_for(kind);
        if let Some(field) = seed.profile.populated().into_iter().find(|f| !allowed.contains(f)) {
            return Err(CoreError::Validation(format!(
                "field '{field}' does not apply to {kind} entities"
            )));
        }

        if slugify(&name).is_empty() {
            return Err(CoreError::Validation(format!(
                "entity name '{name}' does not produce a usable slug"
            )));
        }
        let id = entity_id(kind, &name);
        let mut entity = Self {
            schema_uri: entity_schema_uri(kind),
            id: id.clone(),
            kind,
            version: 1,
            created: at,
            updated: at,
            valid_from: seed.valid_from,
            valid_to: None,
            confidence: Confidence::new(seed.source.reliability()),
            source: seed.source,
            last_verified: None,
            status: EntityStatus::Active,
            orphan_reason: None,
            relationships: Vec::new(),
            tags: Vec::new(),
            aliases: Vec::new(),
            events: Vec::new(),
            name,
            description: seed.description,
            links: seed.links,
            metadata: Metadata::new(),
            profile: seed.profile,
            extra: BTreeMap::new(),
        };
        for alias in seed.aliases {
            entity.add_alias(&alias);
        }
        for tag in seed.tags {
            entity.add_tag(&tag);
        }

        let options = EventOptions::default()
            .with_change(FieldChange::set("$id", id.into()))
            .with_change(FieldChange::set("name", entity.name.clone().into()))
            .with_message(format!("Created {kind} entity"));
        entity
            .events
            .push(new_event(EventType::EntityCreate, actor, options, at)?);
        Ok(entity)
    }

    /// The slug part of the id.
    #[must_use]
    pub fn slug(&self) -> &str {
        slug_of(&self.id)
    }

    /// Assign a confidence, clamping into `[0, 1]`.
    pub fn set_confidence(&mut self, confidence: f64) {
        self.confidence = Confidence::new(confidence);
    }

    /// Relationships active on `as_of` (default today), in insertion order.
    #[must_use]
    pub fn get_active_relationships(&self, as_of: Option<NaiveDate>) -> Vec<&Relationship> {
        let as_of = as_of.unwrap_or_else(today);
        self.relationships.iter().filter(|r| r.is_active_on(as_of)).collect()
    }

    /// Relationships of one type, in insertion order.
    #[must_use]
    pub fn get_relationships_by_type(&self, kind: impl Into<RelationshipType>) -> Vec<&Relationship> {
        let kind = kind.into();
        self.relationships.iter().filter(|r| r.kind == kind).collect()
    }

    /// The most recently added relationship with this type and target that
    /// has not been ended, falling back to the most recent ended one.
    #[must_use]
    pub fn find_relationship(&self, kind: &RelationshipType, target: &str) -> Option<&Relationship> {
        self.find_relationship_index(kind, target)
            .map(|idx| &self.relationships[idx])
    }

    /// Index variant of [`Entity::find_relationship`].
    #[must_use]
    pub fn find_relationship_index(&self, kind: &RelationshipType, target: &str) -> Option<usize> {
        let matching = || {
            self.relationships
                .iter()
                .enumerate()
                .rev()
                .filter(|(_, r)| r.matches(kind, target))
        };
        matching()
            .find(|(_, r)| r.until.is_none())
            .or_else(|| matching().next())
            .map(|(idx, _)| idx)
    }

    /// Whether an open (no `until`) relationship of this type to `target`
    /// exists.
    #[must_use]
    pub fn has_open_relationship(&self, kind: &RelationshipType, target: &str) -> bool {
        self.relationships
            .iter()
            .any(|r| r.until.is_none() && r.matches(kind, target))
    }

    /// Relationships whose reference date is older than `threshold_days`.
    #[must_use]
    pub fn stale_relationships(&self, as_of: Option<NaiveDate>, threshold_days: Option<i64>) -> Vec<&Relationship> {
        self.relationships
            .iter()
            .filter(|r| r.is_stale(as_of, threshold_days))
            .collect()
    }

    /// Each relationship paired with its decayed confidence.
    #[must_use]
    pub fn decayed_relationships(
        &self,
        as_of: Option<NaiveDate>,
        policy: &DecayPolicy,
    ) -> Vec<(&Relationship, Confidence)> {
        self.relationships
            .iter()
            .map(|r| (r, r.compute_decayed_confidence(as_of, policy)))
            .collect()
    }

    /// Case-insensitive alias check.
    #[must_use]
    pub fn has_alias(&self, alias: &str) -> bool {
        self.aliases.iter().any(|a| a.eq_ignore_ascii_case(alias.trim()))
    }

    /// Add an alias unless an equal one (ignoring case) exists.
    pub fn add_alias(&mut self, alias: &str) -> bool {
        insert_unique(&mut self.aliases, alias)
    }

    /// Add a tag unless an equal one (ignoring case) exists.
    pub fn add_tag(&mut self, tag: &str) -> bool {
        insert_unique(&mut self.tags, tag)
    }

    /// No relationships at all (ended ones included).
    #[must_use]
    pub fn is_orphan(&self) -> bool {
        self.relationships.is_empty()
    }

    /// Set or clear a content field (or one of the caller-editable structural
    /// fields) and return its previous value.
    ///
    /// Supported: `name`, `description`, profile fields, `links.<key>`,
    /// `metadata.<key>`, `$valid_from`, `$valid_to`, `$last_verified`,
    /// `$orphan_reason`. Any other unprefixed name is stored verbatim in
    /// `extra`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` for a missing or empty name, a wrong
    /// value shape, a profile field that does not apply to this type, or a
    /// structural field that is managed by dedicated events.
    pub fn set_field(
        &mut self,
        field: &str,
        value: Option<serde_json::Value>,
    ) -> Result<Option<serde_json::Value>, CoreError> {
        if field.starts_with(STRUCTURAL_PREFIX) {
            return self.set_structural_field(field, value);
        }

        if field == "name" {
            let name = value
                .as_ref()
                .map(|v| expect_string(field, v))
                .transpose()?
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .ok_or_else(|| CoreError::Validation("entity name must not be empty".into()))?;
            return Ok(Some(std::mem::replace(&mut self.name, name).into()));
        }

        if field == "description" {
            let next = value.as_ref().map(|v| expect_string(field, v)).transpose()?;
            return Ok(std::mem::replace(&mut self.description, next).map(Into::into));
        }

        if let Some(key) = field.strip_prefix("links.") {
            return match value {
                Some(v) => Ok(self.links.insert(key.to_string(), expect_string(field, &v)?).map(Into::into)),
                None => Ok(self.links.remove(key).map(Into::into)),
            };
        }

        if let Some(key) = field.strip_prefix("metadata.") {
            return Ok(match value {
                Some(v) => self.metadata.insert(key, v),
                None => self.metadata.remove(key),
            });
        }

        if Profile::FIELDS.contains(&field) {
            if !Profile::fields_for(self.kind).contains(&field) {
                return Err(CoreError::Validation(format!(
                    "field '{field}' does not apply to {} entities",
                    self.kind
                )));
            }
            let next = value.as_ref().map(|v| expect_string(field, v)).transpose()?;
            let slot = self.profile.slot_mut(field).ok_or_else(|| {
                CoreError::Validation(format!("unknown profile field '{field}'"))
            })?;
            return Ok(std::mem::replace(slot, next).map(Into::into));
        }

        Ok(match value {
            Some(v) => self.extra.insert(field.to_string(), v),
            None => self.extra.remove(field),
        })
    }

    fn set_structural_field(
        &mut self,
        field: &str,
        value: Option<serde_json::Value>,
    ) -> Result<Option<serde_json::Value>, CoreError> {
        let slot = match field {
            "$valid_from" => &mut self.valid_from,
            "$valid_to" => &mut self.valid_to,
            "$last_verified" => &mut self.last_verified,
            "$orphan_reason" => {
                let next = value
                    .map(serde_json::from_value::<OrphanReason>)
                    .transpose()
                    .map_err(|e| CoreError::Validation(format!("invalid $orphan_reason: {e}")))?;
                let old = std::mem::replace(&mut self.orphan_reason, next);
                return Ok(old.map(|r| r.as_str().into()));
            }
            other => {
                return Err(CoreError::Validation(format!(
                    "structural field '{other}' cannot be set directly"
                )));
            }
        };
        let next = value.as_ref().map(|v| expect_date(field, v)).transpose()?;
        Ok(std::mem::replace(slot, next).map(|d| d.to_string().into()))
    }
}

fn insert_unique(values: &mut Vec<String>, value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() || values.iter().any(|v| v.eq_ignore_ascii_case(value)) {
        return false;
    }
    values.push(value.to_string());
    true
}

fn expect_string(field: &str, value: &serde_json::Value) -> Result<String, CoreError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| CoreError::Validation(format!("field '{field}' expects a string, got {value}")))
}

fn expect_date(field: &str, value: &serde_json::Value) -> Result<NaiveDate, CoreError> {
    let raw = expect_string(field, value)?;
    raw.parse::<NaiveDate>()
        .map_err(|e| CoreError::Validation(format!("field '{field}' expects YYYY-MM-DD: {e}")))
}
