//! The event write path.
//!
//! Every mutation goes through [`EventHelper::append`]: the event is pushed
//! onto the entity's log, the version and `updated` stamp are bumped (unless
//! suppressed), and the log is compacted. The mutation helpers below change
//! the entity and build the matching event in one step, so the log always
//! describes what was applied.

use chrono::{NaiveDate, Utc};

use brain_core::confidence::{Confidence, today};
use brain_core::entities::{Entity, Relationship};
use brain_core::enums::{EntityStatus, EventType, RelationshipType};
use brain_core::errors::CoreError;
use brain_core::events::{
    ChangeEvent, Compaction, DEFAULT_COMPACTION_THRESHOLD, EventOptions, FieldChange, compact_events,
    new_event,
};

use crate::archive::CompactionArchive;
use crate::error::StoreError;

/// Whether an append bumps `version` and refreshes `updated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendOptions {
    pub increment_version: bool,
    pub update_timestamp: bool,
}

impl Default for AppendOptions {
    fn default() -> Self {
        Self {
            increment_version: true,
            update_timestamp: true,
        }
    }
}

impl AppendOptions {
    /// Record the event without touching `version` or `updated`.
    #[must_use]
    pub const fn silent() -> Self {
        Self {
            increment_version: false,
            update_timestamp: false,
        }
    }
}

/// Builds, applies, and appends change events.
#[derive(Debug, Clone)]
pub struct EventHelper {
    threshold: usize,
    archive: CompactionArchive,
}

impl Default for EventHelper {
    fn default() -> Self {
        Self::new(DEFAULT_COMPACTION_THRESHOLD, CompactionArchive::disabled())
    }
}

impl EventHelper {
    #[must_use]
    pub const fn new(threshold: usize, archive: CompactionArchive) -> Self {
        Self { threshold, archive }
    }

    #[must_use]
    pub const fn threshold(&self) -> usize {
        self.threshold
    }

    #[must_use]
    pub const fn archive(&self) -> &CompactionArchive {
        &self.archive
    }

    /// Append an event, optionally bump version and timestamp, then compact.
    ///
    /// Events dropped by compaction are written to the archive first when it
    /// is enabled.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Core` if the compaction summary cannot be built,
    /// or `StoreError::Io` if archiving fails.
    pub fn append(
        &self,
        entity: &mut Entity,
        event: ChangeEvent,
        options: AppendOptions,
    ) -> Result<Option<Compaction>, StoreError> {
        let timestamp = event.timestamp;
        entity.events.push(event);
        if options.increment_version {
            entity.version = entity.version.saturating_add(1);
        }
        if options.update_timestamp {
            entity.updated = timestamp;
        }

        let compaction = compact_events(&mut entity.events, self.threshold)?;
        if let Some(ref done) = compaction {
            tracing::debug!(
                "compacted {} events on {} into one summary",
                done.dropped.len(),
                entity.id
            );
            self.archive.append(&entity.id, &done.dropped)?;
        }
        Ok(compaction)
    }

    /// Build an event stamped now and append it with default options.
    fn record(
        &self,
        entity: &mut Entity,
        kind: EventType,
        actor: &str,
        options: EventOptions,
    ) -> Result<ChangeEvent, StoreError> {
        let event = new_event(kind, actor, options, Utc::now())?;
        self.append(entity, event.clone(), AppendOptions::default())?;
        Ok(event)
    }

    /// Set or clear a content field. Returns `None` when the value is
    /// unchanged, in which case nothing is recorded.
    ///
    /// The event is `field-add` when the field was unset, `field-remove`
    /// when `value` is `None`, and `field-update` otherwise.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Core` for fields the entity rejects.
    pub fn update_field(
        &self,
        entity: &mut Entity,
        actor: &str,
        field: &str,
        value: Option<serde_json::Value>,
    ) -> Result<Option<ChangeEvent>, StoreError> {
        let old = entity.set_field(field, value.clone())?;
        if old == value {
            return Ok(None);
        }

        let (kind, change) = match (old, value) {
            (None, Some(value)) => (EventType::FieldAdd, FieldChange::set(field, value)),
            (old, Some(value)) => (EventType::FieldUpdate, FieldChange::update(field, old, value)),
            (old, None) => (EventType::FieldRemove, FieldChange::remove(field, old)),
        };
        let options = EventOptions::default().with_change(change);
        self.record(entity, kind, actor, options).map(Some)
    }

    /// Add a tag. Returns `None` if an equal tag (ignoring case) exists.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the event cannot be appended.
    pub fn add_tag(&self, entity: &mut Entity, actor: &str, tag: &str) -> Result<Option<ChangeEvent>, StoreError> {
        if !entity.add_tag(tag) {
            return Ok(None);
        }
        let options = EventOptions::default().with_change(FieldChange::append("$tags", tag.trim().into()));
        self.record(entity, EventType::FieldAdd, actor, options).map(Some)
    }

    /// Add an alias. Returns `None` if an equal alias (ignoring case) exists.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the event cannot be appended.
    pub fn add_alias(&self, entity: &mut Entity, actor: &str, alias: &str) -> Result<Option<ChangeEvent>, StoreError> {
        if !entity.add_alias(alias) {
            return Ok(None);
        }
        let options =
            EventOptions::default().with_change(FieldChange::append("$aliases", alias.trim().into()));
        self.record(entity, EventType::FieldAdd, actor, options).map(Some)
    }

    /// Add a relationship.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` if an open relationship with the same
    /// type and target already exists.
    pub fn add_relationship(
        &self,
        entity: &mut Entity,
        actor: &str,
        relationship: Relationship,
    ) -> Result<ChangeEvent, StoreError> {
        if entity.has_open_relationship(&relationship.kind, &relationship.target) {
            return Err(CoreError::Validation(format!(
                "{} already has an open {} relationship to {}",
                entity.id, relationship.kind, relationship.target
            ))
            .into());
        }

        let value = serde_json::to_value(&relationship).map_err(|e| StoreError::Serialize(e.to_string()))?;
        entity.relationships.push(relationship);
        let options = EventOptions::default().with_change(FieldChange::append("$relationships", value));
        self.record(entity, EventType::RelationshipAdd, actor, options)
    }

    /// End an open relationship by setting `until` (default today). The
    /// relationship stays on the record.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no open relationship matches.
    pub fn end_relationship(
        &self,
        entity: &mut Entity,
        actor: &str,
        kind: &RelationshipType,
        target: &str,
        until: Option<NaiveDate>,
    ) -> Result<ChangeEvent, StoreError> {
        let idx = entity
            .relationships
            .iter()
            .rposition(|r| r.until.is_none() && r.matches(kind, target))
            .ok_or_else(|| StoreError::NotFound(format!("open {kind} relationship to {target}")))?;

        let until = until.unwrap_or_else(today);
        entity.relationships[idx].until = Some(until);
        let options = EventOptions::default().with_change(FieldChange::set(
            format!("$relationships.{idx}.until"),
            until.to_string().into(),
        ));
        self.record(entity, EventType::RelationshipRemove, actor, options)
    }

    /// Assign a new confidence to a relationship, clamped into `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no relationship matches.
    pub fn update_relationship_confidence(
        &self,
        entity: &mut Entity,
        actor: &str,
        kind: &RelationshipType,
        target: &str,
        confidence: f64,
    ) -> Result<ChangeEvent, StoreError> {
        let idx = relationship_index(entity, kind, target)?;
        let relationship = &mut entity.relationships[idx];
        let old = relationship.confidence;
        relationship.set_confidence(confidence);
        let new = relationship.confidence;

        let options = EventOptions::default().with_change(FieldChange::update(
            format!("$relationships.{idx}.confidence"),
            Some(old.value().into()),
            new.value().into(),
        ));
        self.record(entity, EventType::RelationshipUpdate, actor, options)
    }

    /// Mark the entity, or one of its relationships, as verified on `on`
    /// (default today).
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if a relationship was named and none
    /// matches.
    pub fn verify(
        &self,
        entity: &mut Entity,
        actor: &str,
        relationship: Option<(&RelationshipType, &str)>,
        on: Option<NaiveDate>,
    ) -> Result<ChangeEvent, StoreError> {
        let on = on.unwrap_or_else(today);
        let (field, old) = match relationship {
            Some((kind, target)) => {
                let idx = relationship_index(entity, kind, target)?;
                let slot = &mut entity.relationships[idx].last_verified;
                (format!("$relationships.{idx}.last_verified"), slot.replace(on))
            }
            None => ("$last_verified".to_string(), entity.last_verified.replace(on)),
        };

        let options = EventOptions::default().with_change(FieldChange::update(
            field,
            old.map(|d| d.to_string().into()),
            on.to_string().into(),
        ));
        self.record(entity, EventType::Verification, actor, options)
    }

    /// Change lifecycle status. Returns `None` if the status is unchanged.
    ///
    /// Moving to `archived` records `entity-archive`, leaving `archived`
    /// records `entity-restore`, anything else `status-change`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the event cannot be appended.
    pub fn change_status(
        &self,
        entity: &mut Entity,
        actor: &str,
        status: EntityStatus,
    ) -> Result<Option<ChangeEvent>, StoreError> {
        let old = entity.status;
        if old == status {
            return Ok(None);
        }
        let kind = match (old, status) {
            (_, EntityStatus::Archived) => EventType::EntityArchive,
            (EntityStatus::Archived, _) => EventType::EntityRestore,
            _ => EventType::StatusChange,
        };
        entity.status = status;
        let options = EventOptions::default().with_change(FieldChange::update(
            "$status",
            Some(old.as_str().into()),
            status.as_str().into(),
        ));
        self.record(entity, kind, actor, options).map(Some)
    }

    /// Assign entity confidence, clamped into `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the event cannot be appended.
    pub fn set_confidence(&self, entity: &mut Entity, actor: &str, confidence: f64) -> Result<ChangeEvent, StoreError> {
        let old = entity.confidence;
        entity.confidence = Confidence::new(confidence);
        let options = EventOptions::default().with_change(FieldChange::update(
            "$confidence",
            Some(old.value().into()),
            entity.confidence.value().into(),
        ));
        self.record(entity, EventType::ConfidenceUpdate, actor, options)
    }
}

fn relationship_index(entity: &Entity, kind: &RelationshipType, target: &str) -> Result<usize, StoreError> {
    entity
        .find_relationship_index(kind, target)
        .ok_or_else(|| StoreError::NotFound(format!("{kind} relationship to {target}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use brain_core::entities::NewEntity;
    use brain_core::enums::{EntityType, FieldOperation, Source};
    use pretty_assertions::assert_eq;

    fn jane() -> Entity {
        Entity::create(
            EntityType::Person,
            NewEntity {
                source: Source::Manual,
                ..NewEntity::named("Jane Smith")
            },
            "tester",
        )
        .unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn append_bumps_version_and_timestamp() {
        let helper = EventHelper::default();
        let mut entity = jane();
        let event = new_event(EventType::FieldUpdate, "a", EventOptions::default(), Utc::now()).unwrap();
        let stamp = event.timestamp;

        helper.append(&mut entity, event, AppendOptions::default()).unwrap();
        assert_eq!(entity.version, 2);
        assert_eq!(entity.updated, stamp);
        assert_eq!(entity.events.len(), 2);
    }

    #[test]
    fn silent_append_keeps_version() {
        let helper = EventHelper::default();
        let mut entity = jane();
        let before = entity.updated;
        let event = new_event(EventType::Verification, "a", EventOptions::default(), Utc::now()).unwrap();

        helper.append(&mut entity, event, AppendOptions::silent()).unwrap();
        assert_eq!(entity.version, 1);
        assert_eq!(entity.updated, before);
        assert_eq!(entity.events.len(), 2);
    }

    #[test]
    fn update_field_picks_event_type() {
        let helper = EventHelper::default();
        let mut entity = jane();

        let added = helper
            .update_field(&mut entity, "a", "role", Some("Engineer".into()))
            .unwrap()
            .unwrap();
        assert_eq!(added.kind, EventType::FieldAdd);

        let updated = helper
            .update_field(&mut entity, "a", "role", Some("Lead".into()))
            .unwrap()
            .unwrap();
        assert_eq!(updated.kind, EventType::FieldUpdate);
        assert_eq!(updated.changes[0].old_value, Some("Engineer".into()));
        assert_eq!(updated.changes[0].operation, FieldOperation::Update);

        let removed = helper.update_field(&mut entity, "a", "role", None).unwrap().unwrap();
        assert_eq!(removed.kind, EventType::FieldRemove);
        assert_eq!(entity.profile.role, None);

        assert!(helper.update_field(&mut entity, "a", "role", None).unwrap().is_none());
        assert_eq!(entity.version, 4);
    }

    #[test]
    fn rejected_field_records_nothing() {
        let helper = EventHelper::default();
        let mut entity = jane();
        assert!(helper.update_field(&mut entity, "a", "$version", Some(5.into())).is_err());
        assert_eq!(entity.version, 1);
        assert_eq!(entity.events.len(), 1);
    }

    #[test]
    fn relationship_lifecycle() {
        let helper = EventHelper::default();
        let mut entity = jane();
        let rel = Relationship::new("member-of", "entity/team/platform").with_since(date(2025, 1, 1));

        helper.add_relationship(&mut entity, "a", rel.clone()).unwrap();
        assert!(helper.add_relationship(&mut entity, "a", rel).is_err());

        let event = helper
            .update_relationship_confidence(&mut entity, "a", &RelationshipType::MemberOf, "entity/team/platform", 1.8)
            .unwrap();
        assert_eq!(event.kind, EventType::RelationshipUpdate);
        assert_eq!(entity.relationships[0].confidence, Confidence::FULL);

        let event = helper
            .end_relationship(
                &mut entity,
                "a",
                &RelationshipType::MemberOf,
                "entity/team/platform",
                Some(date(2026, 3, 31)),
            )
            .unwrap();
        assert_eq!(event.kind, EventType::RelationshipRemove);
        assert_eq!(entity.relationships.len(), 1);
        assert_eq!(entity.relationships[0].until, Some(date(2026, 3, 31)));
        assert!(entity.get_active_relationships(Some(date(2026, 4, 1))).is_empty());

        assert!(matches!(
            helper.end_relationship(&mut entity, "a", &RelationshipType::MemberOf, "entity/team/platform", None),
            Err(StoreError::NotFound(_))
        ));
        assert_eq!(entity.version, 4);
    }

    #[test]
    fn verify_entity_and_relationship() {
        let helper = EventHelper::default();
        let mut entity = jane();
        helper
            .add_relationship(&mut entity, "a", Relationship::new("reports-to", "entity/person/bob"))
            .unwrap();

        helper.verify(&mut entity, "a", None, Some(date(2026, 5, 1))).unwrap();
        assert_eq!(entity.last_verified, Some(date(2026, 5, 1)));

        let event = helper
            .verify(
                &mut entity,
                "a",
                Some((&RelationshipType::ReportsTo, "entity/person/bob")),
                Some(date(2026, 5, 2)),
            )
            .unwrap();
        assert_eq!(event.kind, EventType::Verification);
        assert_eq!(event.changes[0].field, "$relationships.0.last_verified");
        assert_eq!(entity.relationships[0].last_verified, Some(date(2026, 5, 2)));
    }

    #[test]
    fn status_transitions() {
        let helper = EventHelper::default();
        let mut entity = jane();

        let e = helper.change_status(&mut entity, "a", EntityStatus::Inactive).unwrap().unwrap();
        assert_eq!(e.kind, EventType::StatusChange);
        let e = helper.change_status(&mut entity, "a", EntityStatus::Archived).unwrap().unwrap();
        assert_eq!(e.kind, EventType::EntityArchive);
        let e = helper.change_status(&mut entity, "a", EntityStatus::Active).unwrap().unwrap();
        assert_eq!(e.kind, EventType::EntityRestore);
        assert!(helper.change_status(&mut entity, "a", EntityStatus::Active).unwrap().is_none());
    }

    #[test]
    fn confidence_is_clamped() {
        let helper = EventHelper::default();
        let mut entity = jane();
        let event = helper.set_confidence(&mut entity, "a", -4.0).unwrap();
        assert_eq!(entity.confidence, Confidence::ZERO);
        assert_eq!(event.changes[0].value, Some(0.0.into()));
    }

    #[test]
    fn tags_and_aliases_dedupe() {
        let helper = EventHelper::default();
        let mut entity = jane();
        assert!(helper.add_tag(&mut entity, "a", "infra").unwrap().is_some());
        assert!(helper.add_tag(&mut entity, "a", "INFRA").unwrap().is_none());
        assert!(helper.add_alias(&mut entity, "a", "JS").unwrap().is_some());
        assert!(helper.add_alias(&mut entity, "a", "js").unwrap().is_none());
        assert_eq!(entity.version, 3);
    }

    #[test]
    fn compaction_archives_dropped_events() {
        let dir = tempfile::tempdir().unwrap();
        let helper = EventHelper::new(4, CompactionArchive::new(dir.path().to_path_buf()));
        let mut entity = jane();
        for i in 0..6 {
            helper.set_confidence(&mut entity, "a", f64::from(i) / 10.0).unwrap();
        }

        assert_eq!(entity.events.len(), 4);
        assert_eq!(entity.events[0].kind, EventType::EntityCreate);
        assert_eq!(entity.events[1].kind, EventType::CompactedSummary);
        assert_eq!(entity.version, 7);

        // first pass drops two updates; each later pass drops the previous
        // summary plus the oldest kept update
        let archived = helper.archive().read(&entity.id).unwrap();
        assert_eq!(archived.len(), 6);
        assert_eq!(archived[2].kind, EventType::CompactedSummary);
    }
}
