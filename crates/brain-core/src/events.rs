//! Change events and event-log compaction.
//!
//! Every mutation of an entity is recorded as a `ChangeEvent` appended to the
//! entity's own `$events` list. Events are never edited after they are
//! appended. To bound record size, `compact_events` replaces the middle of a
//! long log with a single synthesized `compacted-summary` event, keeping the
//! creation event and the most recent history verbatim.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{EventType, FieldOperation};
use crate::errors::CoreError;
use crate::ids::generate_event_id;

/// Default maximum number of events kept on an entity record.
pub const DEFAULT_COMPACTION_THRESHOLD: usize = 10;

/// Smallest usable threshold: the creation event plus one summary.
pub const MIN_COMPACTION_THRESHOLD: usize = 2;

/// Actor recorded on summaries produced by compaction.
pub const COMPACTION_ACTOR: &str = "system:compaction";

/// A single field-level change inside an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FieldChange {
    /// Dotted field path. Structural fields carry the `$` prefix.
    pub field: String,
    pub operation: FieldOperation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<serde_json::Value>,
}

impl FieldChange {
    #[must_use]
    pub fn new(
        field: impl Into<String>,
        operation: FieldOperation,
        value: Option<serde_json::Value>,
        old_value: Option<serde_json::Value>,
    ) -> Self {
        Self {
            field: field.into(),
            operation,
            value,
            old_value,
        }
    }

    #[must_use]
    pub fn set(field: impl Into<String>, value: serde_json::Value) -> Self {
        Self::new(field, FieldOperation::Set, Some(value), None)
    }

    #[must_use]
    pub fn update(
        field: impl Into<String>,
        old_value: Option<serde_json::Value>,
        value: serde_json::Value,
    ) -> Self {
        Self::new(field, FieldOperation::Update, Some(value), old_value)
    }

    #[must_use]
    pub fn append(field: impl Into<String>, value: serde_json::Value) -> Self {
        Self::new(field, FieldOperation::Append, Some(value), None)
    }

    #[must_use]
    pub fn remove(field: impl Into<String>, old_value: Option<serde_json::Value>) -> Self {
        Self::new(field, FieldOperation::Remove, None, old_value)
    }
}

/// An immutable record of one change to an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ChangeEvent {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: EventType,
    pub actor: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<FieldChange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Optional parts of a new event.
#[derive(Debug, Clone, Default)]
pub struct EventOptions {
    pub changes: Vec<FieldChange>,
    pub message: Option<String>,
    pub source: Option<String>,
    pub correlation_id: Option<String>,
}

impl EventOptions {
    #[must_use]
    pub fn with_change(mut self, change: FieldChange) -> Self {
        self.changes.push(change);
        self
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    #[must_use]
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }
}

/// Build a new event stamped with the current time.
///
/// # Errors
///
/// Returns `CoreError::InvalidEventType` if `kind` is not one of the caller
/// event types, or `CoreError::Entropy` if no event id could be generated.
pub fn create_event(kind: &str, actor: &str, options: EventOptions) -> Result<ChangeEvent, CoreError> {
    create_event_at(kind, actor, options, Utc::now())
}

/// Build a new event stamped with an explicit time.
///
/// # Errors
///
/// Same as [`create_event`].
pub fn create_event_at(
    kind: &str,
    actor: &str,
    options: EventOptions,
    at: DateTime<Utc>,
) -> Result<ChangeEvent, CoreError> {
    let kind: EventType = kind.parse()?;
    new_event(kind, actor, options, at)
}

/// Build an event from an already-typed kind. The reserved summary type is
/// still rejected.
///
/// # Errors
///
/// Same as [`create_event`].
pub fn new_event(
    kind: EventType,
    actor: &str,
    options: EventOptions,
    at: DateTime<Utc>,
) -> Result<ChangeEvent, CoreError> {
    if kind == EventType::CompactedSummary {
        return Err(CoreError::InvalidEventType(kind.as_str().to_string()));
    }
    Ok(ChangeEvent {
        event_id: generate_event_id(at)?,
        timestamp: at,
        kind,
        actor: actor.to_string(),
        changes: options.changes,
        correlation_id: options.correlation_id,
        source: options.source,
        message: options.message,
    })
}

/// Result of a compaction pass that actually removed events.
#[derive(Debug, Clone, PartialEq)]
pub struct Compaction {
    /// Events removed from the log, oldest first.
    pub dropped: Vec<ChangeEvent>,
    /// The summary event inserted in their place.
    pub summary: ChangeEvent,
}

/// Compact an event log in place.
///
/// With `len <= threshold` nothing happens and `Ok(None)` is returned.
/// Otherwise the log becomes `[first, summary, last threshold-2 events]`,
/// exactly `threshold` long. Thresholds below 2 are treated as 2.
///
/// # Errors
///
/// Returns `CoreError::Entropy` if the summary's event id cannot be generated.
pub fn compact_events(
    events: &mut Vec<ChangeEvent>,
    threshold: usize,
) -> Result<Option<Compaction>, CoreError> {
    let threshold = threshold.max(MIN_COMPACTION_THRESHOLD);
    if events.len() <= threshold {
        return Ok(None);
    }

    let keep_recent = threshold - 2;
    let middle_end = events.len() - keep_recent;
    let dropped: Vec<ChangeEvent> = events.drain(1..middle_end).collect();
    let summary = summarize(&dropped)?;
    events.insert(1, summary.clone());

    Ok(Some(Compaction { dropped, summary }))
}

/// Synthesize the summary event for a dropped span. `dropped` is never empty.
fn summarize(dropped: &[ChangeEvent]) -> Result<ChangeEvent, CoreError> {
    let first = dropped.first().map(|e| e.timestamp).unwrap_or_default();
    let last = dropped.last().map_or(first, |e| e.timestamp);

    let fields: BTreeSet<&str> = dropped
        .iter()
        .flat_map(|e| e.changes.iter().map(|c| c.field.as_str()))
        .collect();
    let actors: BTreeSet<&str> = dropped.iter().map(|e| e.actor.as_str()).collect();

    let message = format!(
        "Compacted {} events ({}..{}); fields: [{}]; actors: [{}]",
        dropped.len(),
        first.to_rfc3339(),
        last.to_rfc3339(),
        fields.into_iter().collect::<Vec<_>>().join(", "),
        actors.into_iter().collect::<Vec<_>>().join(", "),
    );

    Ok(ChangeEvent {
        event_id: generate_event_id(last)?,
        timestamp: last,
        kind: EventType::CompactedSummary,
        actor: COMPACTION_ACTOR.to_string(),
        changes: Vec::new(),
        correlation_id: None,
        source: None,
        message: Some(message),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, minute, 0).unwrap()
    }

    fn log(len: usize) -> Vec<ChangeEvent> {
        (0..len)
            .map(|i| {
                let kind = if i == 0 { "entity-create" } else { "field-update" };
                let actor = if i % 2 == 0 { "alice" } else { "bob" };
                let options =
                    EventOptions::default().with_change(FieldChange::set(format!("f{}", i % 3), i.into()));
                #[allow(clippy::cast_possible_truncation)]
                create_event_at(kind, actor, options, at(i as u32)).unwrap()
            })
            .collect()
    }

    #[test]
    fn create_event_rejects_unknown_type() {
        let err = create_event("teleport", "alice", EventOptions::default()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidEventType(t) if t == "teleport"));
    }

    #[test]
    fn create_event_rejects_reserved_summary() {
        let err = create_event("compacted-summary", "alice", EventOptions::default()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidEventType(_)));
        let err = new_event(EventType::CompactedSummary, "a", EventOptions::default(), at(0)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidEventType(_)));
    }

    #[test]
    fn serialized_event_omits_unset_optionals() {
        let event = create_event("verification", "alice", EventOptions::default()).unwrap();
        let json = serde_json::to_value(&event).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.get("type").unwrap(), "verification");
        for key in ["changes", "correlation_id", "source", "message"] {
            assert!(!obj.contains_key(key), "unexpected key {key}");
        }
        assert!(!json.to_string().contains("null"));
    }

    #[test]
    fn field_change_omits_missing_values() {
        let json = serde_json::to_value(FieldChange::remove("tags", None)).unwrap();
        assert_eq!(json, serde_json::json!({"field": "tags", "operation": "remove"}));
    }

    #[test]
    fn compaction_is_noop_at_or_below_threshold() {
        for len in [0, 1, 5, 10] {
            let mut events = log(len);
            let before = events.clone();
            assert!(compact_events(&mut events, 10).unwrap().is_none());
            assert_eq!(events, before);
        }
    }

    #[test]
    fn compaction_keeps_first_summary_and_recent() {
        for len in [11, 12, 25, 100] {
            let original = log(len);
            let mut events = original.clone();
            let outcome = compact_events(&mut events, 10).unwrap().unwrap();

            assert_eq!(events.len(), 10);
            assert_eq!(events[0], original[0]);
            assert_eq!(&events[2..], &original[len - 8..]);
            assert_eq!(events[1].kind, EventType::CompactedSummary);
            assert_eq!(outcome.dropped.len(), len - 9);
            assert_eq!(outcome.dropped[..], original[1..len - 8]);
        }
    }

    #[test]
    fn summary_message_describes_span() {
        let original = log(12);
        let mut events = original.clone();
        let outcome = compact_events(&mut events, 10).unwrap().unwrap();
        let message = outcome.summary.message.unwrap();

        assert!(message.starts_with("Compacted 3 events"));
        assert!(message.contains(&original[1].timestamp.to_rfc3339()));
        assert!(message.contains(&original[3].timestamp.to_rfc3339()));
        assert!(message.contains("fields: [f0, f1, f2]"));
        assert!(message.contains("actors: [alice, bob]"));
        assert_eq!(outcome.summary.actor, COMPACTION_ACTOR);
        assert_eq!(outcome.summary.timestamp, original[3].timestamp);
    }

    #[test]
    fn tiny_threshold_is_raised_to_minimum() {
        let mut events = log(5);
        compact_events(&mut events, 0).unwrap();
        assert_eq!(events.len(), MIN_COMPACTION_THRESHOLD);
        assert_eq!(events[1].kind, EventType::CompactedSummary);
    }

    #[test]
    fn recompaction_stays_bounded() {
        let mut events = log(11);
        compact_events(&mut events, 10).unwrap();
        events.extend(log(6).into_iter().skip(1));
        compact_events(&mut events, 10).unwrap();
        assert_eq!(events.len(), 10);
        assert_eq!(events[0].kind, EventType::EntityCreate);
    }
}
