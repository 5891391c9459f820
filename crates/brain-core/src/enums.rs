//! Entity types, statuses, event types, relationship types, and sources.
//!
//! Closed enumerations use `kebab-case` serialization. Open enumerations
//! (`RelationshipType`, `Source`) carry a closed set of well-known variants plus
//! a `Custom` arm, so exhaustive matching stays safe while free-form values
//! written by other tools survive a roundtrip unchanged.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::CoreError;

// ---------------------------------------------------------------------------
// EntityType
// ---------------------------------------------------------------------------

/// Kind of real-world object an entity tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum EntityType {
    Person,
    Team,
    Squad,
    Project,
    Domain,
    Experiment,
    System,
    Brand,
}

impl EntityType {
    pub const ALL: [Self; 8] = [
        Self::Person,
        Self::Team,
        Self::Squad,
        Self::Project,
        Self::Domain,
        Self::Experiment,
        Self::System,
        Self::Brand,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Team => "team",
            Self::Squad => "squad",
            Self::Project => "project",
            Self::Domain => "domain",
            Self::Experiment => "experiment",
            Self::System => "system",
            Self::Brand => "brand",
        }
    }

    /// Directory name used for records of this type inside the store root.
    #[must_use]
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Person => "people",
            Self::Team => "teams",
            Self::Squad => "squads",
            Self::Project => "projects",
            Self::Domain => "domains",
            Self::Experiment => "experiments",
            Self::System => "systems",
            Self::Brand => "brands",
        }
    }

    /// Map a directory name (singular or plural) to an entity type.
    #[must_use]
    pub fn from_dir_name(name: &str) -> Option<Self> {
        let lowered = name.to_ascii_lowercase();
        match lowered.as_str() {
            "people" | "person" | "persons" => Some(Self::Person),
            "teams" | "team" => Some(Self::Team),
            "squads" | "squad" => Some(Self::Squad),
            "projects" | "project" => Some(Self::Project),
            "domains" | "domain" => Some(Self::Domain),
            "experiments" | "experiment" => Some(Self::Experiment),
            "systems" | "system" => Some(Self::System),
            "brands" | "brand" => Some(Self::Brand),
            _ => None,
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| CoreError::Validation(format!("unknown entity type '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// EntityStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum EntityStatus {
    #[default]
    Active,
    Inactive,
    Archived,
    Pending,
}

impl EntityStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Archived => "archived",
            Self::Pending => "pending",
        }
    }
}

impl fmt::Display for EntityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "archived" => Ok(Self::Archived),
            "pending" => Ok(Self::Pending),
            other => Err(CoreError::Validation(format!("unknown status '{other}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// OrphanReason
// ---------------------------------------------------------------------------

/// Why an entity has no relationships. Maintained by callers, not enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum OrphanReason {
    PendingEnrichment,
    NoExternalData,
    Standalone,
    EnrichmentFailed,
}

impl OrphanReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PendingEnrichment => "pending-enrichment",
            Self::NoExternalData => "no-external-data",
            Self::Standalone => "standalone",
            Self::EnrichmentFailed => "enrichment-failed",
        }
    }
}

impl fmt::Display for OrphanReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// EventType
// ---------------------------------------------------------------------------

/// Kind of change recorded by a `ChangeEvent`.
///
/// `CompactedSummary` is reserved for events synthesized by compaction and is
/// rejected by `create_event`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum EventType {
    FieldUpdate,
    FieldAdd,
    FieldRemove,
    RelationshipAdd,
    RelationshipRemove,
    RelationshipUpdate,
    StatusChange,
    EntityCreate,
    EntityArchive,
    EntityRestore,
    ConfidenceUpdate,
    Verification,
    CompactedSummary,
}

impl EventType {
    /// Event types a caller may construct.
    pub const CALLER_TYPES: [Self; 12] = [
        Self::FieldUpdate,
        Self::FieldAdd,
        Self::FieldRemove,
        Self::RelationshipAdd,
        Self::RelationshipRemove,
        Self::RelationshipUpdate,
        Self::StatusChange,
        Self::EntityCreate,
        Self::EntityArchive,
        Self::EntityRestore,
        Self::ConfidenceUpdate,
        Self::Verification,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FieldUpdate => "field-update",
            Self::FieldAdd => "field-add",
            Self::FieldRemove => "field-remove",
            Self::RelationshipAdd => "relationship-add",
            Self::RelationshipRemove => "relationship-remove",
            Self::RelationshipUpdate => "relationship-update",
            Self::StatusChange => "status-change",
            Self::EntityCreate => "entity-create",
            Self::EntityArchive => "entity-archive",
            Self::EntityRestore => "entity-restore",
            Self::ConfidenceUpdate => "confidence-update",
            Self::Verification => "verification",
            Self::CompactedSummary => "compacted-summary",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = CoreError;

    /// Parse a caller-supplied event type. The compaction summary type is not
    /// accepted here.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::CALLER_TYPES
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CoreError::InvalidEventType(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// FieldOperation
// ---------------------------------------------------------------------------

/// Operation applied to a single field inside a `FieldChange`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum FieldOperation {
    Set,
    Append,
    Remove,
    Update,
}

impl FieldOperation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Set => "set",
            Self::Append => "append",
            Self::Remove => "remove",
            Self::Update => "update",
        }
    }
}

impl fmt::Display for FieldOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldOperation {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "set" => Ok(Self::Set),
            "append" => Ok(Self::Append),
            "remove" => Ok(Self::Remove),
            "update" => Ok(Self::Update),
            other => Err(CoreError::Validation(format!("unknown field operation '{other}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// RelationshipType (open)
// ---------------------------------------------------------------------------

/// Type of a directed edge between two entities.
///
/// Well-known types are matched after trimming, lowercasing, and mapping `_`
/// to `-`. Anything else is kept verbatim in `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RelationshipType {
    ReportsTo,
    Manages,
    Owns,
    OwnedBy,
    MemberOf,
    Leads,
    DependsOn,
    Blocks,
    PartOf,
    ParentOf,
    ChildOf,
    RelatedTo,
    Custom(String),
}

impl RelationshipType {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::ReportsTo => "reports-to",
            Self::Manages => "manages",
            Self::Owns => "owns",
            Self::OwnedBy => "owned-by",
            Self::MemberOf => "member-of",
            Self::Leads => "leads",
            Self::DependsOn => "depends-on",
            Self::Blocks => "blocks",
            Self::PartOf => "part-of",
            Self::ParentOf => "parent-of",
            Self::ChildOf => "child-of",
            Self::RelatedTo => "related-to",
            Self::Custom(s) => s,
        }
    }

    /// Inverse edge type, for the fixed pairs. `None` for everything else.
    #[must_use]
    pub fn inverse(&self) -> Option<Self> {
        match self {
            Self::ReportsTo => Some(Self::Manages),
            Self::Manages => Some(Self::ReportsTo),
            Self::Owns => Some(Self::OwnedBy),
            Self::OwnedBy => Some(Self::Owns),
            Self::ParentOf => Some(Self::ChildOf),
            Self::ChildOf => Some(Self::ParentOf),
            Self::Blocks => Some(Self::DependsOn),
            Self::DependsOn => Some(Self::Blocks),
            Self::Leads => Some(Self::MemberOf),
            Self::MemberOf => Some(Self::Leads),
            Self::PartOf | Self::RelatedTo | Self::Custom(_) => None,
        }
    }

    #[must_use]
    pub const fn is_custom(&self) -> bool {
        matches!(self, Self::Custom(_))
    }
}

/// Look up the inverse of a relationship type given as a string.
#[must_use]
pub fn get_inverse_type(kind: &str) -> Option<RelationshipType> {
    RelationshipType::from(kind).inverse()
}

impl From<&str> for RelationshipType {
    fn from(value: &str) -> Self {
        let trimmed = value.trim();
        match trimmed.to_ascii_lowercase().replace('_', "-").as_str() {
            "reports-to" => Self::ReportsTo,
            "manages" => Self::Manages,
            "owns" => Self::Owns,
            "owned-by" => Self::OwnedBy,
            "member-of" => Self::MemberOf,
            "leads" => Self::Leads,
            "depends-on" => Self::DependsOn,
            "blocks" => Self::Blocks,
            "part-of" => Self::PartOf,
            "parent-of" => Self::ParentOf,
            "child-of" => Self::ChildOf,
            "related-to" => Self::RelatedTo,
            _ => Self::Custom(trimmed.to_string()),
        }
    }
}

impl From<String> for RelationshipType {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RelationshipType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RelationshipType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from)
    }
}

// ---------------------------------------------------------------------------
// Source (open)
// ---------------------------------------------------------------------------

/// Provenance tag for an entity or relationship.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Source {
    HrSystem,
    IssueTracker,
    CodeHost,
    DocsPlatform,
    Chat,
    Manual,
    AutoGenerated,
    Migration,
    #[default]
    Unknown,
    Custom(String),
}

impl Source {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::HrSystem => "hr-system",
            Self::IssueTracker => "issue-tracker",
            Self::CodeHost => "code-host",
            Self::DocsPlatform => "docs-platform",
            Self::Chat => "chat",
            Self::Manual => "manual",
            Self::AutoGenerated => "auto-generated",
            Self::Migration => "migration",
            Self::Unknown => "unknown",
            Self::Custom(s) => s,
        }
    }

    /// Reliability weight of the source, used by the entity confidence formula.
    #[must_use]
    pub const fn reliability(&self) -> f64 {
        match self {
            Self::HrSystem => 0.95,
            Self::IssueTracker | Self::CodeHost => 0.85,
            Self::DocsPlatform => 0.80,
            Self::Chat => 0.75,
            Self::Manual => 0.70,
            Self::Migration | Self::AutoGenerated | Self::Unknown | Self::Custom(_) => 0.50,
        }
    }
}

impl From<&str> for Source {
    fn from(value: &str) -> Self {
        let trimmed = value.trim();
        match trimmed.to_ascii_lowercase().replace('_', "-").as_str() {
            "hr-system" => Self::HrSystem,
            "issue-tracker" => Self::IssueTracker,
            "code-host" => Self::CodeHost,
            "docs-platform" => Self::DocsPlatform,
            "chat" => Self::Chat,
            "manual" => Self::Manual,
            "auto-generated" => Self::AutoGenerated,
            "migration" => Self::Migration,
            "" | "unknown" => Self::Unknown,
            _ => Self::Custom(trimmed.to_string()),
        }
    }
}

impl From<String> for Source {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Source {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Source {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    macro_rules! test_serde_roundtrip {
        ($name:ident, $ty:ty, $variant:expr, $expected:expr) => {
            #[test]
            fn $name() {
                let val: $ty = $variant;
                let json = serde_json::to_string(&val).unwrap();
                assert_eq!(json, format!("\"{}\"", $expected));
                let recovered: $ty = serde_json::from_str(&json).unwrap();
                assert_eq!(recovered, val);
                assert_eq!(val.as_str(), $expected);
            }
        };
    }

    test_serde_roundtrip!(entity_type_person, EntityType, EntityType::Person, "person");
    test_serde_roundtrip!(status_archived, EntityStatus, EntityStatus::Archived, "archived");
    test_serde_roundtrip!(
        orphan_pending,
        OrphanReason,
        OrphanReason::PendingEnrichment,
        "pending-enrichment"
    );
    test_serde_roundtrip!(event_field_update, EventType, EventType::FieldUpdate, "field-update");
    test_serde_roundtrip!(
        event_summary,
        EventType,
        EventType::CompactedSummary,
        "compacted-summary"
    );
    test_serde_roundtrip!(op_append, FieldOperation, FieldOperation::Append, "append");
    test_serde_roundtrip!(
        rel_reports_to,
        RelationshipType,
        RelationshipType::ReportsTo,
        "reports-to"
    );
    test_serde_roundtrip!(
        rel_custom,
        RelationshipType,
        RelationshipType::Custom("mentors".into()),
        "mentors"
    );
    test_serde_roundtrip!(source_hr, Source, Source::HrSystem, "hr-system");

    #[rstest]
    #[case("reports-to", Some(RelationshipType::Manages))]
    #[case("manages", Some(RelationshipType::ReportsTo))]
    #[case("owns", Some(RelationshipType::OwnedBy))]
    #[case("owned-by", Some(RelationshipType::Owns))]
    #[case("parent-of", Some(RelationshipType::ChildOf))]
    #[case("child-of", Some(RelationshipType::ParentOf))]
    #[case("blocks", Some(RelationshipType::DependsOn))]
    #[case("depends-on", Some(RelationshipType::Blocks))]
    #[case("leads", Some(RelationshipType::MemberOf))]
    #[case("member-of", Some(RelationshipType::Leads))]
    #[case("related-to", None)]
    #[case("mentors", None)]
    fn inverse_table(#[case] kind: &str, #[case] expected: Option<RelationshipType>) {
        assert_eq!(get_inverse_type(kind), expected);
    }

    #[test]
    fn relationship_type_normalizes_known_spellings() {
        assert_eq!(RelationshipType::from("Reports_To"), RelationshipType::ReportsTo);
        assert_eq!(
            RelationshipType::from(" Mentors "),
            RelationshipType::Custom("Mentors".into())
        );
    }

    #[rstest]
    #[case("hr-system", 0.95)]
    #[case("issue-tracker", 0.85)]
    #[case("code-host", 0.85)]
    #[case("docs-platform", 0.80)]
    #[case("chat", 0.75)]
    #[case("manual", 0.70)]
    #[case("auto-generated", 0.50)]
    #[case("unknown", 0.50)]
    #[case("spreadsheet", 0.50)]
    fn source_reliability_table(#[case] raw: &str, #[case] expected: f64) {
        assert!((Source::from(raw).reliability() - expected).abs() < f64::EPSILON);
    }

    #[test]
    fn event_type_parse_rejects_unknown_and_reserved() {
        assert_eq!("status-change".parse::<EventType>().unwrap(), EventType::StatusChange);
        assert!(matches!(
            "teleport".parse::<EventType>(),
            Err(CoreError::InvalidEventType(_))
        ));
        assert!(matches!(
            "compacted-summary".parse::<EventType>(),
            Err(CoreError::InvalidEventType(_))
        ));
    }

    #[test]
    fn entity_type_dir_names_roundtrip() {
        for kind in EntityType::ALL {
            assert_eq!(EntityType::from_dir_name(kind.dir_name()), Some(kind));
            assert_eq!(EntityType::from_dir_name(kind.as_str()), Some(kind));
        }
        assert_eq!(EntityType::from_dir_name("misc"), None);
    }
}
