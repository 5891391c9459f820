use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::confidence::{Confidence, DEFAULT_STALE_THRESHOLD_DAYS, DecayPolicy, is_stale, today};
use crate::enums::RelationshipType;
use crate::metadata::Metadata;

/// A typed, directed, temporally-bounded edge owned by one entity.
///
/// `target` is the id of the other entity; no referential integrity is
/// enforced. A relationship is ended by setting `until`, never by removal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Relationship {
    #[serde(rename = "type")]
    #[schemars(with = "String")]
    pub kind: RelationshipType,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub confidence: Confidence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_verified: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

impl Relationship {
    /// A new open-ended relationship with full confidence.
    #[must_use]
    pub fn new(kind: impl Into<RelationshipType>, target: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            target: target.into(),
            since: None,
            until: None,
            role: None,
            confidence: Confidence::FULL,
            last_verified: None,
            source: None,
            metadata: Metadata::new(),
        }
    }

    #[must_use]
    pub fn with_since(mut self, since: NaiveDate) -> Self {
        self.since = Some(since);
        self
    }

    #[must_use]
    pub fn with_until(mut self, until: NaiveDate) -> Self {
        self.until = Some(until);
        self
    }

    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    #[must_use]
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Confidence::new(confidence);
        self
    }

    #[must_use]
    pub fn with_last_verified(mut self, date: NaiveDate) -> Self {
        self.last_verified = Some(date);
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Assign a confidence, clamping into `[0, 1]`.
    pub fn set_confidence(&mut self, confidence: f64) {
        self.confidence = Confidence::new(confidence);
    }

    /// Whether `since <= as_of <= until`, with missing bounds unbounded.
    #[must_use]
    pub fn is_active_on(&self, as_of: NaiveDate) -> bool {
        self.since.is_none_or(|since| since <= as_of) && self.until.is_none_or(|until| as_of <= until)
    }

    /// Whether this edge has the given type and target.
    #[must_use]
    pub fn matches(&self, kind: &RelationshipType, target: &str) -> bool {
        &self.kind == kind && self.target == target
    }

    /// `last_verified` if present, otherwise `since`.
    #[must_use]
    pub const fn reference_date(&self) -> Option<NaiveDate> {
        match self.last_verified {
            Some(date) => Some(date),
            None => self.since,
        }
    }

    /// Confidence after linear decay since the reference date. `as_of`
    /// defaults to today.
    #[must_use]
    pub fn compute_decayed_confidence(&self, as_of: Option<NaiveDate>, policy: &DecayPolicy) -> Confidence {
        policy.apply(self.confidence, self.reference_date(), as_of.unwrap_or_else(today))
    }

    /// Whether the reference date is older than `threshold_days` (90 when
    /// `None`). Undated relationships are always stale.
    #[must_use]
    pub fn is_stale(&self, as_of: Option<NaiveDate>, threshold_days: Option<i64>) -> bool {
        is_stale(
            self.reference_date(),
            as_of.unwrap_or_else(today),
            threshold_days.unwrap_or(DEFAULT_STALE_THRESHOLD_DAYS),
        )
    }

    /// The edge this relationship implies on the target entity, if its type
    /// has a fixed inverse.
    #[must_use]
    pub fn inverse_for(&self, owner_id: &str) -> Option<Self> {
        self.kind.inverse().map(|kind| Self {
            kind,
            target: owner_id.to_string(),
            ..self.clone()
        })
    }
}
