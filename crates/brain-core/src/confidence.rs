//! Confidence scores, the entity confidence formula, and relationship decay.
//!
//! Every score in the system is a `Confidence`, which clamps into `[0, 1]` on
//! construction and on deserialization. Out-of-range input is never rejected.

use chrono::{NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

/// Weight of field completeness in the entity confidence formula.
pub const COMPLETENESS_WEIGHT: f64 = 0.4;
/// Weight of source reliability in the entity confidence formula.
pub const RELIABILITY_WEIGHT: f64 = 0.4;
/// Weight of freshness in the entity confidence formula.
pub const FRESHNESS_WEIGHT: f64 = 0.2;

/// Multiplier applied to relationships that have neither `last_verified` nor
/// `since`, i.e. whose age cannot be established.
pub const UNDATED_PENALTY: f64 = 0.7;

/// Default staleness threshold in days.
pub const DEFAULT_STALE_THRESHOLD_DAYS: i64 = 90;

/// A quality score clamped into `[0, 1]`. `NaN` becomes `0`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, JsonSchema)]
#[serde(transparent)]
pub struct Confidence(f64);

impl Confidence {
    pub const ZERO: Self = Self(0.0);
    pub const FULL: Self = Self(1.0);

    #[must_use]
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            Self::ZERO
        } else {
            Self(value.clamp(0.0, 1.0))
        }
    }

    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }
}

impl Default for Confidence {
    fn default() -> Self {
        Self::FULL
    }
}

impl From<f64> for Confidence {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl<'de> Deserialize<'de> for Confidence {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        f64::deserialize(deserializer).map(Self::new)
    }
}

/// Combine caller-supplied sub-scores into an entity confidence.
///
/// `completeness * 0.4 + reliability * 0.4 + freshness * 0.2`. Each input is
/// clamped into `[0, 1]` first.
#[must_use]
pub fn calculate_confidence(completeness: f64, reliability: f64, freshness: f64) -> Confidence {
    let c = Confidence::new(completeness).value();
    let r = Confidence::new(reliability).value();
    let f = Confidence::new(freshness).value();
    Confidence::new(c.mul_add(
        COMPLETENESS_WEIGHT,
        r.mul_add(RELIABILITY_WEIGHT, f * FRESHNESS_WEIGHT),
    ))
}

/// Linear time decay applied to relationship confidence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayPolicy {
    /// Fraction of the base confidence lost per week since the reference date.
    pub rate_per_week: f64,
    /// Lower bound of any decayed score.
    pub floor: f64,
}

impl Default for DecayPolicy {
    fn default() -> Self {
        Self {
            rate_per_week: 0.01,
            floor: 0.3,
        }
    }
}

impl DecayPolicy {
    /// Decay `base` from `reference` to `as_of`.
    ///
    /// Without a reference date the score is `max(floor, base * 0.7)`.
    /// Otherwise `base * (1 - rate * weeks_stale)`, kept within
    /// `[floor, base]`; the floor wins when `base` is already below it.
    #[must_use]
    pub fn apply(&self, base: Confidence, reference: Option<NaiveDate>, as_of: NaiveDate) -> Confidence {
        let floor = Confidence::new(self.floor).value();
        let base = base.value();

        let Some(reference) = reference else {
            return Confidence::new(floor.max(base * UNDATED_PENALTY));
        };

        #[allow(clippy::cast_precision_loss)]
        let weeks_stale = (as_of - reference).num_days().max(0) as f64 / 7.0;
        let decayed = base * self.rate_per_week.max(0.0).mul_add(-weeks_stale, 1.0);
        Confidence::new(floor.max(decayed.min(base)))
    }
}

/// Whether a reference date is older than `threshold_days` at `as_of`.
/// Missing reference dates are always stale.
#[must_use]
pub fn is_stale(reference: Option<NaiveDate>, as_of: NaiveDate, threshold_days: i64) -> bool {
    reference.is_none_or(|date| (as_of - date).num_days() > threshold_days)
}

/// The current UTC calendar date, the default `as_of` for temporal queries.
#[must_use]
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}
