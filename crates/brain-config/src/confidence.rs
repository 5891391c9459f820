//! Relationship decay and staleness settings.

use brain_core::confidence::{DEFAULT_STALE_THRESHOLD_DAYS, DecayPolicy};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

const fn default_decay_rate() -> f64 {
    0.01
}

const fn default_floor() -> f64 {
    0.3
}

const fn default_stale_threshold_days() -> i64 {
    DEFAULT_STALE_THRESHOLD_DAYS
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ConfidenceConfig {
    /// Fraction of confidence lost per week since last verification.
    #[serde(default = "default_decay_rate")]
    pub decay_rate: f64,

    #[serde(default = "default_floor")]
    pub floor: f64,

    #[serde(default = "default_stale_threshold_days")]
    pub stale_threshold_days: i64,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            decay_rate: default_decay_rate(),
            floor: default_floor(),
            stale_threshold_days: default_stale_threshold_days(),
        }
    }
}

impl ConfidenceConfig {
    #[must_use]
    pub const fn decay_policy(&self) -> DecayPolicy {
        DecayPolicy {
            rate_per_week: self.decay_rate,
            floor: self.floor,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.floor) {
            return Err(ConfigError::invalid("confidence.floor", "must be within [0, 1]"));
        }
        if !self.decay_rate.is_finite() || self.decay_rate < 0.0 {
            return Err(ConfigError::invalid(
                "confidence.decay_rate",
                "must be a non-negative number",
            ));
        }
        if self.stale_threshold_days < 0 {
            return Err(ConfigError::invalid(
                "confidence.stale_threshold_days",
                "must not be negative",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_decay_policy() {
        let config = ConfidenceConfig::default();
        assert_eq!(config.decay_policy(), DecayPolicy::default());
        assert_eq!(config.stale_threshold_days, 90);
    }

    #[test]
    fn floor_outside_unit_interval_is_rejected() {
        let config = ConfidenceConfig {
            floor: 1.5,
            ..ConfidenceConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
