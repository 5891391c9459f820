//! Event log settings.

use brain_core::events::{DEFAULT_COMPACTION_THRESHOLD, MIN_COMPACTION_THRESHOLD};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

const fn default_compaction_threshold() -> usize {
    DEFAULT_COMPACTION_THRESHOLD
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EventsConfig {
    /// Maximum events kept on a record before compaction.
    #[serde(default = "default_compaction_threshold")]
    pub compaction_threshold: usize,

    /// Append events dropped by compaction to a JSONL sidecar per entity.
    #[serde(default)]
    pub archive_compacted: bool,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            compaction_threshold: default_compaction_threshold(),
            archive_compacted: false,
        }
    }
}

impl EventsConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.compaction_threshold < MIN_COMPACTION_THRESHOLD {
            return Err(ConfigError::invalid(
                "events.compaction_threshold",
                format!("must be at least {MIN_COMPACTION_THRESHOLD}"),
            ));
        }
        Ok(())
    }
}
