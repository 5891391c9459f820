//! Response types returned by batch operations and printed by `brain`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::registry::RegistryStats;

/// One record that failed during a migration batch.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct MigrationFailure {
    pub path: String,
    pub message: String,
}

/// Outcome of a migration batch. The batch always completes; failures are
/// counted in `errors` and the first few are kept in `error_details`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct MigrationReport {
    pub scanned: usize,
    pub migrated: usize,
    pub skipped: usize,
    pub errors: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub error_details: Vec<MigrationFailure>,
    pub dry_run: bool,
}

impl MigrationReport {
    /// Record a failure, keeping at most `preview` details.
    pub fn record_failure(&mut self, failure: MigrationFailure, preview: usize) {
        self.errors += 1;
        if self.error_details.len() < preview {
            self.error_details.push(failure);
        }
    }
}

/// Response from `brain registry rebuild`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct RegistryRebuildResponse {
    pub path: String,
    pub entities: usize,
    pub aliases: usize,
    /// Slugs claimed by more than one entity id; the last one scanned wins.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub collisions: Vec<String>,
    pub stats: RegistryStats,
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_preview_is_capped() {
        let mut report = MigrationReport::default();
        for i in 0..5 {
            report.record_failure(
                MigrationFailure {
                    path: format!("people/p{i}.md"),
                    message: "boom".into(),
                },
                2,
            );
        }
        assert_eq!(report.errors, 5);
        assert_eq!(report.error_details.len(), 2);
        assert_eq!(report.error_details[1].path, "people/p1.md");
    }
}
