//! Store error types for brain-store.

use std::path::PathBuf;

use brain_core::errors::CoreError;
use thiserror::Error;

/// Errors from reading, writing, or mutating entity records.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem access failed.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A record or registry file could not be decoded.
    #[error("Failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// An in-memory value could not be encoded.
    #[error("Serialization failed: {0}")]
    Serialize(String),

    /// A domain rule was violated.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Lookup by id, slug, or alias returned nothing.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A record with this id already exists.
    #[error("Entity already exists: {0}")]
    AlreadyExists(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn core_errors_pass_through() {
        let error: StoreError = CoreError::Validation("bad slug".into()).into();
        assert!(matches!(error, StoreError::Core(CoreError::Validation(_))));
        assert_eq!(error.to_string(), "Validation error: bad slug");

        let error = StoreError::parse("people/x.md", "legacy record (no $schema)");
        assert_eq!(
            error.to_string(),
            "Failed to parse people/x.md: legacy record (no $schema)"
        );
    }
}
