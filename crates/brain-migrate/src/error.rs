//! Migration error types.

use std::path::PathBuf;

use brain_core::errors::CoreError;
use brain_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrationError {
    /// Reading or writing a record failed.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The upgraded record could not be encoded.
    #[error("Failed to encode upgraded record {}: {message}", path.display())]
    Encode { path: PathBuf, message: String },

    /// An entity could not be assembled from the legacy record.
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The upgraded record's store path is taken by another file.
    #[error("Cannot move {} to {}: a record already exists there", path.display(), target.display())]
    Conflict { path: PathBuf, target: PathBuf },

    /// The worker pool could not be started.
    #[error("Worker pool error: {0}")]
    Pool(String),
}
