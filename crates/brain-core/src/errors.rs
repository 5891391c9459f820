//! Cross-cutting error types for Brain.
//!
//! Domain-specific errors (`StoreError`, `MigrationError`) are defined in their
//! respective crates. The CLI converges everything on `anyhow`.

use thiserror::Error;

/// Errors that can be raised by any Brain crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An event type outside the closed set was requested.
    #[error("Invalid event type: {0}")]
    InvalidEventType(String),

    /// Data failed validation (format, constraints).
    #[error("Validation error: {0}")]
    Validation(String),

    /// The OS random source failed while generating an identifier.
    #[error("Entropy source unavailable: {0}")]
    Entropy(String),
}
