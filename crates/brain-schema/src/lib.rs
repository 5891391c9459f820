//! # brain-schema
//!
//! JSON Schema generation, validation, and registry for Brain records.
//!
//! Record types are defined in `brain-core` with `#[derive(JsonSchema)]`.
//! This crate collects their schemas by name so that the store and the
//! migrator can validate upgraded records, and so `brain schema` can export
//! them for external tooling.

mod error;
mod registry;

pub use error::SchemaError;
pub use registry::SchemaRegistry;
