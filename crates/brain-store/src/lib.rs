//! # brain-store
//!
//! File-backed persistence and the write path for Brain entities.
//!
//! - [`record`]: the `---`-delimited YAML metadata + Markdown body codec
//! - [`store`]: one record file per entity under plural type directories
//! - [`helper`]: event construction, append, version bump, and compaction
//! - [`archive`]: optional JSONL sidecar for events dropped by compaction
//! - [`service`]: the `Brain` service (Construct / Mutate / Query, registry)

pub mod archive;
pub mod error;
pub mod helper;
pub mod record;
pub mod service;
pub mod store;

pub use error::StoreError;
pub use helper::{AppendOptions, EventHelper};
pub use record::{EntityRecord, Record};
pub use service::{Brain, RegistryRebuild};
pub use store::EntityStore;
