//! # brain-migrate
//!
//! Upgrades legacy Markdown records (free-form YAML metadata, no `$schema`)
//! into Brain entity records at their store paths.
//!
//! - [`links`]: wiki-link extraction and reference normalization
//! - [`infer`]: type, slug, name, and confidence heuristics
//! - [`upgrade`]: the per-record upgrade
//! - [`batch`]: discovery and the sequential or pooled batch driver
//!
//! Upgrading is idempotent: records that already carry `$schema` are skipped.

pub mod batch;
pub mod error;
pub mod infer;
pub mod links;
pub mod upgrade;

pub use batch::{FileOutcome, Migrator};
pub use error::MigrationError;
pub use upgrade::{MIGRATOR_ACTOR, Upgrade, upgrade_record};
