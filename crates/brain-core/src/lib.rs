//! # brain-core
//!
//! Core types and pure algorithms for the Brain knowledge store.
//!
//! This crate provides the foundational types shared across all Brain crates:
//! - Entity and relationship structs with temporal validity and confidence
//! - Closed and open enumerations (entity types, statuses, event types,
//!   relationship types, sources)
//! - Identifier helpers (slugs, entity ids, schema URIs, event ids)
//! - Confidence scoring and relationship decay
//! - The change-event log and its compaction
//! - The denormalized, alias-indexed registry
//! - Response types returned by batch operations

pub mod confidence;
pub mod entities;
pub mod enums;
pub mod errors;
pub mod events;
pub mod ids;
pub mod metadata;
pub mod registry;
pub mod responses;
