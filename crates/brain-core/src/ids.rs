//! Identifier helpers: slugs, entity ids, schema URIs, and event ids.
//!
//! Entity ids have the shape `entity/<type>/<slug>`. The type segment is a
//! plain string so that migrated references whose type cannot be inferred can
//! still point at `entity/unknown/<slug>`.

use chrono::{DateTime, Utc};

use crate::enums::EntityType;
use crate::errors::CoreError;

/// Prefix shared by every entity id.
pub const ENTITY_ID_PREFIX: &str = "entity";

/// Type segment used when a reference's entity type cannot be inferred.
pub const UNKNOWN_TYPE_SEGMENT: &str = "unknown";

/// Prefix for change-event ids.
pub const PREFIX_EVENT: &str = "evt";

/// Schema URI stamped on upgraded entity records of a given type.
#[must_use]
pub fn entity_schema_uri(kind: EntityType) -> String {
    format!("brain://schemas/entity/{kind}/v1")
}

/// Schema URI of the registry record.
pub const REGISTRY_SCHEMA_URI: &str = "brain://schemas/registry/v1";

/// Format version written into the registry record.
pub const REGISTRY_FORMAT_VERSION: u32 = 1;

/// Slugify a display name or filename.
///
/// Lowercases, maps spaces and underscores to `-`, strips everything that is
/// not ASCII alphanumeric or `-`, and collapses repeated or edge hyphens.
#[must_use]
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    for ch in input.trim().chars().flat_map(char::to_lowercase) {
        let mapped = match ch {
            ' ' | '_' | '-' => '-',
            c if c.is_ascii_alphanumeric() => c,
            _ => continue,
        };
        if mapped == '-' && (slug.is_empty() || slug.ends_with('-')) {
            continue;
        }
        slug.push(mapped);
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Build an entity id from a type and a raw name.
#[must_use]
pub fn entity_id(kind: EntityType, name: &str) -> String {
    entity_id_with_segment(kind.as_str(), name)
}

/// Build an entity id from a raw type segment (possibly `unknown`) and name.
#[must_use]
pub fn entity_id_with_segment(segment: &str, name: &str) -> String {
    format!("{ENTITY_ID_PREFIX}/{segment}/{}", slugify(name))
}

/// Split an entity id into its type segment and slug.
///
/// # Errors
///
/// Returns `CoreError::Validation` if the id does not have the
/// `entity/<type>/<slug>` shape.
pub fn parse_entity_id(id: &str) -> Result<(&str, &str), CoreError> {
    let mut parts = id.splitn(3, '/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(ENTITY_ID_PREFIX), Some(segment), Some(slug))
            if !segment.is_empty() && !slug.is_empty() && !slug.contains('/') =>
        {
            Ok((segment, slug))
        }
        _ => Err(CoreError::Validation(format!(
            "malformed entity id '{id}' (expected entity/<type>/<slug>)"
        ))),
    }
}

/// The slug part of an entity id, or the input itself if it is not an id.
#[must_use]
pub fn slug_of(id: &str) -> &str {
    parse_entity_id(id).map_or(id, |(_, slug)| slug)
}

/// Title-case a filename stem: separators become spaces, words are capitalized.
#[must_use]
pub fn title_case(stem: &str) -> String {
    stem.split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Generate a fresh change-event id: `evt-<utc compact timestamp>-<8 hex>`.
///
/// # Errors
///
/// Returns `CoreError::Entropy` if the OS random source is unavailable.
pub fn generate_event_id(at: DateTime<Utc>) -> Result<String, CoreError> {
    let mut bytes = [0u8; 4];
    getrandom::fill(&mut bytes).map_err(|e| CoreError::Entropy(e.to_string()))?;
    let suffix: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    Ok(format!(
        "{PREFIX_EVENT}-{}-{suffix}",
        at.format("%Y%m%d%H%M%S%3f")
    ))
}
