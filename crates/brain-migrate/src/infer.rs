//! Heuristics that recover entity fields from a legacy record.
//!
//! Everything here is a pure function of the record's path and metadata.
//! Each heuristic returns a best-effort answer; type inference also reports
//! where its answer came from.

use std::path::Path;

use brain_core::confidence::{Confidence, calculate_confidence};
use brain_core::enums::{EntityType, Source};
use brain_core::ids::{slugify, title_case};
use brain_store::record::{Record, scalar_to_string};
use serde_yaml::Value;

/// Freshness assumed for every migrated record.
pub const MIGRATION_FRESHNESS: f64 = 0.8;

/// Type used when neither metadata nor path names one.
pub const DEFAULT_TYPE: EntityType = EntityType::Project;

/// Metadata checked for completeness. Each slot counts once when any of its
/// keys carries a non-empty value.
pub const COMPLETENESS_CHECKLIST: [&[&str]; 8] = [
    &["name", "title"],
    &["description"],
    &["status"],
    &["source"],
    &["tags"],
    &["aliases"],
    &["created"],
    &["updated"],
];

/// Where an inferred entity type came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeQuality {
    /// An explicit `type:` metadata key.
    Metadata,
    /// A directory name on the record's path.
    FromPath,
    /// Nothing matched; [`DEFAULT_TYPE`] was used.
    Defaulted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeInference {
    pub kind: EntityType,
    pub quality: TypeQuality,
}

/// Infer the entity type of the record at `path`.
///
/// A `type:` key naming a known type (singular or plural) wins. Otherwise the
/// directories between `root` and the file are checked innermost first.
#[must_use]
pub fn infer_type(path: &Path, root: &Path, record: &Record) -> TypeInference {
    if let Some(kind) = record.get_str("type").as_deref().and_then(parse_type) {
        return TypeInference {
            kind,
            quality: TypeQuality::Metadata,
        };
    }

    let relative = path.strip_prefix(root).unwrap_or(path);
    let from_path = relative.parent().and_then(|dir| {
        dir.components()
            .rev()
            .find_map(|c| c.as_os_str().to_str().and_then(EntityType::from_dir_name))
    });

    from_path.map_or(
        TypeInference {
            kind: DEFAULT_TYPE,
            quality: TypeQuality::Defaulted,
        },
        |kind| TypeInference {
            kind,
            quality: TypeQuality::FromPath,
        },
    )
}

/// Parse a type name as written in legacy metadata.
#[must_use]
pub fn parse_type(raw: &str) -> Option<EntityType> {
    raw.parse().ok().or_else(|| EntityType::from_dir_name(raw.trim()))
}

/// Slug derived from the filename stem. `None` if nothing usable remains.
#[must_use]
pub fn infer_slug(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let slug = slugify(stem);
    (!slug.is_empty()).then_some(slug)
}

/// Display name: `name`, then `title`, then the title-cased filename stem.
#[must_use]
pub fn infer_name(path: &Path, record: &Record) -> String {
    record
        .get_str("name")
        .or_else(|| record.get_str("title"))
        .unwrap_or_else(|| {
            path.file_stem()
                .and_then(|s| s.to_str())
                .map(title_case)
                .unwrap_or_default()
        })
}

/// Fraction of [`COMPLETENESS_CHECKLIST`] slots that are filled.
#[must_use]
pub fn completeness(record: &Record) -> f64 {
    let filled = COMPLETENESS_CHECKLIST
        .iter()
        .filter(|keys| {
            keys.iter()
                .any(|key| record.metadata.get(*key).is_some_and(is_filled))
        })
        .count();
    #[allow(clippy::cast_precision_loss)]
    let ratio = filled as f64 / COMPLETENESS_CHECKLIST.len() as f64;
    ratio
}

fn is_filled(value: &Value) -> bool {
    match value {
        Value::Sequence(items) => !items.is_empty(),
        Value::Mapping(map) => !map.is_empty(),
        other => scalar_to_string(other).is_some(),
    }
}

/// Declared source of the record, `unknown` when absent.
#[must_use]
pub fn infer_source(record: &Record) -> Source {
    record
        .get_str("source")
        .map_or(Source::Unknown, Source::from)
}

/// Entity confidence from completeness, source reliability, and
/// [`MIGRATION_FRESHNESS`].
#[must_use]
pub fn infer_confidence(record: &Record) -> Confidence {
    calculate_confidence(
        completeness(record),
        infer_source(record).reliability(),
        MIGRATION_FRESHNESS,
    )
}
