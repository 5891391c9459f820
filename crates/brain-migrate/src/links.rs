//! Wiki-link extraction and reference normalization.
//!
//! Legacy records point at each other with `[[Target]]`, `[[Target|label]]`,
//! `[[Target#Section]]`, or `[[people/target]]`, and with plain names in
//! fields such as `manager:`. Both are turned into entity ids of the form
//! `entity/<type>/<slug>`. When the type cannot be inferred the id uses the
//! `unknown` segment, and the result carries a lower quality score.

use brain_core::enums::EntityType;
use brain_core::ids::{UNKNOWN_TYPE_SEGMENT, entity_id, entity_id_with_segment, parse_entity_id, slugify};

/// One `[[...]]` occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiLink {
    pub target: String,
    pub label: Option<String>,
    pub section: Option<String>,
}

/// Every wiki-link in `text`, in order of appearance.
///
/// Embeds (`![[...]]`), links spanning lines, and links without a target
/// (`[[#Section]]`) are ignored.
#[must_use]
pub fn extract_wiki_links(text: &str) -> Vec<WikiLink> {
    let mut links = Vec::new();
    let mut cursor = 0;
    while let Some(open) = text[cursor..].find("[[").map(|i| cursor + i) {
        let inner_start = open + 2;
        let Some(close) = text[inner_start..].find("]]").map(|i| inner_start + i) else {
            break;
        };
        cursor = close + 2;

        let is_embed = text[..open].ends_with('!');
        let inner = &text[inner_start..close];
        if is_embed || inner.contains('\n') {
            continue;
        }
        if let Some(link) = parse_link(inner) {
            links.push(link);
        }
    }
    links
}

fn parse_link(inner: &str) -> Option<WikiLink> {
    let (reference, label) = match inner.split_once('|') {
        Some((reference, label)) => (reference, non_empty(label)),
        None => (inner, None),
    };
    let (target, section) = match reference.split_once('#') {
        Some((target, section)) => (target, non_empty(section)),
        None => (reference, None),
    };
    Some(WikiLink {
        target: non_empty(target)?,
        label,
        section,
    })
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// How much a normalized reference can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefQuality {
    /// Already an entity id with a known type.
    Explicit,
    /// Qualified by a type directory, e.g. `people/jane-smith`.
    Qualified,
    /// Type taken from the field it appeared in, e.g. `manager` implies a person.
    Hinted,
    /// Type could not be inferred.
    Unknown,
}

impl RefQuality {
    /// Confidence assigned to a relationship built from this reference.
    #[must_use]
    pub const fn confidence(self) -> f64 {
        match self {
            Self::Explicit => 0.9,
            Self::Qualified => 0.85,
            Self::Hinted => 0.7,
            Self::Unknown => 0.5,
        }
    }
}

/// A reference resolved to an entity id, plus how it was inferred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRef {
    pub id: String,
    pub kind: Option<EntityType>,
    pub quality: RefQuality,
}

/// Normalize a raw reference (plain name, path, wiki-link, or id).
///
/// `hint` is the type implied by the context the reference appeared in.
/// Returns `None` when nothing usable is left after stripping.
#[must_use]
pub fn normalize_reference(raw: &str, hint: Option<EntityType>) -> Option<NormalizedRef> {
    let raw = raw.trim();
    let target = match raw.strip_prefix("[[").and_then(|r| r.strip_suffix("]]")) {
        Some(inner) => parse_link(inner)?.target,
        None => raw.to_string(),
    };

    if let Ok((segment, slug)) = parse_entity_id(&target) {
        let kind = segment.parse::<EntityType>().ok();
        let quality = if kind.is_some() {
            RefQuality::Explicit
        } else {
            RefQuality::Unknown
        };
        return Some(NormalizedRef {
            id: entity_id_with_segment(segment, slug),
            kind,
            quality,
        });
    }

    let (dir, name) = match target.rsplit_once('/') {
        Some((dir, name)) => (Some(dir), name),
        None => (None, target.as_str()),
    };
    let name = name.strip_suffix(".md").unwrap_or(name);
    if slugify(name).is_empty() {
        return None;
    }

    let from_dir = dir.and_then(|d| d.rsplit('/').find_map(EntityType::from_dir_name));
    let (kind, quality) = match (from_dir, hint) {
        (Some(kind), _) => (Some(kind), RefQuality::Qualified),
        (None, Some(kind)) => (Some(kind), RefQuality::Hinted),
        (None, None) => (None, RefQuality::Unknown),
    };
    let id = kind.map_or_else(
        || entity_id_with_segment(UNKNOWN_TYPE_SEGMENT, name),
        |kind| entity_id(kind, name),
    );
    Some(NormalizedRef { id, kind, quality })
}
