//! Record codec: a YAML metadata block between `---` lines, then a free-text
//! Markdown body.
//!
//! ```text
//! ---
//! $schema: brain://schemas/entity/person/v1
//! $id: entity/person/jane-smith
//! name: Jane Smith
//! ---
//! Free-form notes.
//! ```
//!
//! The body is carried byte-for-byte. A record whose metadata contains the
//! `$schema` key has already been upgraded; anything else is legacy.

use brain_core::entities::Entity;
use serde::ser::Error as _;
use serde_yaml::{Mapping, Value};

/// Delimiter line around the metadata block.
pub const DELIMITER: &str = "---";

/// Metadata key whose presence marks an upgraded record.
pub const SCHEMA_KEY: &str = "$schema";

/// Split text into its metadata block and body.
///
/// Returns `None` for the metadata when the text does not open with a
/// delimiter line or the block is never closed; the body is then the whole
/// text. Both `\n` and `\r\n` line endings are accepted.
#[must_use]
pub fn split_frontmatter(text: &str) -> (Option<&str>, &str) {
    let Some(rest) = text
        .strip_prefix(DELIMITER)
        .and_then(|r| r.strip_prefix("\r\n").or_else(|| r.strip_prefix('\n')))
    else {
        return (None, text);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == DELIMITER {
            return (Some(&rest[..offset]), &rest[offset + line.len()..]);
        }
        offset += line.len();
    }
    (None, text)
}

/// A record split into parsed metadata and raw body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    pub metadata: Mapping,
    pub body: String,
}

impl Record {
    /// Parse strictly: a metadata block that is not a YAML mapping is an
    /// error. A missing block yields empty metadata.
    ///
    /// # Errors
    ///
    /// Returns the YAML error for malformed metadata.
    pub fn parse(text: &str) -> Result<Self, serde_yaml::Error> {
        let (yaml, body) = split_frontmatter(text);
        let metadata = match yaml {
            Some(yaml) => parse_mapping(yaml)?,
            None => Mapping::new(),
        };
        Ok(Self {
            metadata,
            body: body.to_string(),
        })
    }

    /// Parse, treating malformed metadata as empty.
    #[must_use]
    pub fn parse_lenient(text: &str) -> Self {
        let (yaml, body) = split_frontmatter(text);
        let metadata = yaml.map_or_else(Mapping::new, |yaml| {
            parse_mapping(yaml).unwrap_or_else(|e| {
                tracing::debug!("malformed metadata treated as empty: {e}");
                Mapping::new()
            })
        });
        Self {
            metadata,
            body: body.to_string(),
        }
    }

    /// Whether the metadata carries the `$schema` marker.
    #[must_use]
    pub fn is_upgraded(&self) -> bool {
        self.metadata.contains_key(SCHEMA_KEY)
    }

    /// Metadata value as a trimmed, non-empty string. Scalars are stringified.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<String> {
        scalar_to_string(self.metadata.get(key)?)
    }

    /// Render back to text.
    ///
    /// # Errors
    ///
    /// Returns the YAML error if the metadata cannot be encoded.
    pub fn render(&self) -> Result<String, serde_yaml::Error> {
        let yaml = if self.metadata.is_empty() {
            String::new()
        } else {
            serde_yaml::to_string(&self.metadata)?
        };
        Ok(format!("{DELIMITER}\n{yaml}{DELIMITER}\n{}", self.body))
    }
}

fn parse_mapping(yaml: &str) -> Result<Mapping, serde_yaml::Error> {
    match serde_yaml::from_str::<Value>(yaml)? {
        Value::Null => Ok(Mapping::new()),
        Value::Mapping(mapping) => Ok(mapping),
        other => Err(serde_yaml::Error::custom(format!(
            "metadata block is not a mapping: {other:?}"
        ))),
    }
}

/// Stringify a YAML scalar. Sequences, mappings and null yield `None`.
#[must_use]
pub fn scalar_to_string(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Tagged(tagged) => return scalar_to_string(&tagged.value),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// An upgraded entity with its Markdown body.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecord {
    pub entity: Entity,
    pub body: String,
}

impl EntityRecord {
    #[must_use]
    pub const fn new(entity: Entity, body: String) -> Self {
        Self { entity, body }
    }

    /// Decode an upgraded record.
    ///
    /// # Errors
    ///
    /// Returns the YAML error if the metadata does not describe an entity.
    pub fn from_record(record: Record) -> Result<Self, serde_yaml::Error> {
        let entity: Entity = serde_yaml::from_value(Value::Mapping(record.metadata))?;
        Ok(Self {
            entity,
            body: record.body,
        })
    }

    /// Encode into a generic record.
    ///
    /// # Errors
    ///
    /// Returns the YAML error if the entity cannot be encoded.
    pub fn to_record(&self) -> Result<Record, serde_yaml::Error> {
        Ok(Record {
            metadata: encode_entity(&self.entity)?,
            body: self.body.clone(),
        })
    }

    /// Encode and render to text.
    ///
    /// # Errors
    ///
    /// Returns the YAML error if the entity cannot be encoded.
    pub fn render(&self) -> Result<String, serde_yaml::Error> {
        self.to_record()?.render()
    }
}

/// Encode an entity as a metadata mapping, structural keys first.
///
/// # Errors
///
/// Returns the YAML error if a field cannot be encoded.
pub fn encode_entity(entity: &Entity) -> Result<Mapping, serde_yaml::Error> {
    match serde_yaml::to_value(entity)? {
        Value::Mapping(mapping) => Ok(mapping),
        _ => Err(serde_yaml::Error::custom("entity did not encode as a mapping")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brain_core::entities::{NewEntity, Relationship};
    use brain_core::enums::{EntityType, Source};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("---\na: 1\n---\nbody\n", Some("a: 1\n"), "body\n")]
    #[case("---\r\na: 1\r\n---\r\nbody\r\n", Some("a: 1\r\n"), "body\r\n")]
    #[case("---\n---\n", Some(""), "")]
    #[case("no block here\n", None, "no block here\n")]
    #[case("---\na: 1\nnever closed\n", None, "---\na: 1\nnever closed\n")]
    #[case("---\na: 1\n---", Some("a: 1\n"), "")]
    fn splits_frontmatter(#[case] text: &str, #[case] yaml: Option<&str>, #[case] body: &str) {
        assert_eq!(split_frontmatter(text), (yaml, body));
    }

    #[test]
    fn body_keeps_inner_rules() {
        let text = "---\nname: x\n---\n# Title\n\n---\n\nmore\n";
        let record = Record::parse(text).unwrap();
        assert_eq!(record.body, "# Title\n\n---\n\nmore\n");
    }

    #[test]
    fn malformed_metadata_strict_vs_lenient() {
        let text = "---\nname: [unclosed\n---\nbody";
        assert!(Record::parse(text).is_err());
        let record = Record::parse_lenient(text);
        assert!(record.metadata.is_empty());
        assert_eq!(record.body, "body");

        assert!(Record::parse("---\n- a\n- b\n---\n").is_err());
    }

    #[test]
    fn scalar_strings() {
        let record = Record::parse("---\nname: '  Jane '\nlevel: 3\nok: true\nlist: [a]\nblank: ''\n---\n")
            .unwrap();
        assert_eq!(record.get_str("name").as_deref(), Some("Jane"));
        assert_eq!(record.get_str("level").as_deref(), Some("3"));
        assert_eq!(record.get_str("ok").as_deref(), Some("true"));
        assert_eq!(record.get_str("list"), None);
        assert_eq!(record.get_str("blank"), None);
        assert_eq!(record.get_str("missing"), None);
    }

    #[test]
    fn entity_record_roundtrips_through_text() {
        let mut entity = Entity::create(
            EntityType::Person,
            NewEntity {
                source: Source::HrSystem,
                ..NewEntity::named("Jane Smith")
            },
            "tester",
        )
        .unwrap();
        entity
            .relationships
            .push(Relationship::new("member-of", "entity/team/platform"));
        let record = EntityRecord::new(entity, "Notes about Jane.\n\n---\nfooter\n".into());

        let text = record.render().unwrap();
        assert!(text.starts_with("---\n"));
        assert!(text.contains("brain://schemas/entity/person/v1"));

        let parsed = Record::parse(&text).unwrap();
        assert!(parsed.is_upgraded());
        let back = EntityRecord::from_record(parsed).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn empty_metadata_renders_bare_delimiters() {
        let record = Record {
            metadata: Mapping::new(),
            body: "text".into(),
        };
        assert_eq!(record.render().unwrap(), "---\n---\ntext");
    }
}
