//! Entity and relationship structs.
//!
//! An `Entity` owns its outgoing `Relationship`s and its `$events` log. All
//! structs derive `Serialize`, `Deserialize`, and `JsonSchema` so records can
//! be written as YAML frontmatter and validated against generated schemas.

mod entity;
mod profile;
mod relationship;

pub use entity::{Entity, NewEntity, STRUCTURAL_PREFIX};
pub use profile::Profile;
pub use relationship::Relationship;
