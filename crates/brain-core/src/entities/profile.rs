use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::EntityType;

/// Type-specific content fields.
///
/// | Type    | Fields                          |
/// |---------|---------------------------------|
/// | person  | role, manager, team, email      |
/// | team    | lead, parent                    |
/// | squad   | lead, team                      |
/// | project | owner, team, squad              |
///
/// Other entity types carry no profile fields. Serialized flat, next to
/// `name` and `description`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub squad: Option<String>,
}

impl Profile {
    /// Every profile field name, in declaration order.
    pub const FIELDS: [&'static str; 8] =
        ["role", "manager", "team", "email", "lead", "parent", "owner", "squad"];

    /// Profile fields that apply to an entity type.
    #[must_use]
    pub const fn fields_for(kind: EntityType) -> &'static [&'static str] {
        match kind {
            EntityType::Person => &["role", "manager", "team", "email"],
            EntityType::Team => &["lead", "parent"],
            EntityType::Squad => &["lead", "team"],
            EntityType::Project => &["owner", "team", "squad"],
            EntityType::Domain | EntityType::Experiment | EntityType::System | EntityType::Brand => &[],
        }
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        match field {
            "role" => self.role.as_deref(),
            "manager" => self.manager.as_deref(),
            "team" => self.team.as_deref(),
            "email" => self.email.as_deref(),
            "lead" => self.lead.as_deref(),
            "parent" => self.parent.as_deref(),
            "owner" => self.owner.as_deref(),
            "squad" => self.squad.as_deref(),
            _ => None,
        }
    }

    /// Mutable slot for a profile field, `None` if `field` is not one.
    pub fn slot_mut(&mut self, field: &str) -> Option<&mut Option<String>> {
        match field {
            "role" => Some(&mut self.role),
            "manager" => Some(&mut self.manager),
            "team" => Some(&mut self.team),
            "email" => Some(&mut self.email),
            "lead" => Some(&mut self.lead),
            "parent" => Some(&mut self.parent),
            "owner" => Some(&mut self.owner),
            "squad" => Some(&mut self.squad),
            _ => None,
        }
    }

    /// Names of the fields that are set.
    #[must_use]
    pub fn populated(&self) -> Vec<&'static str> {
        Self::FIELDS
            .into_iter()
            .filter(|field| self.get(field).is_some())
            .collect()
    }
}
