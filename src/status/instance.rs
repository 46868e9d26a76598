//! Status effect instances attached to a combatant.

use serde::{Deserialize, Serialize};

use super::definition::{StatusEffectDefinition, StatusType};

/// A held status effect.
///
/// An instance with zero stacks never exists: it is removed instead.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusEffectInstance {
    /// Id of the definition in the status store.
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub status_type: StatusType,
    pub stacks: u32,
    #[serde(default)]
    pub emoji: String,
    #[serde(default)]
    pub description: String,
}

impl StatusEffectInstance {
    /// Instantiate a definition with the given (already capped) stacks.
    #[must_use]
    pub fn from_definition(def: &StatusEffectDefinition, stacks: u32) -> Self {
        Self {
            id: def.id.clone(),
            name: def.name.clone(),
            status_type: def.status_type,
            stacks,
            emoji: def.emoji.clone(),
            description: def.description.clone(),
        }
    }

    #[must_use]
    pub fn is_buff(&self) -> bool {
        self.status_type == StatusType::Buff
    }

    #[must_use]
    pub fn is_debuff(&self) -> bool {
        self.status_type == StatusType::Debuff
    }
}
