use serde::{Deserialize, Serialize};
use std::fmt;

use crate::entity::EntityKind;

/// Relation wired once its target record exists locally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Object crafted from a resource
    Recipe,
    /// Class spell
    BreedSpell,
    CreatureSpell,
    /// Resource dropped by a creature
    CreatureResource,
    /// Monster summoned by a spell
    SpellInvocation,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Recipe => "recipe",
            ActionType::BreedSpell => "breed_spell",
            ActionType::CreatureSpell => "creature_spell",
            ActionType::CreatureResource => "creature_resource",
            ActionType::SpellInvocation => "spell_invocation",
        }
    }

    /// Kind the target is looked up and queued under. Object targets
    /// (ingredients, drops) may be any object kind; they are queued as
    /// resources and reclassified from their `typeId` once fetched.
    pub fn target_kind(&self) -> EntityKind {
        match self {
            ActionType::Recipe | ActionType::CreatureResource => EntityKind::Resource,
            ActionType::BreedSpell | ActionType::CreatureSpell => EntityKind::Spell,
            ActionType::SpellInvocation => EntityKind::Monster,
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionPayload {
    pub owner_table: String,
    pub owner_id: i64,
    pub quantity: Option<u32>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependentAction {
    pub target_key: String,
    pub action_type: ActionType,
    pub payload: ActionPayload,
}

/// Record queued for import because something references it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingImport {
    pub source: String,
    pub kind: EntityKind,
    pub external_id: String,
}

impl PendingImport {
    pub fn key(&self) -> String {
        pending_key(self.kind, &self.external_id)
    }
}

/// Unique key of a record within one run (`spell:201`)
pub fn pending_key(kind: EntityKind, external_id: &str) -> String {
    format!("{}:{}", kind.as_str(), external_id)
}
