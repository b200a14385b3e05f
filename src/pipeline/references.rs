use serde_json::Value;

use crate::convert::{value_as_id, value_as_i64, Bucket};
use crate::entity::EntityKind;
use crate::relations::ActionType;

/// A cross reference read from the `relations` bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub action_type: ActionType,
    pub external_id: String,
    pub quantity: u32,
}

impl Reference {
    fn new(action_type: ActionType, external_id: String) -> Self {
        Self {
            action_type,
            external_id,
            quantity: 1,
        }
    }

    pub fn target_kind(&self) -> EntityKind {
        self.action_type.target_kind()
    }
}

/// References a kind is allowed to carry, in field order
fn fields_for(kind: EntityKind) -> &'static [(&'static str, ActionType)] {
    match kind {
        EntityKind::Item | EntityKind::Resource | EntityKind::Consumable => {
            &[("ingredients", ActionType::Recipe)]
        }
        EntityKind::Class => &[("spells", ActionType::BreedSpell)],
        EntityKind::Spell => &[("invocations", ActionType::SpellInvocation)],
        EntityKind::Monster | EntityKind::Npc => &[
            ("spells", ActionType::CreatureSpell),
            ("drops", ActionType::CreatureResource),
        ],
        EntityKind::Panoply => &[],
    }
}

pub fn references(kind: EntityKind, relations: &Bucket) -> Vec<Reference> {
    let mut found = Vec::new();
    for (field, action_type) in fields_for(kind) {
        let Some(Value::Array(entries)) = relations.get(*field) else {
            continue;
        };
        for entry in entries {
            let reference = match entry {
                Value::Object(map) if *action_type == ActionType::Recipe => map
                    .get("ingredientExternalId")
                    .and_then(value_as_id)
                    .map(|id| Reference {
                        quantity: map
                            .get("quantity")
                            .and_then(value_as_i64)
                            .and_then(|q| u32::try_from(q).ok())
                            .filter(|q| *q > 0)
                            .unwrap_or(1),
                        ..Reference::new(*action_type, id)
                    }),
                Value::Object(map) => map
                    .get("id")
                    .and_then(value_as_id)
                    .map(|id| Reference::new(*action_type, id)),
                scalar => value_as_id(scalar).map(|id| Reference::new(*action_type, id)),
            };
            match reference {
                Some(reference) => found.push(reference),
                None => tracing::debug!(field, %entry, "unusable reference skipped"),
            }
        }
    }
    found
}
