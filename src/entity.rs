use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Target-side semantic type of an imported record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Monster,
    Class,
    Npc,
    Item,
    Consumable,
    Resource,
    Panoply,
    Spell,
}

/// All entity kinds, in display order
pub const ALL_KINDS: &[EntityKind] = &[
    EntityKind::Monster,
    EntityKind::Class,
    EntityKind::Npc,
    EntityKind::Item,
    EntityKind::Consumable,
    EntityKind::Resource,
    EntityKind::Panoply,
    EntityKind::Spell,
];

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Monster => "monster",
            EntityKind::Class => "class",
            EntityKind::Npc => "npc",
            EntityKind::Item => "item",
            EntityKind::Consumable => "consumable",
            EntityKind::Resource => "resource",
            EntityKind::Panoply => "panoply",
            EntityKind::Spell => "spell",
        }
    }

    /// Characteristic group this kind shares limits and formulas with
    pub fn group(&self) -> Group {
        match self {
            EntityKind::Monster | EntityKind::Class | EntityKind::Npc => Group::Creature,
            EntityKind::Item
            | EntityKind::Consumable
            | EntityKind::Resource
            | EntityKind::Panoply => Group::Object,
            EntityKind::Spell => Group::Spell,
        }
    }

    /// Kinds stored in one of the item tables
    pub fn is_object(&self) -> bool {
        self.group() == Group::Object
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown entity kind: {0}")]
pub struct UnknownKind(pub String);

impl FromStr for EntityKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_KINDS
            .iter()
            .copied()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

/// Characteristic namespace shared by several entity kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Group {
    Creature,
    Object,
    Spell,
}

impl Group {
    pub fn as_str(&self) -> &'static str {
        match self {
            Group::Creature => "creature",
            Group::Object => "object",
            Group::Spell => "spell",
        }
    }

    pub fn kinds(&self) -> &'static [EntityKind] {
        match self {
            Group::Creature => &[EntityKind::Monster, EntityKind::Class, EntityKind::Npc],
            Group::Object => &[
                EntityKind::Item,
                EntityKind::Consumable,
                EntityKind::Resource,
                EntityKind::Panoply,
            ],
            Group::Spell => &[EntityKind::Spell],
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which rows of a group a characteristic lookup may use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityScope {
    /// Only the group-wide row
    All(Group),
    /// Group-wide row overlaid by the kind's own row
    Kind(EntityKind),
}

impl EntityScope {
    pub fn group(&self) -> Group {
        match self {
            EntityScope::All(group) => *group,
            EntityScope::Kind(kind) => kind.group(),
        }
    }
}

impl From<EntityKind> for EntityScope {
    fn from(kind: EntityKind) -> Self {
        EntityScope::Kind(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_belongs_to_its_group() {
        for kind in ALL_KINDS {
            assert!(kind.group().kinds().contains(kind), "{kind}");
        }
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!("Monster".parse::<EntityKind>().unwrap(), EntityKind::Monster);
        assert_eq!(" spell ".parse::<EntityKind>().unwrap(), EntityKind::Spell);
        assert!("breed".parse::<EntityKind>().is_err());
    }
}
