//! Static table schemas of the Krosmoz store

use crate::entity::EntityKind;

/// Column data type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
    Boolean,
    /// JSON blob stored as text
    Json,
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub col_type: ColumnType,
    pub nullable: bool,
}

impl Column {
    /// Create an optional (nullable) column
    pub const fn new(name: &'static str, col_type: ColumnType) -> Self {
        Self {
            name,
            col_type,
            nullable: true,
        }
    }

    /// Create a required (non-nullable) column
    pub const fn required(name: &'static str, col_type: ColumnType) -> Self {
        Self {
            name,
            col_type,
            nullable: false,
        }
    }
}

/// Foreign key reference
#[derive(Debug, Clone)]
pub struct ForeignKey {
    pub column: &'static str,
    pub references_table: &'static str,
    pub references_column: &'static str,
}

impl ForeignKey {
    pub const fn new(column: &'static str, references_table: &'static str) -> Self {
        Self {
            column,
            references_table,
            references_column: "id",
        }
    }
}

/// Index definition
#[derive(Debug, Clone)]
pub struct Index {
    pub columns: &'static [&'static str],
    pub unique: bool,
}

impl Index {
    pub const fn on(columns: &'static [&'static str]) -> Self {
        Self {
            columns,
            unique: false,
        }
    }

    pub const fn unique(columns: &'static [&'static str]) -> Self {
        Self {
            columns,
            unique: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TableSchema {
    pub name: &'static str,
    pub columns: &'static [Column],
    pub foreign_keys: &'static [ForeignKey],
    pub indexes: &'static [Index],
}

impl TableSchema {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Parent row this table extends (`monsters.creature_id → creatures`)
    pub fn parent(&self) -> Option<&ForeignKey> {
        self.foreign_keys.first()
    }
}

use ColumnType::*;

const RESISTANCES: [Column; 5] = [
    Column::new("res_neutre", Integer),
    Column::new("res_terre", Integer),
    Column::new("res_feu", Integer),
    Column::new("res_air", Integer),
    Column::new("res_eau", Integer),
];

// =============================================================================
// Creatures
// =============================================================================

pub static CREATURES: TableSchema = TableSchema {
    name: "creatures",
    columns: &[
        Column::required("id", Integer),
        Column::new("dofusdb_id", Text),
        Column::new("name", Text),
        Column::new("description", Text),
        Column::new("level", Integer),
        Column::new("life", Integer),
        Column::new("strength", Integer),
        Column::new("intelligence", Integer),
        Column::new("agility", Integer),
        Column::new("chance", Integer),
        Column::new("wisdom", Integer),
        Column::new("vitality", Integer),
        Column::new("initiative", Integer),
        Column::new("pa", Integer),
        Column::new("pm", Integer),
        Column::new("image", Text),
        Column::new("auto_update", Boolean),
    ],
    foreign_keys: &[],
    indexes: &[],
};

pub static MONSTERS: TableSchema = TableSchema {
    name: "monsters",
    columns: &[
        Column::required("id", Integer),
        Column::required("dofusdb_id", Text),
        Column::new("creature_id", Integer),
        Column::new("size", Text),
        Column::new("race_id", Integer),
        Column::new("is_boss", Boolean),
        Column::new("grades", Json),
        RESISTANCES[0],
        RESISTANCES[1],
        RESISTANCES[2],
        RESISTANCES[3],
        RESISTANCES[4],
    ],
    foreign_keys: &[ForeignKey::new("creature_id", "creatures")],
    indexes: &[Index::unique(&["dofusdb_id"])],
};

pub static CLASSES: TableSchema = TableSchema {
    name: "classes",
    columns: &[
        Column::required("id", Integer),
        Column::required("dofusdb_id", Text),
        Column::new("creature_id", Integer),
        Column::new("name", Text),
        Column::new("description", Text),
        Column::new("life_per_level", Integer),
        RESISTANCES[0],
        RESISTANCES[1],
        RESISTANCES[2],
        RESISTANCES[3],
        RESISTANCES[4],
    ],
    foreign_keys: &[ForeignKey::new("creature_id", "creatures")],
    indexes: &[Index::unique(&["dofusdb_id"])],
};

pub static NPCS: TableSchema = TableSchema {
    name: "npcs",
    columns: &[
        Column::required("id", Integer),
        Column::required("dofusdb_id", Text),
        Column::new("creature_id", Integer),
        Column::new("gender", Integer),
        Column::new("dialogs", Json),
    ],
    foreign_keys: &[ForeignKey::new("creature_id", "creatures")],
    indexes: &[Index::unique(&["dofusdb_id"])],
};

// =============================================================================
// Objects
// =============================================================================

macro_rules! object_table {
    ($ident:ident, $name:literal) => {
        pub static $ident: TableSchema = TableSchema {
            name: $name,
            columns: &[
                Column::required("id", Integer),
                Column::required("dofusdb_id", Text),
                Column::new("name", Text),
                Column::new("description", Text),
                Column::new("level", Integer),
                Column::new("rarity", Integer),
                Column::new("price", Integer),
                Column::new("type_id", Integer),
                Column::new("weight", Integer),
                Column::new("image", Text),
                Column::new("effects", Json),
                Column::new("recipe", Json),
                Column::new("auto_update", Boolean),
                RESISTANCES[0],
                RESISTANCES[1],
                RESISTANCES[2],
                RESISTANCES[3],
                RESISTANCES[4],
            ],
            foreign_keys: &[],
            indexes: &[Index::unique(&["dofusdb_id"]), Index::on(&["type_id"])],
        };
    };
}

object_table!(ITEMS, "items");
object_table!(CONSUMABLES, "consumables");
object_table!(RESOURCES, "resources");

pub static PANOPLIES: TableSchema = TableSchema {
    name: "panoplies",
    columns: &[
        Column::required("id", Integer),
        Column::required("dofusdb_id", Text),
        Column::new("name", Text),
        Column::new("level", Integer),
        Column::new("bonus", Json),
        Column::new("item_ids", Json),
    ],
    foreign_keys: &[],
    indexes: &[Index::unique(&["dofusdb_id"])],
};

// =============================================================================
// Spells
// =============================================================================

pub static SPELLS: TableSchema = TableSchema {
    name: "spells",
    columns: &[
        Column::required("id", Integer),
        Column::required("dofusdb_id", Text),
        Column::new("name", Text),
        Column::new("description", Text),
        Column::new("level", Integer),
        Column::new("pa", Integer),
        Column::new("po_min", Integer),
        Column::new("po_max", Integer),
        Column::new("area", Text),
        Column::new("element", Text),
        Column::new("cast_per_turn", Integer),
        Column::new("effects", Json),
        Column::new("image", Text),
    ],
    foreign_keys: &[],
    indexes: &[Index::unique(&["dofusdb_id"])],
};

// =============================================================================
// Cross references
// =============================================================================

pub static RELATIONS: TableSchema = TableSchema {
    name: "relations",
    columns: &[
        Column::required("id", Integer),
        Column::required("owner_table", Text),
        Column::required("owner_id", Integer),
        Column::required("relation", Text),
        Column::required("target_table", Text),
        Column::required("target_id", Integer),
        Column::new("quantity", Integer),
        Column::new("role", Text),
    ],
    foreign_keys: &[],
    indexes: &[
        Index::unique(&["owner_table", "owner_id", "relation", "target_table", "target_id"]),
        Index::on(&["target_table", "target_id"]),
    ],
};

/// All tables, parents before the tables extending them
pub static ALL_TABLES: &[&TableSchema] = &[
    &CREATURES,
    &MONSTERS,
    &CLASSES,
    &NPCS,
    &ITEMS,
    &CONSUMABLES,
    &RESOURCES,
    &PANOPLIES,
    &SPELLS,
    &RELATIONS,
];

pub fn get_table(name: &str) -> Option<&'static TableSchema> {
    ALL_TABLES.iter().copied().find(|t| t.name == name)
}

pub fn table_names() -> Vec<&'static str> {
    ALL_TABLES.iter().map(|t| t.name).collect()
}

/// DofusDB type ids stored as resources
pub const RESOURCE_TYPE_IDS: &[i64] = &[
    15, 34, 35, 36, 38, 39, 40, 41, 46, 47, 48, 50, 51, 52, 53, 54, 55, 56, 57, 58, 59, 60, 65, 66, 68,
    71, 78, 84, 90, 95, 96, 98, 103, 104, 105, 106, 107, 108, 109, 111,
];

/// DofusDB type ids stored as consumables
pub const CONSUMABLE_TYPE_IDS: &[i64] = &[12, 13, 14, 26, 43, 44, 49, 69, 70, 74, 76, 79, 86, 94];

/// Table a kind is stored in when nothing in the record overrides it
pub fn default_table(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Monster => MONSTERS.name,
        EntityKind::Class => CLASSES.name,
        EntityKind::Npc => NPCS.name,
        EntityKind::Item => ITEMS.name,
        EntityKind::Consumable => CONSUMABLES.name,
        EntityKind::Resource => RESOURCES.name,
        EntityKind::Panoply => PANOPLIES.name,
        EntityKind::Spell => SPELLS.name,
    }
}

/// Object kind a DofusDB type id belongs to. Unclassified ids are equipment.
pub fn object_kind_for_type(type_id: i64) -> EntityKind {
    if RESOURCE_TYPE_IDS.contains(&type_id) {
        EntityKind::Resource
    } else if CONSUMABLE_TYPE_IDS.contains(&type_id) {
        EntityKind::Consumable
    } else {
        EntityKind::Item
    }
}

/// Object table for a DofusDB type id, if the id is classified
pub fn object_table_for_type(type_id: i64) -> Option<&'static str> {
    if RESOURCE_TYPE_IDS.contains(&type_id) {
        Some(RESOURCES.name)
    } else if CONSUMABLE_TYPE_IDS.contains(&type_id) {
        Some(CONSUMABLES.name)
    } else {
        None
    }
}
