//! Shared fixtures: an in-memory collector, rules built from JSON literals
//! and a small characteristic catalogue.

#![allow(dead_code)]

use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use serde_json::{json, Value};
use std::cell::RefCell;
use std::collections::HashMap;

use krosmoz_import::characteristic::CharacteristicResolver;
use krosmoz_import::collect::{CollectedPage, Collector, Filters, Page, PageMeta, RawRecord};
use krosmoz_import::rules::{EntityRules, RuleLoader};
use krosmoz_import::store::{RelationLink, RelationOwner, SqliteStore, Store};
use krosmoz_import::EntityKind;

pub const SOURCE: &str = "dofusdb";

pub static RESOLVER: Lazy<CharacteristicResolver> = Lazy::new(|| {
    CharacteristicResolver::from_json(
        r#"{"characteristics": [
            {"key": "level_creature", "dbColumn": "level", "rows": [
                {"group": "creature", "min": 1, "max": 20, "conversionFormula": "x / 10"}
            ]},
            {"key": "life_creature", "dbColumn": "life", "rows": [
                {"group": "creature", "min": 1, "max": "level * 40", "conversionFormula": "x / 10"}
            ]},
            {"key": "pa_creature", "dbColumn": "pa", "rows": [{"group": "creature", "min": 1, "max": 12}]},
            {"key": "level_object", "dbColumn": "level", "rows": [
                {"group": "object", "min": 1, "max": 20, "conversionFormula": "x / 10"}
            ]},
            {"key": "level_spell", "dbColumn": "level", "rows": [{"group": "spell", "min": 1, "max": 20}]}
        ]}"#,
    )
    .expect("test catalogue parses")
});

/// Records served by kind and id, recipes by result id
#[derive(Default)]
pub struct FakeCollector {
    records: HashMap<(EntityKind, String), RawRecord>,
    recipes: HashMap<String, RawRecord>,
    /// `kind:id` of every single-record fetch, in order
    pub fetched: RefCell<Vec<String>>,
}

impl FakeCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: EntityKind, record: Value) -> Self {
        let id = match &record["id"] {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        self.records.insert((kind, id), record);
        self
    }

    pub fn with_recipe(mut self, result_id: &str, recipe: Value) -> Self {
        self.recipes.insert(result_id.to_string(), recipe);
        self
    }

    pub fn fetch_count(&self, key: &str) -> usize {
        self.fetched.borrow().iter().filter(|k| *k == key).count()
    }
}

impl Collector for FakeCollector {
    fn fetch_one(&self, _source: &str, kind: EntityKind, external_id: &str) -> Result<Option<RawRecord>> {
        self.fetched.borrow_mut().push(format!("{}:{}", kind, external_id));
        Ok(self.records.get(&(kind, external_id.to_string())).cloned())
    }

    fn fetch_many(&self, _source: &str, kind: EntityKind, _filters: &Filters, page: Page) -> Result<CollectedPage> {
        let mut matching: Vec<(&String, &RawRecord)> = self
            .records
            .iter()
            .filter(|((k, _), _)| *k == kind)
            .map(|((_, id), record)| (id, record))
            .collect();
        matching.sort_by_key(|(id, _)| id.parse::<i64>().unwrap_or_default());

        let items: Vec<RawRecord> = matching
            .iter()
            .skip(page.offset)
            .take(page.limit)
            .map(|(_, record)| (*record).clone())
            .collect();
        Ok(CollectedPage {
            meta: PageMeta {
                total: matching.len(),
                collected: items.len(),
                offset: page.offset,
                limit: page.limit,
            },
            items,
        })
    }

    fn fetch_secondary(&self, _source: &str, external_id: &str) -> Result<Option<RawRecord>> {
        Ok(self.recipes.get(external_id).cloned())
    }
}

pub struct FakeRules {
    rules: HashMap<EntityKind, EntityRules>,
}

impl RuleLoader for FakeRules {
    fn load_entity_rules(&self, _source: &str, kind: EntityKind) -> Result<EntityRules> {
        match self.rules.get(&kind) {
            Some(rules) => Ok(rules.clone()),
            None => bail!("no rules for {}", kind),
        }
    }
}

fn rules(value: Value) -> EntityRules {
    serde_json::from_value(value).expect("test rules deserialize")
}

fn object_rules(table: &str) -> EntityRules {
    rules(json!({
        "target": {"storeEntity": table},
        "mapping": [
            {"sourcePath": "id", "formatters": [{"name": "toString"}], "targets": [{"model": table, "field": "dofusdb_id"}]},
            {"sourcePath": "name", "formatters": [{"name": "pickLang"}], "targets": [{"model": table, "field": "name"}]},
            {"sourcePath": "level", "formatters": [{"name": "levelConvert"}], "targets": [{"model": table, "field": "level"}]},
            {"sourcePath": "typeId", "formatters": [{"name": "toInt"}], "targets": [{"model": table, "field": "type_id"}]},
            {"sourcePath": "recipe", "formatters": [{"name": "recipeToIngredients"}], "targets": [
                {"model": table, "field": "recipe"},
                {"model": "relations", "field": "ingredients"}
            ]}
        ]
    }))
}

pub fn fake_rules() -> FakeRules {
    let mut map = HashMap::new();
    map.insert(
        EntityKind::Monster,
        rules(json!({
            "target": {"storeEntity": "monsters"},
            "mapping": [
                {"sourcePath": "id", "formatters": [{"name": "toString"}], "targets": [{"model": "monsters", "field": "dofusdb_id"}]},
                {"sourcePath": "name", "formatters": [{"name": "pickLang"}], "targets": [{"model": "creatures", "field": "name"}]},
                {"sourcePath": "level", "formatters": [{"name": "levelConvert"}], "targets": [{"model": "creatures", "field": "level"}]},
                {"sourcePath": "lifePoints", "formatters": [{"name": "lifeConvert"}], "targets": [{"model": "creatures", "field": "life"}]},
                {"sourcePath": "actionPoints", "formatters": [{"name": "nullableInt"}], "targets": [{"model": "creatures", "field": "pa"}]},
                {"sourcePath": "spells", "formatters": [{"name": "extractIds"}], "targets": [{"model": "relations", "field": "spells"}]},
                {"sourcePath": "drops", "formatters": [{"name": "extractIds", "args": {"field": "objectId"}}],
                 "targets": [{"model": "relations", "field": "drops"}]}
            ]
        })),
    );
    map.insert(
        EntityKind::Spell,
        rules(json!({
            "target": {"storeEntity": "spells"},
            "mapping": [
                {"sourcePath": "id", "formatters": [{"name": "toString"}], "targets": [{"model": "spells", "field": "dofusdb_id"}]},
                {"sourcePath": "name", "formatters": [{"name": "pickLang"}], "targets": [{"model": "spells", "field": "name"}]},
                {"sourcePath": "summons", "formatters": [{"name": "extractIds"}], "targets": [{"model": "relations", "field": "invocations"}]}
            ]
        })),
    );
    map.insert(
        EntityKind::Npc,
        rules(json!({"meta": {"catalogOnly": true}, "mapping": []})),
    );
    map.insert(EntityKind::Item, object_rules("items"));
    map.insert(EntityKind::Resource, object_rules("resources"));
    map.insert(EntityKind::Consumable, object_rules("consumables"));
    FakeRules { rules: map }
}

pub fn count(store: &SqliteStore, table: &str) -> i64 {
    store
        .connection()
        .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
        .unwrap()
}

pub fn relation(store: &SqliteStore, table: &str, id: i64, relation: &str) -> Vec<RelationLink> {
    store
        .load_relation(&RelationOwner {
            table: table.to_string(),
            id,
            relation: relation.to_string(),
        })
        .unwrap()
        .unwrap_or_default()
}

pub fn local_id(store: &SqliteStore, kind: EntityKind, external_id: &str) -> Option<i64> {
    store.find_local(kind, external_id).unwrap().map(|local| local.id)
}

pub fn bouftou() -> Value {
    json!({
        "id": 31,
        "name": {"fr": "Bouftou", "en": "Gobball"},
        "level": 50,
        "lifePoints": 400,
        "actionPoints": 6,
        "spells": [201],
        "drops": [{"objectId": 287, "percent": 12.5}, {"objectId": 311, "percent": 3}]
    })
}

pub fn resource(id: i64, type_id: i64) -> Value {
    json!({"id": id, "name": {"fr": format!("Ressource {}", id)}, "level": 10, "typeId": type_id})
}
