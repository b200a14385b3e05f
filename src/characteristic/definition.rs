use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use super::catalog::{Characteristic, CharacteristicRow, ConversionSamples, RowFields, ValueType};

/// Characteristic merged for one entity kind (or a whole group)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CharacteristicDefinition {
    pub key: String,
    pub name: String,
    pub unit: Option<String>,
    pub value_type: ValueType,
    pub db_column: Option<String>,
    pub min: Option<String>,
    pub max: Option<String>,
    pub formula: Option<String>,
    pub conversion_formula: Option<String>,
    pub default_value: Option<String>,
    pub extra: BTreeMap<String, Value>,
    #[serde(skip)]
    pub samples: Option<ConversionSamples>,
}

fn non_empty(value: &Option<String>) -> Option<&String> {
    value.as_ref().filter(|s| !s.trim().is_empty())
}

/// First non-empty value, highest priority first
fn prefer(candidates: [&Option<String>; 3]) -> Option<String> {
    candidates.into_iter().find_map(non_empty).cloned()
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

impl CharacteristicDefinition {
    /// Overlay `entity` onto `group`, then onto the characteristic's generic
    /// fields. Any non-empty overlay field wins.
    pub fn merge(
        characteristic: &Characteristic,
        group: Option<&CharacteristicRow>,
        entity: Option<&CharacteristicRow>,
    ) -> Self {
        let empty = RowFields::default();
        let base = &characteristic.fields;
        let group_fields = group.map(|row| &row.fields).unwrap_or(&empty);
        let entity_fields = entity.map(|row| &row.fields).unwrap_or(&empty);

        let mut extra = BTreeMap::new();
        for row in [group, entity].into_iter().flatten() {
            for (name, value) in &row.extra {
                if !is_empty_value(value) {
                    extra.insert(name.clone(), value.clone());
                }
            }
        }

        let samples = entity
            .and_then(|row| row.samples.clone())
            .or_else(|| group.and_then(|row| row.samples.clone()));

        Self {
            key: characteristic.key.clone(),
            name: characteristic.name.clone(),
            unit: characteristic.unit.clone(),
            value_type: characteristic.value_type,
            db_column: prefer([
                &entity_fields.db_column,
                &group_fields.db_column,
                &base.db_column,
            ]),
            min: prefer([&entity_fields.min, &group_fields.min, &base.min]),
            max: prefer([&entity_fields.max, &group_fields.max, &base.max]),
            formula: prefer([&entity_fields.formula, &group_fields.formula, &base.formula]),
            conversion_formula: prefer([
                &entity_fields.conversion_formula,
                &group_fields.conversion_formula,
                &base.conversion_formula,
            ]),
            default_value: prefer([
                &entity_fields.default_value,
                &group_fields.default_value,
                &base.default_value,
            ]),
            extra,
            samples,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::characteristic::catalog::CharacteristicCatalog;
    use crate::entity::{EntityKind, Group};

    #[test]
    fn test_overlay_prefers_non_empty_entity_fields() {
        let catalog = CharacteristicCatalog::from_json(
            r#"{"characteristics": [{
                "key": "life_creature",
                "formula": "level * 5",
                "min": "0",
                "rows": [
                    {"group": "creature", "min": "1", "max": "500", "extra": {"visible": true, "note": "group"}},
                    {"group": "creature", "entity": "monster", "max": "", "conversionFormula": "x / 8",
                     "extra": {"note": "monster", "tag": null}}
                ]
            }]}"#,
        )
        .unwrap();
        let life = &catalog.characteristics[0];
        let definition = CharacteristicDefinition::merge(
            life,
            life.group_row(Group::Creature),
            life.entity_row(EntityKind::Monster),
        );

        assert_eq!(definition.min.as_deref(), Some("1"));
        // blank entity value does not hide the group value
        assert_eq!(definition.max.as_deref(), Some("500"));
        assert_eq!(definition.formula.as_deref(), Some("level * 5"));
        assert_eq!(definition.conversion_formula.as_deref(), Some("x / 8"));
        assert_eq!(definition.extra["note"], Value::from("monster"));
        assert_eq!(definition.extra["visible"], Value::from(true));
        assert!(!definition.extra.contains_key("tag"));
    }
}
