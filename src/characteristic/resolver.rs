use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

use super::catalog::{CatalogError, Characteristic, CharacteristicCatalog};
use super::definition::CharacteristicDefinition;
use crate::entity::EntityScope;
use crate::fit::{fit_all, generate_table_from_pairs, pair_samples, FitReport, RegressionFit};
use crate::formula::{self, Variables};

/// Resolved `[min, max]` bounds. Either side may be unresolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Limits {
    pub min: Option<i64>,
    pub max: Option<i64>,
}

impl Limits {
    /// Clamp when both bounds resolve, pass through otherwise. Inverted
    /// bounds pass the value through and are logged.
    pub fn clamp(&self, value: i64) -> i64 {
        match (self.min, self.max) {
            (Some(min), Some(max)) if min <= max => value.clamp(min, max),
            (Some(min), Some(max)) => {
                tracing::warn!(min, max, value, "characteristic limits are inverted, value not clamped");
                value
            }
            _ => value,
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min.map_or(true, |min| value >= min as f64)
            && self.max.map_or(true, |max| value <= max as f64)
    }
}

/// Conversion formula suggested from a characteristic's stored samples
#[derive(Debug, Clone, Serialize)]
pub struct FormulaSuggestion {
    pub key: String,
    pub report: FitReport,
    pub best: Option<RegressionFit>,
    /// Literal table usable when no closed form is trusted
    pub table: String,
    pub pairs: usize,
    pub dropped: usize,
}

/// Looks up characteristic definitions, limits and conversion formulas
#[derive(Debug, Clone, Default)]
pub struct CharacteristicResolver {
    catalog: CharacteristicCatalog,
    by_key: HashMap<String, usize>,
}

impl CharacteristicResolver {
    pub fn new(catalog: CharacteristicCatalog) -> Result<Self, CatalogError> {
        let mut by_key = HashMap::new();
        for (idx, characteristic) in catalog.characteristics.iter().enumerate() {
            if by_key.insert(characteristic.key.clone(), idx).is_some() {
                return Err(CatalogError::DuplicateKey(characteristic.key.clone()));
            }
        }
        Ok(Self { catalog, by_key })
    }

    pub fn from_json(text: &str) -> Result<Self, CatalogError> {
        Self::new(CharacteristicCatalog::from_json(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        Self::new(CharacteristicCatalog::load(path)?)
    }

    pub fn len(&self) -> usize {
        self.catalog.characteristics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalog.characteristics.is_empty()
    }

    fn characteristic(&self, key: &str) -> Option<&Characteristic> {
        self.by_key
            .get(key)
            .map(|idx| &self.catalog.characteristics[*idx])
    }

    /// Merged definition of `key` for a kind, or for a whole group. `None`
    /// when the key is unknown or has no row in the scope's group.
    pub fn definition(
        &self,
        key: &str,
        scope: impl Into<EntityScope>,
    ) -> Option<CharacteristicDefinition> {
        let scope = scope.into();
        let characteristic = self.characteristic(key)?;
        let group = scope.group();

        let group_row = characteristic.group_row(group);
        let entity_row = match scope {
            EntityScope::Kind(kind) => characteristic.entity_row(kind),
            EntityScope::All(_) => None,
        };
        if group_row.is_none() && entity_row.is_none() {
            return None;
        }

        Some(CharacteristicDefinition::merge(
            characteristic,
            group_row,
            entity_row,
        ))
    }

    /// Resolve `min`/`max` independently: literal, else formula rounded
    pub fn limits(
        &self,
        key: &str,
        scope: impl Into<EntityScope>,
        variables: &Variables,
    ) -> Option<Limits> {
        let definition = self.definition(key, scope)?;
        Some(Limits {
            min: resolve_bound(definition.min.as_deref(), variables),
            max: resolve_bound(definition.max.as_deref(), variables),
        })
    }

    pub fn conversion_formula(&self, key: &str, scope: impl Into<EntityScope>) -> Option<String> {
        self.definition(key, scope)?.conversion_formula
    }

    /// Map a field name or column alias to a characteristic key
    pub fn resolve_field_to_key(&self, field: &str, scope: impl Into<EntityScope>) -> Option<String> {
        let scope = scope.into();
        let group = scope.group();

        if let Some(characteristic) = self.characteristic(field) {
            if characteristic.applies_to(group) {
                return Some(characteristic.key.clone());
            }
        }

        let by_column = self.catalog.characteristics.iter().find(|characteristic| {
            characteristic.applies_to(group)
                && self
                    .definition(&characteristic.key, scope)
                    .and_then(|definition| definition.db_column)
                    .is_some_and(|column| column == field)
        });
        if let Some(characteristic) = by_column {
            return Some(characteristic.key.clone());
        }

        let suffixed = format!("{}_{}", field, group.as_str());
        self.characteristic(&suffixed)
            .filter(|characteristic| characteristic.applies_to(group))
            .map(|characteristic| characteristic.key.clone())
    }

    /// Fit the stored conversion samples of `key` and suggest a formula
    pub fn suggest_conversion(
        &self,
        key: &str,
        scope: impl Into<EntityScope>,
    ) -> Option<FormulaSuggestion> {
        let definition = self.definition(key, scope)?;
        let samples = definition.samples?;
        let paired = pair_samples(&samples.source, &samples.target);
        let report = fit_all(&paired.pairs);

        Some(FormulaSuggestion {
            key: definition.key,
            best: report.best().cloned(),
            table: generate_table_from_pairs(&paired.pairs),
            report,
            pairs: paired.pairs.len(),
            dropped: paired.dropped,
        })
    }
}

fn resolve_bound(text: Option<&str>, variables: &Variables) -> Option<i64> {
    let text = text?.trim();
    if text.is_empty() {
        return None;
    }
    if let Some(value) = formula::numeric_literal(text) {
        return Some(value as i64);
    }
    formula::evaluate(text, variables).map(|value| value.round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityKind, Group};
    use crate::formula::vars;

    fn resolver() -> CharacteristicResolver {
        CharacteristicResolver::from_json(
            r#"{"characteristics": [
                {"key": "level_creature", "dbColumn": "level", "rows": [
                    {"group": "creature", "min": 1, "max": 20},
                    {"group": "creature", "entity": "class", "max": 30}
                ]},
                {"key": "level_object", "dbColumn": "level", "rows": [
                    {"group": "object", "min": "1", "max": "[level_cap] ?? 25"}
                ]},
                {"key": "life_creature", "dbColumn": "life", "rows": [
                    {"group": "creature", "min": "level", "max": "level * 10 + 0.6",
                     "conversionFormula": "x / 8 + level"}
                ]},
                {"key": "pa_creature", "rows": [
                    {"group": "creature", "dbColumn": "action_points", "min": 3, "max": 12}
                ]}
            ]}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_definition_scopes() {
        let resolver = resolver();
        let class = resolver.definition("level_creature", EntityKind::Class).unwrap();
        assert_eq!(class.max.as_deref(), Some("30"));
        let monster = resolver.definition("level_creature", EntityKind::Monster).unwrap();
        assert_eq!(monster.max.as_deref(), Some("20"));
        let group = resolver
            .definition("level_creature", EntityScope::All(Group::Creature))
            .unwrap();
        assert_eq!(group.max.as_deref(), Some("20"));
    }

    #[test]
    fn test_definition_never_crosses_groups() {
        let resolver = resolver();
        assert!(resolver.definition("level_creature", EntityKind::Item).is_none());
        assert!(resolver.definition("unknown", EntityKind::Monster).is_none());
    }

    #[test]
    fn test_limits_literal_and_formula() {
        let resolver = resolver();
        let limits = resolver
            .limits("life_creature", EntityKind::Monster, &vars([("level", 4.0)]))
            .unwrap();
        assert_eq!(limits, Limits { min: Some(4), max: Some(41) });

        // formula bounds without variables stay unresolved
        let limits = resolver
            .limits("life_creature", EntityKind::Monster, &Variables::new())
            .unwrap();
        assert_eq!(limits, Limits::default());

        let limits = resolver
            .limits("level_object", EntityKind::Resource, &Variables::new())
            .unwrap();
        assert_eq!(limits, Limits { min: Some(1), max: Some(25) });
    }

    #[test]
    fn test_clamp() {
        let both = Limits { min: Some(1), max: Some(20) };
        assert_eq!(both.clamp(0), 1);
        assert_eq!(both.clamp(25), 20);
        assert_eq!(both.clamp(7), 7);
        let half = Limits { min: Some(1), max: None };
        assert_eq!(half.clamp(-5), -5);
    }

    #[test]
    fn test_inverted_limits_pass_through() {
        let inverted = Limits { min: Some(20), max: Some(1) };
        assert_eq!(inverted.clamp(50), 50);
        assert_eq!(inverted.clamp(-3), -3);
        assert!(!inverted.contains(10.0));
    }

    #[test]
    fn test_resolve_field_to_key() {
        let resolver = resolver();
        assert_eq!(
            resolver.resolve_field_to_key("level_creature", EntityKind::Npc).as_deref(),
            Some("level_creature")
        );
        assert_eq!(
            resolver.resolve_field_to_key("level", EntityKind::Monster).as_deref(),
            Some("level_creature")
        );
        assert_eq!(
            resolver.resolve_field_to_key("level", EntityKind::Item).as_deref(),
            Some("level_object")
        );
        assert_eq!(
            resolver.resolve_field_to_key("action_points", EntityKind::Class).as_deref(),
            Some("pa_creature")
        );
        assert_eq!(
            resolver.resolve_field_to_key("pa", EntityKind::Class).as_deref(),
            Some("pa_creature")
        );
        assert!(resolver.resolve_field_to_key("level_creature", EntityKind::Spell).is_none());
        assert!(resolver.resolve_field_to_key("name", EntityKind::Monster).is_none());
    }

    #[test]
    fn test_conversion_formula() {
        let resolver = resolver();
        assert_eq!(
            resolver.conversion_formula("life_creature", EntityKind::Monster).as_deref(),
            Some("x / 8 + level")
        );
        assert!(resolver.conversion_formula("level_creature", EntityKind::Monster).is_none());
    }

    #[test]
    fn test_duplicate_keys_rejected() {
        let result = CharacteristicResolver::from_json(
            r#"{"characteristics": [{"key": "a"}, {"key": "a"}]}"#,
        );
        assert!(matches!(result, Err(CatalogError::DuplicateKey(_))));
    }
}
