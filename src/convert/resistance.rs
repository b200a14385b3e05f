use serde_json::Value;

use super::path::{lookup, value_as_f64};
use super::record::Bucket;
use super::values::{Element, ValueConverter};
use crate::entity::EntityKind;
use crate::formula::Variables;

/// Where the resistance sub-document lives, and which bucket receives the
/// converted fields, for the kinds that support the batch pass
pub fn batch_layout(kind: EntityKind) -> Option<(&'static str, &'static str)> {
    match kind {
        EntityKind::Monster => Some(("grades.0", "monsters")),
        EntityKind::Class => Some(("resistances", "classes")),
        EntityKind::Item => Some(("resistances", "items")),
        _ => None,
    }
}

/// Convert the five elemental resistances together.
///
/// Elements are converted one by one, then the summed magnitude is capped by
/// the `res_total_{group}` maximum when it resolves, scaling every element
/// proportionally.
pub fn convert_resistances(raw: &Value, converter: &ValueConverter<'_>) -> Option<(&'static str, Bucket)> {
    let (path, bucket) = batch_layout(converter.kind())?;
    let document = lookup(raw, path)?;
    if !document.is_object() {
        return None;
    }

    let mut converted: Vec<(Element, i64)> = Element::ALL
        .into_iter()
        .filter_map(|element| {
            let raw_value = document.get(element.source_field()).and_then(value_as_f64)?;
            Some((element, converter.resistance(element, raw_value)))
        })
        .collect();

    let total = converted
        .iter()
        .fold(0i64, |acc, (_, v)| acc.saturating_add(v.saturating_abs()));
    let total_key = format!("res_total_{}", converter.kind().group().as_str());
    let mut vars = Variables::new();
    vars.insert("total".to_string(), total as f64);
    let capped = converter.clamp(&total_key, total, &vars);
    if capped < total && total > 0 {
        let ratio = capped as f64 / total as f64;
        for (element, value) in converted.iter_mut() {
            *value = (*value as f64 * ratio).round() as i64;
            tracing::debug!(field = element.field(), value = *value, "resistance scaled to total cap");
        }
    }

    let fields: Bucket = converted
        .into_iter()
        .map(|(element, value)| (element.field().to_string(), Value::from(value)))
        .collect();
    Some((bucket, fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::characteristic::CharacteristicResolver;
    use serde_json::json;

    fn resolver() -> CharacteristicResolver {
        CharacteristicResolver::from_json(
            r#"{"characteristics": [
                {"key": "res_feu_creature", "rows": [{"group": "creature", "min": -50, "max": 50}]},
                {"key": "res_total_creature", "rows": [{"group": "creature", "min": 0, "max": 20}]}
            ]}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_monster_resistances() {
        let resolver = CharacteristicResolver::default();
        let converter = ValueConverter::new(&resolver, EntityKind::Monster);
        let raw = json!({"grades": [{"fireResistance": 10, "waterResistance": -6, "airResistance": "4"}]});
        let (bucket, fields) = convert_resistances(&raw, &converter).unwrap();
        assert_eq!(bucket, "monsters");
        assert_eq!(fields["res_feu"], json!(5));
        assert_eq!(fields["res_eau"], json!(-3));
        assert_eq!(fields["res_air"], json!(2));
        assert!(!fields.contains_key("res_terre"));
    }

    #[test]
    fn test_total_cap_scales_elements() {
        let resolver = resolver();
        let converter = ValueConverter::new(&resolver, EntityKind::Monster);
        let raw = json!({"grades": [{"fireResistance": 40, "earthResistance": 20}]});
        let (_, fields) = convert_resistances(&raw, &converter).unwrap();
        // 20 + 10 = 30 capped to 20
        assert_eq!(fields["res_feu"], json!(13));
        assert_eq!(fields["res_terre"], json!(7));
    }

    #[test]
    fn test_huge_resistances_saturate_then_cap() {
        let resolver = resolver();
        let converter = ValueConverter::new(&resolver, EntityKind::Monster);
        let raw = json!({"grades": [{"fireResistance": 1e300, "earthResistance": 1e300}]});
        let (_, fields) = convert_resistances(&raw, &converter).unwrap();
        // fire clamps to 50, earth saturates, the sum saturates and is capped to 20
        assert_eq!(fields["res_terre"], json!(20));
        assert_eq!(fields["res_feu"], json!(0));
    }

    #[test]
    fn test_unsupported_kind_or_missing_document() {
        let resolver = CharacteristicResolver::default();
        let spells = ValueConverter::new(&resolver, EntityKind::Spell);
        assert!(convert_resistances(&json!({}), &spells).is_none());
        let monsters = ValueConverter::new(&resolver, EntityKind::Monster);
        assert!(convert_resistances(&json!({"grades": []}), &monsters).is_none());
    }
}
