//! Formatters that convert DofusDB quantities through the characteristic
//! resolver. Non-numeric inputs become `null`.

use serde_json::Value;

use super::{arg_str, FormatterArgs, FormatterRegistry};
use crate::convert::{extract_path, is_blank, value_as_f64, ConversionContext, Element, ValueConverter};
use crate::formula;

const DEFAULT_LEVEL_PATH: &str = "level";

pub(super) fn register(registry: &mut FormatterRegistry) {
    registry.register("levelConvert", level_convert);
    registry.register("lifeConvert", life_convert);
    registry.register("attributeConvert", attribute_convert);
    registry.register("initiativeConvert", initiative_convert);
    registry.register("resistanceConvert", resistance_convert);
    registry.register("rarityByLevel", rarity_by_level);
    registry.register("defaultByLevel", default_by_level);
}

/// Converted level read from the raw record at `levelPath`
fn converted_level(args: &FormatterArgs, raw: &Value, converter: &ValueConverter<'_>) -> Option<i64> {
    let path = arg_str(args, "levelPath").unwrap_or(DEFAULT_LEVEL_PATH);
    value_as_f64(&extract_path(raw, path)).map(|level| converter.level(level))
}

fn level_convert(value: Value, _: &FormatterArgs, _: &Value, ctx: &ConversionContext<'_>) -> Value {
    match value_as_f64(&value) {
        Some(raw) => Value::from(ctx.converter().level(raw)),
        None => Value::Null,
    }
}

fn life_convert(value: Value, args: &FormatterArgs, raw: &Value, ctx: &ConversionContext<'_>) -> Value {
    let converter = ctx.converter();
    let Some(life) = value_as_f64(&value) else {
        return Value::Null;
    };
    let level = converted_level(args, raw, &converter).unwrap_or(1);
    Value::from(converter.life(life, level))
}

fn attribute_convert(value: Value, args: &FormatterArgs, _: &Value, ctx: &ConversionContext<'_>) -> Value {
    let Some(raw) = value_as_f64(&value) else {
        return Value::Null;
    };
    let key = match (arg_str(args, "characteristic"), arg_str(args, "field")) {
        (Some(key), _) => Some(key.to_string()),
        (None, Some(field)) => ctx.resolver.resolve_field_to_key(field, ctx.kind),
        (None, None) => None,
    };
    Value::from(ctx.converter().attribute(key.as_deref().unwrap_or_default(), raw))
}

fn initiative_convert(value: Value, _: &FormatterArgs, _: &Value, ctx: &ConversionContext<'_>) -> Value {
    match value_as_f64(&value) {
        Some(raw) => Value::from(ctx.converter().initiative(raw)),
        None => Value::Null,
    }
}

fn resistance_convert(value: Value, args: &FormatterArgs, _: &Value, ctx: &ConversionContext<'_>) -> Value {
    let element = arg_str(args, "element").and_then(Element::parse);
    match (element, value_as_f64(&value)) {
        (Some(element), Some(raw)) => Value::from(ctx.converter().resistance(element, raw)),
        (None, Some(_)) => {
            tracing::debug!("resistanceConvert without a known element, value kept");
            value
        }
        _ => Value::Null,
    }
}

fn rarity_by_level(_: Value, args: &FormatterArgs, raw: &Value, ctx: &ConversionContext<'_>) -> Value {
    let converter = ctx.converter();
    match converted_level(args, raw, &converter) {
        Some(level) => Value::from(converter.rarity(level)),
        None => Value::Null,
    }
}

/// Keep a present value; otherwise derive it from the characteristic's
/// formula at the converted level, else its default value
fn default_by_level(value: Value, args: &FormatterArgs, raw: &Value, ctx: &ConversionContext<'_>) -> Value {
    if !is_blank(&value) {
        return value;
    }
    let Some(key) = arg_str(args, "characteristic") else {
        return value;
    };
    let Some(definition) = ctx.resolver.definition(key, ctx.kind) else {
        return value;
    };

    let converter = ctx.converter();
    let level = converted_level(args, raw, &converter);
    let from_formula = level.and_then(|level| {
        let text = definition.formula.as_deref()?;
        formula::evaluate(text, &formula::vars([("level", level as f64)]))
    });

    match (from_formula, definition.default_value) {
        (Some(number), _) => Value::from(number.round() as i64),
        (None, Some(default)) => match formula::numeric_literal(&default) {
            Some(number) if number.fract() == 0.0 => Value::from(number as i64),
            Some(number) => Value::from(number),
            None => Value::String(default),
        },
        (None, None) => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::characteristic::CharacteristicResolver;
    use crate::entity::EntityKind;
    use serde_json::json;

    fn resolver() -> CharacteristicResolver {
        CharacteristicResolver::from_json(
            r#"{"characteristics": [
                {"key": "level_creature", "dbColumn": "level", "rows": [{"group": "creature", "min": 1, "max": 20}]},
                {"key": "level_object", "dbColumn": "level", "rows": [{"group": "object", "min": 1, "max": 20}]},
                {"key": "life_creature", "rows": [{"group": "creature", "conversionFormula": "x / 10 + level"}]},
                {"key": "strength_creature", "dbColumn": "strength", "rows": [{"group": "creature", "min": 0, "max": 25}]},
                {"key": "price_object", "rows": [{"group": "object", "formula": "level * 100", "defaultValue": "50"}]},
                {"key": "dice_object", "rows": [{"group": "object", "defaultValue": "1d6"}]}
            ]}"#,
        )
        .unwrap()
    }

    fn apply(kind: EntityKind, name: &str, value: Value, args: Value, raw: Value) -> Value {
        let resolver = resolver();
        let ctx = ConversionContext::new(kind, &resolver);
        let registry = FormatterRegistry::with_builtins();
        let args = args.as_object().cloned().unwrap_or_default();
        registry.apply(name, value, &args, &raw, &ctx)
    }

    #[test]
    fn test_level_convert() {
        assert_eq!(apply(EntityKind::Monster, "levelConvert", json!(150), json!({}), json!({})), json!(15));
        assert_eq!(apply(EntityKind::Monster, "levelConvert", json!(900), json!({}), json!({})), json!(20));
        assert_eq!(apply(EntityKind::Monster, "levelConvert", json!(null), json!({}), json!({})), json!(null));
    }

    #[test]
    fn test_life_convert_reads_level_from_raw() {
        let raw = json!({"grades": [{"level": 60, "lifePoints": 300}]});
        let life = apply(
            EntityKind::Monster,
            "lifeConvert",
            json!(300),
            json!({"levelPath": "grades.0.level"}),
            raw,
        );
        // level 60 -> 6; 300 / 10 + 6 = 36
        assert_eq!(life, json!(36));
    }

    #[test]
    fn test_attribute_convert_by_field() {
        let value = apply(
            EntityKind::Monster,
            "attributeConvert",
            json!(1200),
            json!({"field": "strength"}),
            json!({}),
        );
        assert_eq!(value, json!(25));
    }

    #[test]
    fn test_rarity_by_level() {
        let raw = json!({"level": 130});
        // level 130 -> 13 -> rarity 3
        assert_eq!(apply(EntityKind::Item, "rarityByLevel", json!(null), json!({}), raw), json!(3));
    }

    #[test]
    fn test_default_by_level() {
        let raw = json!({"level": 40});
        let args = json!({"characteristic": "price_object"});
        assert_eq!(
            apply(EntityKind::Item, "defaultByLevel", json!(null), args.clone(), raw.clone()),
            json!(400)
        );
        assert_eq!(apply(EntityKind::Item, "defaultByLevel", json!(12), args.clone(), raw), json!(12));
        // no level: falls back to the default value
        assert_eq!(apply(EntityKind::Item, "defaultByLevel", json!(""), args, json!({})), json!(50));
        assert_eq!(
            apply(
                EntityKind::Item,
                "defaultByLevel",
                json!(null),
                json!({"characteristic": "dice_object"}),
                json!({})
            ),
            json!("1d6")
        );
    }
}
