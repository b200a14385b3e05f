//! Type coercions and plain value shaping.

use serde_json::Value;

use super::{arg_i64, arg_str, FormatterArgs, FormatterRegistry};
use crate::convert::{is_blank, value_as_f64, value_as_i64, value_as_id, ConversionContext};

/// Creature sizes known to the Krosmoz model
pub const KROSMOZ_SIZES: &[&str] = &["tiny", "small", "medium", "large", "huge", "gargantuan"];

const DEFAULT_SIZE: &str = "medium";
const FALLBACK_LANG: &str = "fr";

pub(super) fn register(registry: &mut FormatterRegistry) {
    registry.register("toString", to_string);
    registry.register("toInt", to_int);
    registry.register("nullableInt", nullable_int);
    registry.register("toFloat", to_float);
    registry.register("boolToInt", bool_to_int);
    registry.register("clampInt", clamp_int);
    registry.register("pickLang", pick_lang);
    registry.register("truncate", truncate);
    registry.register("toJson", to_json);
    registry.register("extractIds", extract_ids);
    registry.register("mapSizeToKrosmoz", map_size_to_krosmoz);
    registry.register("defaultValue", default_value);
}

fn to_string(value: Value, _: &FormatterArgs, _: &Value, _: &ConversionContext<'_>) -> Value {
    Value::String(match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    })
}

fn to_int(value: Value, _: &FormatterArgs, _: &Value, _: &ConversionContext<'_>) -> Value {
    Value::from(value_as_i64(&value).unwrap_or(0))
}

fn nullable_int(value: Value, _: &FormatterArgs, _: &Value, _: &ConversionContext<'_>) -> Value {
    if is_blank(&value) {
        return Value::Null;
    }
    value_as_i64(&value).map(Value::from).unwrap_or(Value::Null)
}

fn to_float(value: Value, _: &FormatterArgs, _: &Value, _: &ConversionContext<'_>) -> Value {
    value_as_f64(&value)
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn bool_to_int(value: Value, _: &FormatterArgs, _: &Value, _: &ConversionContext<'_>) -> Value {
    let truthy = match &value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Value::Null => false,
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    };
    Value::from(i64::from(truthy))
}

fn clamp_int(value: Value, args: &FormatterArgs, _: &Value, _: &ConversionContext<'_>) -> Value {
    let mut number = value_as_i64(&value).unwrap_or(0);
    if let Some(min) = arg_i64(args, "min") {
        number = number.max(min);
    }
    if let Some(max) = arg_i64(args, "max") {
        number = number.min(max);
    }
    Value::from(number)
}

fn pick_lang(value: Value, args: &FormatterArgs, _: &Value, ctx: &ConversionContext<'_>) -> Value {
    let lang = arg_str(args, "lang").unwrap_or(ctx.lang);
    let fallback = arg_str(args, "fallback").unwrap_or(FALLBACK_LANG);

    match value {
        Value::String(_) => value,
        Value::Object(map) => {
            let pick = |key: &str| {
                map.get(key)
                    .and_then(Value::as_str)
                    .filter(|s| !s.trim().is_empty())
                    .map(str::to_string)
            };
            pick(lang)
                .or_else(|| pick(fallback))
                .or_else(|| {
                    map.values()
                        .filter_map(Value::as_str)
                        .find(|s| !s.trim().is_empty())
                        .map(str::to_string)
                })
                .map(Value::String)
                .unwrap_or(Value::Null)
        }
        _ => Value::Null,
    }
}

fn truncate(value: Value, args: &FormatterArgs, _: &Value, _: &ConversionContext<'_>) -> Value {
    let Some(max) = arg_i64(args, "max").filter(|max| *max >= 0) else {
        return value;
    };
    match value {
        Value::String(s) if s.chars().count() > max as usize => {
            Value::String(s.chars().take(max as usize).collect())
        }
        other => other,
    }
}

fn to_json(value: Value, _: &FormatterArgs, _: &Value, _: &ConversionContext<'_>) -> Value {
    match value {
        Value::Null => Value::Null,
        other => Value::String(other.to_string()),
    }
}

/// List of ids from scalars or objects (`field`, default `id`), optionally
/// filtered on `filterField == filterValue`
fn extract_ids(value: Value, args: &FormatterArgs, _: &Value, _: &ConversionContext<'_>) -> Value {
    let field = arg_str(args, "field").unwrap_or("id");
    let filter = arg_str(args, "filterField").map(|name| (name, args.get("filterValue")));

    let Value::Array(items) = value else {
        return Value::Array(Vec::new());
    };

    let ids = items
        .iter()
        .filter(|item| match filter {
            Some((name, expected)) => {
                let actual = item.get(name);
                match (actual, expected) {
                    (Some(actual), Some(expected)) => {
                        actual == expected || value_as_id(actual) == value_as_id(expected)
                    }
                    (None, _) => false,
                    (Some(_), None) => true,
                }
            }
            None => true,
        })
        .filter_map(|item| match item {
            Value::Object(_) => item.get(field).and_then(value_as_id),
            scalar => value_as_id(scalar),
        })
        .map(Value::String)
        .collect();
    Value::Array(ids)
}

fn map_size_to_krosmoz(value: Value, args: &FormatterArgs, _: &Value, _: &ConversionContext<'_>) -> Value {
    let default = arg_str(args, "default").unwrap_or(DEFAULT_SIZE);
    let size = value
        .as_str()
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| KROSMOZ_SIZES.contains(&s.as_str()));
    Value::String(size.unwrap_or_else(|| default.to_string()))
}

fn default_value(value: Value, args: &FormatterArgs, _: &Value, _: &ConversionContext<'_>) -> Value {
    if is_blank(&value) {
        args.get("value").cloned().unwrap_or(Value::Null)
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::characteristic::CharacteristicResolver;
    use crate::entity::EntityKind;
    use serde_json::json;

    fn apply(name: &str, value: Value, args: Value) -> Value {
        let resolver = CharacteristicResolver::default();
        let ctx = ConversionContext::new(EntityKind::Monster, &resolver).with_lang("en");
        let registry = FormatterRegistry::with_builtins();
        let args = args.as_object().cloned().unwrap_or_default();
        registry.apply(name, value, &args, &json!({}), &ctx)
    }

    #[test]
    fn test_coercions() {
        assert_eq!(apply("toString", json!(12), json!({})), json!("12"));
        assert_eq!(apply("toString", json!(null), json!({})), json!(""));
        assert_eq!(apply("toInt", json!("41.6"), json!({})), json!(42));
        assert_eq!(apply("toInt", json!("abc"), json!({})), json!(0));
        assert_eq!(apply("nullableInt", json!(""), json!({})), json!(null));
        assert_eq!(apply("nullableInt", json!("7"), json!({})), json!(7));
        assert_eq!(apply("boolToInt", json!("yes"), json!({})), json!(1));
        assert_eq!(apply("toFloat", json!("1.5"), json!({})), json!(1.5));
    }

    #[test]
    fn test_clamp_int() {
        assert_eq!(apply("clampInt", json!(50), json!({"min": 0, "max": 20})), json!(20));
        assert_eq!(apply("clampInt", json!(-3), json!({"min": 0})), json!(0));
    }

    #[test]
    fn test_pick_lang() {
        let names = json!({"fr": "Bouftou", "en": "Gobball", "de": ""});
        assert_eq!(apply("pickLang", names.clone(), json!({})), json!("Gobball"));
        assert_eq!(apply("pickLang", names.clone(), json!({"lang": "de"})), json!("Bouftou"));
        assert_eq!(
            apply("pickLang", json!({"es": "Jalató"}), json!({"lang": "pt"})),
            json!("Jalató")
        );
        assert_eq!(apply("pickLang", json!("plain"), json!({})), json!("plain"));
        assert_eq!(apply("pickLang", json!(3), json!({})), json!(null));
    }

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(apply("truncate", json!("Épée du Bouftou"), json!({"max": 4})), json!("Épée"));
        assert_eq!(apply("truncate", json!("abc"), json!({"max": 10})), json!("abc"));
    }

    #[test]
    fn test_extract_ids() {
        assert_eq!(apply("extractIds", json!([1, "2", null]), json!({})), json!(["1", "2"]));
        let drops = json!([{"objectId": 287, "percent": 10}, {"objectId": 311}]);
        assert_eq!(
            apply("extractIds", drops, json!({"field": "objectId"})),
            json!(["287", "311"])
        );
        let effects = json!([
            {"effectId": 181, "diceNum": 36},
            {"effectId": 96, "diceNum": 10},
            {"effectId": "181", "diceNum": 40}
        ]);
        assert_eq!(
            apply(
                "extractIds",
                effects,
                json!({"field": "diceNum", "filterField": "effectId", "filterValue": 181})
            ),
            json!(["36", "40"])
        );
        assert_eq!(apply("extractIds", json!(null), json!({})), json!([]));
    }

    #[test]
    fn test_map_size() {
        assert_eq!(apply("mapSizeToKrosmoz", json!("Large"), json!({})), json!("large"));
        assert_eq!(apply("mapSizeToKrosmoz", json!("colossal"), json!({})), json!("medium"));
        assert_eq!(
            apply("mapSizeToKrosmoz", json!(null), json!({"default": "small"})),
            json!("small")
        );
    }

    #[test]
    fn test_to_json_and_default() {
        assert_eq!(apply("toJson", json!([1, 2]), json!({})), json!("[1,2]"));
        assert_eq!(apply("defaultValue", json!(" "), json!({"value": 3})), json!(3));
        assert_eq!(apply("defaultValue", json!(5), json!({"value": 3})), json!(5));
    }
}
