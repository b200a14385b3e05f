//! Recipe normalization into `[{ingredientExternalId, quantity}]`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::{arg_str, FormatterArgs, FormatterRegistry};
use crate::convert::{extract_path, value_as_i64, value_as_id, ConversionContext};

const DEFAULT_FALLBACK_PATH: &str = "recipeIds";

/// One normalized recipe line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    pub ingredient_external_id: String,
    pub quantity: u32,
}

pub(super) fn register(registry: &mut FormatterRegistry) {
    registry.register("recipeToIngredients", recipe_to_ingredients);
    registry.register("recipeIdsToIngredients", recipe_ids_to_ingredients);
}

/// Zip `ingredientIds` with `quantities`; a missing or non-positive quantity
/// counts as 1
pub fn ingredients_from_pair(recipe: &Value) -> Vec<Ingredient> {
    let ids = recipe
        .get("ingredientIds")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    let quantities = recipe
        .get("quantities")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    ids.iter()
        .enumerate()
        .filter_map(|(idx, id)| {
            let id = value_as_id(id)?;
            let quantity = quantities
                .get(idx)
                .and_then(value_as_i64)
                .filter(|q| *q > 0)
                .unwrap_or(1);
            Some(Ingredient {
                ingredient_external_id: id,
                quantity: u32::try_from(quantity).unwrap_or(u32::MAX),
            })
        })
        .collect()
}

/// Group a flat id list; each id's quantity is its number of occurrences.
/// First-appearance order is kept.
pub fn ingredients_from_ids(ids: &[Value]) -> Vec<Ingredient> {
    let mut ingredients: Vec<Ingredient> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    for id in ids.iter().filter_map(value_as_id) {
        match positions.get(&id) {
            Some(&idx) => {
                let existing = &mut ingredients[idx];
                existing.quantity = existing.quantity.saturating_add(1);
            }
            None => {
                positions.insert(id.clone(), ingredients.len());
                ingredients.push(Ingredient {
                    ingredient_external_id: id,
                    quantity: 1,
                });
            }
        }
    }
    ingredients
}

fn to_value(ingredients: Vec<Ingredient>) -> Value {
    serde_json::to_value(ingredients).unwrap_or(Value::Array(Vec::new()))
}

fn recipe_to_ingredients(value: Value, args: &FormatterArgs, raw: &Value, _: &ConversionContext<'_>) -> Value {
    match &value {
        Value::Object(_) => to_value(ingredients_from_pair(&value)),
        // DofusDB list responses wrap the recipe in an array
        Value::Array(items) if items.first().is_some_and(Value::is_object) => {
            to_value(ingredients_from_pair(&items[0]))
        }
        _ => {
            let path = arg_str(args, "fallbackPath").unwrap_or(DEFAULT_FALLBACK_PATH);
            match extract_path(raw, path) {
                Value::Array(ids) => to_value(ingredients_from_ids(&ids)),
                _ => Value::Array(Vec::new()),
            }
        }
    }
}

fn recipe_ids_to_ingredients(value: Value, _: &FormatterArgs, _: &Value, _: &ConversionContext<'_>) -> Value {
    match value {
        Value::Array(ids) => to_value(ingredients_from_ids(&ids)),
        _ => Value::Array(Vec::new()),
    }
}
