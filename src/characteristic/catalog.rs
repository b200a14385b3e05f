use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

use crate::entity::{EntityKind, Group};
use crate::fit::SampleSeries;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read characteristic catalogue {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid characteristic catalogue: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate characteristic key: {0}")]
    DuplicateKey(String),
}

/// Value type of a characteristic, as stored by the target model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    #[default]
    Int,
    Float,
    String,
    Bool,
}

impl ValueType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, ValueType::Int | ValueType::Float)
    }
}

/// Source/target samples used to suggest a conversion formula
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionSamples {
    #[serde(default)]
    pub source: SampleSeries,
    #[serde(default)]
    pub target: SampleSeries,
}

/// Overridable fields shared by a characteristic and its rows
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowFields {
    #[serde(default, deserialize_with = "text_or_number")]
    pub db_column: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub min: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub max: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub formula: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub conversion_formula: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub default_value: Option<String>,
}

/// One row of a group table: group-wide when `entity` is `None` (`"*"`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacteristicRow {
    pub group: Group,
    #[serde(default, deserialize_with = "entity_or_wildcard")]
    pub entity: Option<EntityKind>,
    #[serde(flatten)]
    pub fields: RowFields,
    /// Group-specific columns (forgemagie, rune prices, ...)
    #[serde(default)]
    pub extra: BTreeMap<String, Value>,
    #[serde(default)]
    pub samples: Option<ConversionSamples>,
}

/// A characteristic with its generic fields and per-group rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Characteristic {
    pub key: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default, rename = "type")]
    pub value_type: ValueType,
    #[serde(flatten)]
    pub fields: RowFields,
    #[serde(default)]
    pub rows: Vec<CharacteristicRow>,
}

impl Characteristic {
    pub fn group_row(&self, group: Group) -> Option<&CharacteristicRow> {
        self.rows
            .iter()
            .find(|row| row.group == group && row.entity.is_none())
    }

    pub fn entity_row(&self, kind: EntityKind) -> Option<&CharacteristicRow> {
        self.rows
            .iter()
            .find(|row| row.group == kind.group() && row.entity == Some(kind))
    }

    pub fn applies_to(&self, group: Group) -> bool {
        self.rows.iter().any(|row| row.group == group)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CharacteristicCatalog {
    #[serde(default)]
    pub characteristics: Vec<Characteristic>,
}

impl CharacteristicCatalog {
    pub fn from_json(text: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }
}

/// Accept `"12"`, `12` or `null` for formula-ish columns
fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        Some(other) => Some(other.to_string()),
    })
}

fn entity_or_wildcard<'de, D>(deserializer: D) -> Result<Option<EntityKind>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    match value.as_deref().map(str::trim) {
        None | Some("") | Some("*") => Ok(None),
        Some(kind) => kind.parse().map(Some).map_err(serde::de::Error::custom),
    }
}
