//! Declarative mapping rules, one set per entity kind and source.

mod json;

pub use json::JsonRuleLoader;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::entity::EntityKind;
use crate::formatter::FormatterArgs;

/// One formatter step of a rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatterSpec {
    pub name: String,
    #[serde(default)]
    pub args: FormatterArgs,
}

/// Destination of a mapped value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleTarget {
    pub model: String,
    pub field: String,
}

/// Extract at `source_path`, run the formatter chain, write to every target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingRule {
    pub source_path: String,
    #[serde(default)]
    pub formatters: Vec<FormatterSpec>,
    pub targets: Vec<RuleTarget>,
}

/// Model named by the rule file. Descriptive: the store routes records by
/// kind and `typeId`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreTarget {
    #[serde(default)]
    pub store_entity: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulesMeta {
    /// The kind is listed for reference only and must not be imported
    #[serde(default)]
    pub catalog_only: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRules {
    #[serde(default)]
    pub mapping: Vec<MappingRule>,
    #[serde(default)]
    pub target: StoreTarget,
    #[serde(default)]
    pub resistance_batch: bool,
    #[serde(default)]
    pub meta: RulesMeta,
}

pub trait RuleLoader {
    fn load_entity_rules(&self, source: &str, kind: EntityKind) -> Result<EntityRules>;
}
