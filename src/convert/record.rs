use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::formula::Variables;

use super::path::value_as_f64;

/// Reserved bucket holding cross-reference lists; never persisted as a table
pub const RELATIONS_BUCKET: &str = "relations";

pub type Bucket = BTreeMap<String, Value>;

/// Converted output: model name → field name → value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConvertedRecord {
    buckets: BTreeMap<String, Bucket>,
}

impl ConvertedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, model: &str, field: &str, value: Value) {
        self.buckets
            .entry(model.to_string())
            .or_default()
            .insert(field.to_string(), value);
    }

    pub fn get(&self, model: &str, field: &str) -> Option<&Value> {
        self.buckets.get(model)?.get(field)
    }

    pub fn bucket(&self, model: &str) -> Option<&Bucket> {
        self.buckets.get(model)
    }

    pub fn has_bucket(&self, model: &str) -> bool {
        self.buckets.contains_key(model)
    }

    /// Merge fields into a bucket, overwriting existing ones
    pub fn merge_bucket(&mut self, model: &str, fields: Bucket) {
        self.buckets
            .entry(model.to_string())
            .or_default()
            .extend(fields);
    }

    pub fn buckets(&self) -> impl Iterator<Item = (&String, &Bucket)> {
        self.buckets.iter()
    }

    /// Buckets that map to storage tables
    pub fn data_buckets(&self) -> impl Iterator<Item = (&String, &Bucket)> {
        self.buckets
            .iter()
            .filter(|(name, _)| name.as_str() != RELATIONS_BUCKET)
    }

    pub fn relations(&self) -> Option<&Bucket> {
        self.buckets.get(RELATIONS_BUCKET)
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.values().all(BTreeMap::is_empty)
    }

    /// Numeric field values keyed by plain field name; the first bucket in
    /// name order wins on collision
    pub fn numeric_variables(&self) -> Variables {
        let mut vars = Variables::new();
        for (_, bucket) in self.data_buckets() {
            for (field, value) in bucket {
                if let Some(number) = value_as_f64(value) {
                    vars.entry(field.clone()).or_insert(number);
                }
            }
        }
        vars
    }
}
