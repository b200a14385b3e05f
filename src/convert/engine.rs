use serde_json::Value;

use super::path::extract_path;
use super::record::ConvertedRecord;
use super::resistance::convert_resistances;
use super::ConversionContext;
use crate::formatter::FormatterRegistry;
use crate::rules::{EntityRules, MappingRule};

/// Applies mapping rules and their formatter chains to raw records
#[derive(Debug)]
pub struct ConversionEngine {
    registry: FormatterRegistry,
}

impl Default for ConversionEngine {
    fn default() -> Self {
        Self::new(FormatterRegistry::with_builtins())
    }
}

impl ConversionEngine {
    pub fn new(registry: FormatterRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &FormatterRegistry {
        &self.registry
    }

    /// Convert one raw record. The raw record is never modified.
    pub fn convert(&self, rules: &EntityRules, raw: &Value, ctx: &ConversionContext<'_>) -> ConvertedRecord {
        let mut converted = ConvertedRecord::new();

        for rule in &rules.mapping {
            let value = self.apply_rule(rule, raw, ctx);
            for target in &rule.targets {
                converted.set(&target.model, &target.field, value.clone());
            }
        }

        if rules.resistance_batch {
            match convert_resistances(raw, &ctx.converter()) {
                Some((bucket, fields)) => converted.merge_bucket(bucket, fields),
                None => tracing::debug!(kind = %ctx.kind, "no resistance document to batch"),
            }
        }

        converted
    }

    fn apply_rule(&self, rule: &MappingRule, raw: &Value, ctx: &ConversionContext<'_>) -> Value {
        let mut value = extract_path(raw, &rule.source_path);
        for spec in &rule.formatters {
            value = self.registry.apply(&spec.name, value, &spec.args, raw, ctx);
        }
        tracing::trace!(path = %rule.source_path, %value, "rule applied");
        value
    }
}
