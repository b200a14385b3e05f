//! Validation of converted records against characteristic limits.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::characteristic::{CharacteristicResolver, ValueType};
use crate::convert::ConvertedRecord;
use crate::entity::EntityKind;

/// One validation failure, addressed as `bucket.field`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Same issue, addressed under a batch item (`externalId:bucket.field`)
    pub fn prefixed(&self, prefix: &str) -> Self {
        Self::new(format!("{}:{}", prefix, self.path), self.message.clone())
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<ValidationIssue>,
}

impl ValidationReport {
    fn from_errors(errors: Vec<ValidationIssue>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

/// Check every field that resolves to a characteristic. Limits see the
/// record's own numeric fields as variables.
pub fn validate(
    converted: &ConvertedRecord,
    kind: EntityKind,
    resolver: &CharacteristicResolver,
) -> ValidationReport {
    let variables = converted.numeric_variables();
    let mut errors = Vec::new();

    for (bucket, fields) in converted.data_buckets() {
        for (field, value) in fields {
            let Some(key) = resolver.resolve_field_to_key(field, kind) else {
                continue;
            };
            let Some(definition) = resolver.definition(&key, kind) else {
                continue;
            };
            let path = format!("{}.{}", bucket, field);

            match value {
                Value::Null => {}
                Value::Number(number) => {
                    let Some(number) = number.as_f64() else {
                        continue;
                    };
                    let Some(limits) = resolver.limits(&key, kind, &variables) else {
                        continue;
                    };
                    if !limits.contains(number) {
                        errors.push(ValidationIssue::new(
                            path,
                            format!("{} is outside [{}, {}]", number, bound(limits.min), bound(limits.max)),
                        ));
                    }
                }
                _ if definition.value_type == ValueType::Int => {
                    errors.push(ValidationIssue::new(path, "expected a number"));
                }
                _ => {}
            }
        }
    }

    if !errors.is_empty() {
        tracing::debug!(%kind, errors = errors.len(), "validation failed");
    }
    ValidationReport::from_errors(errors)
}

fn bound(value: Option<i64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}
