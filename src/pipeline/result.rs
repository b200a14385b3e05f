use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::convert::ConvertedRecord;
use crate::error::ImportError;
use crate::store::IntegrationResult;
use crate::validate::ValidationIssue;

/// Per-record progress, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Collected,
    Converted,
    Validated,
    Integrated,
    RelationsResolved,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Collected => "collected",
            Stage::Converted => "converted",
            Stage::Validated => "validated",
            Stage::Integrated => "integrated",
            Stage::RelationsResolved => "relations_resolved",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunMeta {
    /// Last stage reached
    pub stage: Option<Stage>,
    pub imported_dependencies: usize,
    /// Deferred relations that never fired
    pub orphaned_relations: usize,
    pub collected: usize,
    /// Matches reported by the source for batch runs
    pub total: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OrchestratorResult {
    pub success: bool,
    pub message: String,
    pub raw: Option<Value>,
    pub converted: Option<ConvertedRecord>,
    pub integration: Option<IntegrationResult>,
    pub validation_errors: Vec<ValidationIssue>,
    pub meta: RunMeta,
}

impl OrchestratorResult {
    pub fn failure(error: &ImportError, stage: Option<Stage>) -> Self {
        Self {
            success: false,
            message: error.to_string(),
            validation_errors: error.validation_issues().to_vec(),
            meta: RunMeta {
                stage,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}
