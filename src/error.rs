use crate::entity::EntityKind;
use crate::validate::ValidationIssue;

/// Failure of one pipeline run
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("nothing collected for {kind} {external_id}")]
    NothingCollected {
        kind: EntityKind,
        external_id: String,
    },

    #[error("{kind} {external_id} rejected: {reason}")]
    Vetoed {
        kind: EntityKind,
        external_id: String,
        reason: String,
    },

    #[error("validation failed with {} error(s)", .0.len())]
    ValidationFailed(Vec<ValidationIssue>),

    #[error("{0}")]
    IntegrationFailed(String),

    #[error("failed to load rules for {kind}: {source}")]
    Rules {
        kind: EntityKind,
        #[source]
        source: anyhow::Error,
    },

    #[error("collection failed: {0:#}")]
    Collect(#[source] anyhow::Error),

    #[error("store failure: {0:#}")]
    Store(#[source] anyhow::Error),
}

impl ImportError {
    /// Validation errors carried by this failure, if any
    pub fn validation_issues(&self) -> &[ValidationIssue] {
        match self {
            ImportError::ValidationFailed(issues) => issues,
            _ => &[],
        }
    }
}

pub type ImportResult<T> = std::result::Result<T, ImportError>;
