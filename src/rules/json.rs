use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::{EntityRules, RuleLoader};
use crate::entity::EntityKind;

/// Reads `{dir}/{source}/{kind}.json`
#[derive(Debug, Clone)]
pub struct JsonRuleLoader {
    dir: PathBuf,
}

impl JsonRuleLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn rules_path(&self, source: &str, kind: EntityKind) -> PathBuf {
        self.dir.join(source).join(format!("{}.json", kind.as_str()))
    }
}

impl RuleLoader for JsonRuleLoader {
    fn load_entity_rules(&self, source: &str, kind: EntityKind) -> Result<EntityRules> {
        let path = self.rules_path(source, kind);
        let text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read rules: {:?}", path))?;
        let rules: EntityRules = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse rules: {:?}", path))?;
        tracing::debug!(%kind, source, rules = rules.mapping.len(), "loaded mapping rules");
        Ok(rules)
    }
}
