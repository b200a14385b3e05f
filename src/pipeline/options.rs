use serde::{Deserialize, Serialize};

use crate::store::StoreOptions;

/// Which pipeline steps a run performs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOptions {
    pub convert: bool,
    pub validate: bool,
    pub integrate: bool,
    /// Import referenced records and wire relations after integration
    pub include_relations: bool,
    /// Preferred language for localized source fields
    pub lang: String,
    pub store: StoreOptions,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            convert: true,
            validate: true,
            integrate: true,
            include_relations: true,
            lang: "fr".to_string(),
            store: StoreOptions::default(),
        }
    }
}

impl ImportOptions {
    /// Collect only, return the raw record
    pub fn raw_only() -> Self {
        Self {
            convert: false,
            validate: false,
            integrate: false,
            include_relations: false,
            ..Self::default()
        }
    }

    pub fn wants_processing(&self) -> bool {
        self.convert || self.validate || self.integrate
    }

    /// Options used for records pulled in as dependencies
    pub fn for_dependency(&self) -> Self {
        Self {
            convert: true,
            ..self.clone()
        }
    }
}
