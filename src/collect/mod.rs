//! Raw record collection from external game databases.

mod dofusdb;

pub use dofusdb::{endpoint, DofusDbClient, DEFAULT_BASE_URL, SOURCE};

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::entity::EntityKind;

/// Raw source record, immutable once collected
pub type RawRecord = Value;

/// Query filters passed verbatim to the source (`typeId=15`)
pub type Filters = BTreeMap<String, String>;

pub const DEFAULT_PAGE_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    /// Total matches reported by the source
    pub total: usize,
    pub collected: usize,
    pub offset: usize,
    pub limit: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CollectedPage {
    pub items: Vec<RawRecord>,
    pub meta: PageMeta,
}

pub trait Collector {
    /// `None` when the source has no such record
    fn fetch_one(&self, source: &str, kind: EntityKind, external_id: &str) -> Result<Option<RawRecord>>;

    fn fetch_many(&self, source: &str, kind: EntityKind, filters: &Filters, page: Page) -> Result<CollectedPage>;

    /// Secondary document attached to a record before conversion (the
    /// recipe producing an object)
    fn fetch_secondary(&self, source: &str, external_id: &str) -> Result<Option<RawRecord>>;
}

/// Parse `key=value` filter arguments
pub fn parse_filters(args: &[String]) -> Result<Filters> {
    let mut filters = Filters::new();
    for arg in args {
        let Some((key, value)) = arg.split_once('=') else {
            bail!("Invalid filter {:?}, expected key=value", arg);
        };
        let key = key.trim();
        if key.is_empty() {
            bail!("Invalid filter {:?}, empty key", arg);
        }
        if key.starts_with('$') {
            bail!("Filter {:?} is reserved, use --limit and --offset", key);
        }
        filters.insert(key.to_string(), value.trim().to_string());
    }
    Ok(filters)
}
