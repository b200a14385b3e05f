//! Persistence of converted records and their cross references.

pub mod schema;
mod schema_gen;
mod sqlite;
mod value;

pub use schema_gen::{generate_create_table, generate_indexes};
pub use sqlite::SqliteStore;
pub use value::SqlValue;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::convert::ConvertedRecord;
use crate::entity::EntityKind;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreOptions {
    /// Resolve everything, write nothing
    pub dry_run: bool,
    /// Overwrite rows that already exist
    pub force_update: bool,
    /// Integrate even when validation reported errors
    pub ignore_unvalidated: bool,
    /// Fields never written, as `field` or `bucket.field`
    pub exclude_fields: Vec<String>,
}

impl StoreOptions {
    pub fn excludes(&self, bucket: &str, field: &str) -> bool {
        self.exclude_fields.iter().any(|excluded| {
            excluded == field
                || excluded
                    .split_once('.')
                    .is_some_and(|(b, f)| b == bucket && f == field)
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntegrationData {
    pub table: String,
    /// Row id written (or matched) per table
    pub ids: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntegrationResult {
    pub success: bool,
    pub message: String,
    pub primary_id: Option<i64>,
    pub data: IntegrationData,
}

/// A row already present locally
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct LocalRef {
    pub table: String,
    pub id: i64,
}

/// The row owning a relation set, and which set
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RelationOwner {
    pub table: String,
    pub id: i64,
    pub relation: String,
}

/// One member of a relation set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationLink {
    pub target_table: String,
    pub target_id: i64,
    pub quantity: Option<u32>,
    pub role: Option<String>,
}

pub trait Store {
    fn integrate(
        &mut self,
        kind: EntityKind,
        converted: &ConvertedRecord,
        options: &StoreOptions,
    ) -> Result<IntegrationResult>;

    /// Table receiving the record's primary row
    fn resolve_target_table(&self, kind: EntityKind, converted: &ConvertedRecord) -> String;

    fn find_local(&self, kind: EntityKind, external_id: &str) -> Result<Option<LocalRef>>;

    /// Current relation set; `None` when the owner row no longer exists
    fn load_relation(&self, owner: &RelationOwner) -> Result<Option<Vec<RelationLink>>>;

    fn save_relation(&mut self, owner: &RelationOwner, links: &[RelationLink]) -> Result<()>;
}

/// Merge `link` into a relation set: an existing link to the same row gets
/// the new quantity and role, otherwise the link is appended
pub fn merge_link(links: &mut Vec<RelationLink>, link: RelationLink) {
    match links
        .iter_mut()
        .find(|l| l.target_table == link.target_table && l.target_id == link.target_id)
    {
        Some(existing) => {
            existing.quantity = link.quantity.or(existing.quantity);
            existing.role = link.role.or(existing.role.take());
        }
        None => links.push(link),
    }
}
