use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use super::schema::{default_table, get_table, object_table_for_type, TableSchema, ALL_TABLES, RELATIONS};
use super::schema_gen::{generate_create_table, generate_indexes};
use super::{
    IntegrationData, IntegrationResult, LocalRef, RelationLink, RelationOwner, SqlValue, Store,
    StoreOptions,
};
use crate::convert::{value_as_i64, value_as_id, Bucket, ConvertedRecord};
use crate::entity::EntityKind;

const OBJECT_TABLES: [&str; 3] = ["items", "consumables", "resources"];

type Row = Vec<(&'static str, SqlValue)>;

/// SQLite-backed store. Rows are keyed by `dofusdb_id`; a second import of
/// the same record only rewrites it under `force_update`.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open database: {:?}", db_path))?;
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;
        Self::init(conn)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to create database")?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        for schema in ALL_TABLES {
            conn.execute(&generate_create_table(schema), [])
                .with_context(|| format!("Failed to create table: {}", schema.name))?;
            for index_sql in generate_indexes(schema) {
                conn.execute(&index_sql, [])
                    .with_context(|| format!("Failed to create index for: {}", schema.name))?;
            }
        }
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn find_by_dofusdb_id(&self, table: &TableSchema, external_id: &str) -> Result<Option<i64>> {
        let sql = format!("SELECT id FROM {} WHERE dofusdb_id = ?1", table.name);
        self.conn
            .query_row(&sql, [external_id], |row| row.get(0))
            .optional()
            .with_context(|| format!("Failed to look up {} {}", table.name, external_id))
    }

    fn row_exists(&self, table: &TableSchema, id: i64) -> Result<bool> {
        let sql = format!("SELECT 1 FROM {} WHERE id = ?1", table.name);
        let found: Option<i64> = self.conn.query_row(&sql, [id], |row| row.get(0)).optional()?;
        Ok(found.is_some())
    }
}

/// Table a bucket is written to; object buckets follow the resolved target
fn bucket_table(kind: EntityKind, bucket: &str, target: &'static TableSchema) -> Option<&'static TableSchema> {
    if kind.is_object() && OBJECT_TABLES.contains(&bucket) {
        return Some(target);
    }
    get_table(bucket).filter(|t| t.name != RELATIONS.name)
}

/// Columns of `schema` present in the bucket. Unknown fields are ignored.
fn build_row(schema: &TableSchema, bucket_name: &str, bucket: &Bucket, options: &StoreOptions) -> Row {
    let parent_column = schema.parent().map(|fk| fk.column);
    let mut row = Row::new();
    for (field, value) in bucket {
        if options.excludes(bucket_name, field) {
            continue;
        }
        match schema.column(field) {
            Some(column) if column.name != "id" && Some(column.name) != parent_column => {
                row.push((column.name, SqlValue::from_json(value, column.col_type)));
            }
            Some(_) => {}
            None => tracing::trace!(table = schema.name, field, "field not in schema, ignored"),
        }
    }
    row
}

fn insert_row(conn: &Connection, schema: &TableSchema, row: &Row) -> Result<i64> {
    let sql = if row.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES", schema.name)
    } else {
        let columns: Vec<&str> = row.iter().map(|(name, _)| *name).collect();
        let placeholders: Vec<&str> = columns.iter().map(|_| "?").collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            schema.name,
            columns.join(", "),
            placeholders.join(", ")
        )
    };

    let mut stmt = conn.prepare_cached(&sql)?;
    for (idx, (_, value)) in row.iter().enumerate() {
        value.bind_to(idx + 1, &mut stmt)?;
    }
    stmt.raw_execute()
        .with_context(|| format!("Failed to insert into {}", schema.name))?;
    Ok(conn.last_insert_rowid())
}

fn update_row(conn: &Connection, schema: &TableSchema, id: i64, row: &Row) -> Result<()> {
    if row.is_empty() {
        return Ok(());
    }
    let assignments: Vec<String> = row.iter().map(|(name, _)| format!("{} = ?", name)).collect();
    let sql = format!(
        "UPDATE {} SET {} WHERE id = ?",
        schema.name,
        assignments.join(", ")
    );

    let mut stmt = conn.prepare_cached(&sql)?;
    for (idx, (_, value)) in row.iter().enumerate() {
        value.bind_to(idx + 1, &mut stmt)?;
    }
    SqlValue::Integer(id).bind_to(row.len() + 1, &mut stmt)?;
    stmt.raw_execute()
        .with_context(|| format!("Failed to update {} {}", schema.name, id))?;
    Ok(())
}

fn failure(table: &str, message: String) -> IntegrationResult {
    IntegrationResult {
        success: false,
        message,
        primary_id: None,
        data: IntegrationData {
            table: table.to_string(),
            ..Default::default()
        },
    }
}

impl Store for SqliteStore {
    fn integrate(
        &mut self,
        kind: EntityKind,
        converted: &ConvertedRecord,
        options: &StoreOptions,
    ) -> Result<IntegrationResult> {
        let target_name = self.resolve_target_table(kind, converted);
        let target = get_table(&target_name).ok_or_else(|| anyhow!("Unknown table: {}", target_name))?;

        let Some((main_bucket, main_fields)) = converted
            .data_buckets()
            .find(|(name, _)| bucket_table(kind, name, target).is_some_and(|t| t.name == target.name))
        else {
            return Ok(failure(target.name, format!("no {} fields in converted record", target.name)));
        };
        let Some(external_id) = main_fields.get("dofusdb_id").and_then(value_as_id) else {
            return Ok(failure(target.name, format!("{} record has no dofusdb_id", target.name)));
        };

        for (name, _) in converted.data_buckets() {
            if bucket_table(kind, name, target).is_none() {
                tracing::debug!(bucket = %name, "bucket has no table, skipped");
            }
        }

        let existing = self.find_by_dofusdb_id(target, &external_id)?;
        let main_row = build_row(target, main_bucket, main_fields, options);
        let parent = target.parent().and_then(|fk| {
            let schema = get_table(fk.references_table)?;
            let bucket = converted.bucket(fk.references_table)?;
            Some((fk, schema, build_row(schema, fk.references_table, bucket, options)))
        });

        let mut data = IntegrationData {
            table: target.name.to_string(),
            ..Default::default()
        };

        if options.dry_run {
            let verb = match existing {
                Some(_) if options.force_update => "update",
                Some(_) => "keep",
                None => "insert",
            };
            if let Some(id) = existing {
                data.ids.insert(target.name.to_string(), id);
            }
            return Ok(IntegrationResult {
                success: true,
                message: format!("dry run: would {} {} {}", verb, target.name, external_id),
                primary_id: existing,
                data,
            });
        }

        if let (Some(id), false) = (existing, options.force_update) {
            data.ids.insert(target.name.to_string(), id);
            return Ok(IntegrationResult {
                success: true,
                message: format!("{} {} already exists", target.name, external_id),
                primary_id: Some(id),
                data,
            });
        }

        let tx = self.conn.transaction()?;
        let primary_id = match existing {
            Some(id) => {
                if let Some((fk, schema, parent_row)) = &parent {
                    let sql = format!("SELECT {} FROM {} WHERE id = ?1", fk.column, target.name);
                    let parent_id: Option<i64> = tx.query_row(&sql, [id], |row| row.get(0))?;
                    let parent_id = match parent_id {
                        Some(parent_id) => {
                            update_row(&tx, schema, parent_id, parent_row)?;
                            parent_id
                        }
                        None => {
                            let parent_id = insert_row(&tx, schema, parent_row)?;
                            tx.execute(
                                &format!("UPDATE {} SET {} = ?1 WHERE id = ?2", target.name, fk.column),
                                params![parent_id, id],
                            )?;
                            parent_id
                        }
                    };
                    data.ids.insert(schema.name.to_string(), parent_id);
                }
                update_row(&tx, target, id, &main_row)?;
                id
            }
            None => {
                let mut row = main_row;
                if let Some((fk, schema, parent_row)) = &parent {
                    let parent_id = insert_row(&tx, schema, parent_row)?;
                    data.ids.insert(schema.name.to_string(), parent_id);
                    row.push((fk.column, SqlValue::Integer(parent_id)));
                }
                insert_row(&tx, target, &row)?
            }
        };
        tx.commit()?;

        data.ids.insert(target.name.to_string(), primary_id);
        let verb = if existing.is_some() { "updated" } else { "inserted" };
        tracing::debug!(table = target.name, id = primary_id, external_id = %external_id, verb, "row written");
        Ok(IntegrationResult {
            success: true,
            message: format!("{} {} {}", verb, target.name, external_id),
            primary_id: Some(primary_id),
            data,
        })
    }

    fn resolve_target_table(&self, kind: EntityKind, converted: &ConvertedRecord) -> String {
        if kind.is_object() {
            let by_type = OBJECT_TABLES
                .iter()
                .filter_map(|bucket| converted.get(bucket, "type_id"))
                .find_map(value_as_i64)
                .and_then(object_table_for_type);
            if let Some(table) = by_type {
                return table.to_string();
            }
        }
        default_table(kind).to_string()
    }

    fn find_local(&self, kind: EntityKind, external_id: &str) -> Result<Option<LocalRef>> {
        let default = default_table(kind);
        let mut candidates = vec![default];
        if kind.is_object() {
            candidates.extend(OBJECT_TABLES.iter().copied().filter(|t| *t != default));
        }

        for name in candidates {
            let table = get_table(name).ok_or_else(|| anyhow!("Unknown table: {}", name))?;
            if let Some(id) = self.find_by_dofusdb_id(table, external_id)? {
                return Ok(Some(LocalRef {
                    table: name.to_string(),
                    id,
                }));
            }
        }
        Ok(None)
    }

    fn load_relation(&self, owner: &RelationOwner) -> Result<Option<Vec<RelationLink>>> {
        let table = get_table(&owner.table).ok_or_else(|| anyhow!("Unknown table: {}", owner.table))?;
        if !self.row_exists(table, owner.id)? {
            return Ok(None);
        }

        let mut stmt = self.conn.prepare_cached(
            "SELECT target_table, target_id, quantity, role FROM relations
             WHERE owner_table = ?1 AND owner_id = ?2 AND relation = ?3
             ORDER BY id",
        )?;
        let links = stmt
            .query_map(params![owner.table, owner.id, owner.relation], |row| {
                Ok(RelationLink {
                    target_table: row.get(0)?,
                    target_id: row.get(1)?,
                    quantity: row.get(2)?,
                    role: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read relation set")?;
        Ok(Some(links))
    }

    fn save_relation(&mut self, owner: &RelationOwner, links: &[RelationLink]) -> Result<()> {
        get_table(&owner.table).ok_or_else(|| anyhow!("Unknown table: {}", owner.table))?;

        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM relations WHERE owner_table = ?1 AND owner_id = ?2 AND relation = ?3",
            params![owner.table, owner.id, owner.relation],
        )?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO relations (owner_table, owner_id, relation, target_table, target_id, quantity, role)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for link in links {
                stmt.execute(params![
                    owner.table,
                    owner.id,
                    owner.relation,
                    link.target_table,
                    link.target_id,
                    link.quantity,
                    link.role,
                ])?;
            }
        }
        tx.commit().context("Failed to save relation set")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(json: serde_json::Value) -> ConvertedRecord {
        serde_json::from_value(json).unwrap()
    }

    fn monster() -> ConvertedRecord {
        record(json!({
            "creatures": {"dofusdb_id": "31", "name": "Bouftou", "level": 3, "unknown_field": 1},
            "monsters": {"dofusdb_id": "31", "size": "medium", "res_feu": 5},
            "relations": {"drops": ["287"]}
        }))
    }

    #[test]
    fn test_insert_then_keep() {
        let mut store = SqliteStore::in_memory().unwrap();
        let options = StoreOptions::default();

        let first = store.integrate(EntityKind::Monster, &monster(), &options).unwrap();
        assert!(first.success, "{}", first.message);
        assert_eq!(first.data.table, "monsters");
        let id = first.primary_id.unwrap();
        assert!(first.data.ids.contains_key("creatures"));

        let second = store.integrate(EntityKind::Monster, &monster(), &options).unwrap();
        assert!(second.success);
        assert_eq!(second.primary_id, Some(id));
        assert!(second.message.contains("already exists"));

        let count: i64 = store
            .connection()
            .query_row("SELECT COUNT(*) FROM creatures", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_force_update_rewrites_parent() {
        let mut store = SqliteStore::in_memory().unwrap();
        store.integrate(EntityKind::Monster, &monster(), &StoreOptions::default()).unwrap();

        let mut changed = monster();
        changed.set("creatures", "level", json!(9));
        let options = StoreOptions {
            force_update: true,
            ..Default::default()
        };
        let result = store.integrate(EntityKind::Monster, &changed, &options).unwrap();
        assert!(result.message.starts_with("updated"));

        let level: i64 = store
            .connection()
            .query_row("SELECT level FROM creatures", [], |row| row.get(0))
            .unwrap();
        assert_eq!(level, 9);
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let mut store = SqliteStore::in_memory().unwrap();
        let options = StoreOptions {
            dry_run: true,
            ..Default::default()
        };
        let result = store.integrate(EntityKind::Monster, &monster(), &options).unwrap();
        assert!(result.success);
        assert_eq!(result.primary_id, None);
        assert!(store.find_local(EntityKind::Monster, "31").unwrap().is_none());
    }

    #[test]
    fn test_object_table_by_type_id() {
        let mut store = SqliteStore::in_memory().unwrap();
        let converted = record(json!({"items": {"dofusdb_id": "287", "type_id": 15, "name": "Laine"}}));
        assert_eq!(store.resolve_target_table(EntityKind::Item, &converted), "resources");

        store.integrate(EntityKind::Item, &converted, &StoreOptions::default()).unwrap();
        let local = store.find_local(EntityKind::Resource, "287").unwrap().unwrap();
        assert_eq!(local.table, "resources");
        // found from another object kind as well
        assert!(store.find_local(EntityKind::Item, "287").unwrap().is_some());
    }

    #[test]
    fn test_missing_dofusdb_id_fails() {
        let mut store = SqliteStore::in_memory().unwrap();
        let converted = record(json!({"spells": {"name": "Pression"}}));
        let result = store.integrate(EntityKind::Spell, &converted, &StoreOptions::default()).unwrap();
        assert!(!result.success);
    }

    #[test]
    fn test_relation_round_trip_and_owner_gone() {
        let mut store = SqliteStore::in_memory().unwrap();
        let result = store.integrate(EntityKind::Monster, &monster(), &StoreOptions::default()).unwrap();
        let owner = RelationOwner {
            table: "monsters".to_string(),
            id: result.primary_id.unwrap(),
            relation: "creature_resource".to_string(),
        };
        assert_eq!(store.load_relation(&owner).unwrap(), Some(vec![]));

        let links = vec![RelationLink {
            target_table: "resources".to_string(),
            target_id: 4,
            quantity: Some(2),
            role: None,
        }];
        store.save_relation(&owner, &links).unwrap();
        assert_eq!(store.load_relation(&owner).unwrap(), Some(links));

        let gone = RelationOwner { id: 999, ..owner };
        assert_eq!(store.load_relation(&gone).unwrap(), None);
    }
}
