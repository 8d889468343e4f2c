//! Entity-attribute-value layout: one row per `(identity, key)`.

use std::collections::HashMap;

use async_trait::async_trait;
use dstore_types::{TypedValue, ValueKind};
use rusqlite::params;
use rusqlite::types::ValueRef;
use tracing::{debug, info, warn};

use crate::database::Database;
use crate::error::DbResult;
use crate::ident::SqlIdentifier;
use crate::table::RemoteTable;

/// Validated names and prebuilt statements of a key-value table.
#[derive(Clone, Debug)]
pub struct EavSchema {
    table: SqlIdentifier,
    create_sql: String,
    select_sql: String,
    upsert_sql: String,
    delete_sql: String,
}

impl EavSchema {
    /// Column names default to `identity`, `key`, `value` and `type`.
    pub fn new(table: &str) -> DbResult<Self> {
        Self::with_columns(table, "identity", "key", "value", "type")
    }

    pub fn with_columns(
        table: &str,
        identity_column: &str,
        key_column: &str,
        value_column: &str,
        type_column: &str,
    ) -> DbResult<Self> {
        let table = SqlIdentifier::new(table)?;
        let t = table.quoted();
        let id = SqlIdentifier::new(identity_column)?.quoted();
        let key = SqlIdentifier::new(key_column)?.quoted();
        let value = SqlIdentifier::new(value_column)?.quoted();
        let ty = SqlIdentifier::new(type_column)?.quoted();

        Ok(Self {
            create_sql: format!(
                "CREATE TABLE IF NOT EXISTS {t} (\
                 {id} VARCHAR(128) NOT NULL, \
                 {key} VARCHAR(128) NOT NULL, \
                 {value} TEXT NOT NULL, \
                 {ty} INTEGER NOT NULL, \
                 PRIMARY KEY ({id}, {key}))"
            ),
            select_sql: format!("SELECT {key}, {value}, {ty} FROM {t} WHERE {id} = ?1"),
            upsert_sql: format!(
                "INSERT INTO {t} ({id}, {key}, {value}, {ty}) VALUES (?1, ?2, ?3, ?4) \
                 ON CONFLICT({id}, {key}) DO UPDATE SET \
                 {value} = excluded.{value}, {ty} = excluded.{ty}"
            ),
            delete_sql: format!("DELETE FROM {t} WHERE {id} = ?1 AND {key} = ?2"),
            table,
        })
    }

    pub fn table(&self) -> &str {
        self.table.as_str()
    }
}

/// Key-value table bound to a database.
#[derive(Clone, Debug)]
pub struct EavTable {
    db: Database,
    schema: EavSchema,
}

impl EavTable {
    pub fn new(db: Database, schema: EavSchema) -> Self {
        Self { db, schema }
    }

    pub fn schema(&self) -> &EavSchema {
        &self.schema
    }
}

/// Text of a cell, decoded lossily. Blobs and NULLs have none.
fn cell_text(cell: ValueRef<'_>) -> Option<String> {
    match cell {
        ValueRef::Text(t) => Some(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(r) => Some(r.to_string()),
        ValueRef::Null | ValueRef::Blob(_) => None,
    }
}

fn decode_row(key: &str, text: &str, tag: i64) -> Option<TypedValue> {
    match ValueKind::from_tag(tag) {
        Ok(kind) => Some(TypedValue::parse_lenient(text, kind)),
        Err(e) => {
            warn!(key, error = %e, "skipping row with unknown type tag");
            None
        }
    }
}

#[async_trait]
impl RemoteTable for EavTable {
    fn name(&self) -> &str {
        self.schema.table()
    }

    async fn create(&self) -> DbResult<()> {
        let sql = self.schema.create_sql.clone();
        self.db
            .run(move |conn| {
                conn.execute(&sql, [])?;
                Ok(())
            })
            .await?;
        info!(table = self.name(), layout = "key_value", "table ready");
        Ok(())
    }

    async fn get_all(&self, identity: &str) -> DbResult<HashMap<String, TypedValue>> {
        let sql = self.schema.select_sql.clone();
        let identity = identity.to_string();
        let entries = self
            .db
            .run(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![identity], |row| {
                    Ok((
                        cell_text(row.get_ref(0)?),
                        cell_text(row.get_ref(1)?),
                        row.get_ref(2)?.as_i64().ok(),
                    ))
                })?;
                let mut entries = HashMap::new();
                for row in rows {
                    match row? {
                        (Some(key), Some(text), Some(tag)) => {
                            if let Some(value) = decode_row(&key, &text, tag) {
                                entries.insert(key, value);
                            }
                        }
                        (key, _, _) => warn!(key = ?key, "skipping row with unreadable cells"),
                    }
                }
                Ok(entries)
            })
            .await?;
        debug!(table = self.name(), count = entries.len(), "rows loaded");
        Ok(entries)
    }

    async fn set(&self, identity: &str, key: &str, value: TypedValue) -> DbResult<()> {
        let sql = self.schema.upsert_sql.clone();
        let (identity, key) = (identity.to_string(), key.to_string());
        self.db
            .run(move |conn| {
                conn.execute(
                    &sql,
                    params![identity, key, value.to_text(), value.kind().tag()],
                )?;
                Ok(())
            })
            .await
    }

    async fn set_many(
        &self,
        identity: &str,
        entries: HashMap<String, TypedValue>,
    ) -> DbResult<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let sql = self.schema.upsert_sql.clone();
        let identity = identity.to_string();
        let count = entries.len();
        self.db
            .run(move |conn| {
                // Dropping the transaction without commit rolls it back.
                let tx = conn.transaction()?;
                {
                    let mut stmt = tx.prepare(&sql)?;
                    for (key, value) in &entries {
                        stmt.execute(params![identity, key, value.to_text(), value.kind().tag()])?;
                    }
                }
                tx.commit()?;
                Ok(())
            })
            .await?;
        debug!(table = self.name(), count, "batch written");
        Ok(())
    }

    async fn delete(&self, identity: &str, key: &str) -> DbResult<()> {
        let sql = self.schema.delete_sql.clone();
        let (identity, key) = (identity.to_string(), key.to_string());
        self.db
            .run(move |conn| {
                conn.execute(&sql, params![identity, key])?;
                Ok(())
            })
            .await
    }
}
