//! Columnar layout: one row per identity, one column per declared key.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use dstore_types::{TypedValue, ValueKind};
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params, params_from_iter, OptionalExtension};
use tracing::{debug, info};

use crate::database::Database;
use crate::error::{DbError, DbResult};
use crate::ident::SqlIdentifier;
use crate::table::RemoteTable;

/// One declared column and the kind of value it holds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: SqlIdentifier,
    pub kind: ValueKind,
}

impl ColumnDef {
    pub fn new(name: &str, kind: ValueKind) -> DbResult<Self> {
        Ok(Self {
            name: SqlIdentifier::new(name)?,
            kind,
        })
    }

    fn sql_type(&self) -> &'static str {
        match self.kind {
            ValueKind::String => "TEXT",
            ValueKind::Float => "REAL",
            ValueKind::Int | ValueKind::Bool => "INTEGER",
        }
    }

    fn sql_default(&self) -> &'static str {
        match self.kind {
            ValueKind::String => "''",
            ValueKind::Float => "0.0",
            ValueKind::Int | ValueKind::Bool => "0",
        }
    }
}

/// Validated definition of a columnar table.
#[derive(Clone, Debug)]
pub struct ColumnarSchema {
    table: SqlIdentifier,
    identity: SqlIdentifier,
    columns: Vec<ColumnDef>,
    create_sql: String,
    select_sql: String,
}

impl ColumnarSchema {
    pub fn new(table: &str, columns: Vec<ColumnDef>) -> DbResult<Self> {
        Self::with_identity_column(table, "identity", columns)
    }

    pub fn with_identity_column(
        table: &str,
        identity_column: &str,
        columns: Vec<ColumnDef>,
    ) -> DbResult<Self> {
        let table = SqlIdentifier::new(table)?;
        let identity = SqlIdentifier::new(identity_column)?;
        if columns.is_empty() {
            return Err(DbError::Config(format!("table {table} declares no columns")));
        }
        let mut seen = HashSet::from([identity.as_str().to_ascii_lowercase()]);
        for column in &columns {
            // SQLite column names are case-insensitive.
            if !seen.insert(column.name.as_str().to_ascii_lowercase()) {
                return Err(DbError::Config(format!(
                    "table {table} declares column {} twice",
                    column.name
                )));
            }
        }

        let definitions: Vec<String> = columns
            .iter()
            .map(|c| {
                format!(
                    "{} {} NOT NULL DEFAULT {}",
                    c.name.quoted(),
                    c.sql_type(),
                    c.sql_default()
                )
            })
            .collect();
        let names: Vec<String> = columns.iter().map(|c| c.name.quoted()).collect();

        Ok(Self {
            create_sql: format!(
                "CREATE TABLE IF NOT EXISTS {} ({} VARCHAR(128) NOT NULL PRIMARY KEY, {})",
                table.quoted(),
                identity.quoted(),
                definitions.join(", ")
            ),
            select_sql: format!(
                "SELECT {} FROM {} WHERE {} = ?1",
                names.join(", "),
                table.quoted(),
                identity.quoted()
            ),
            table,
            identity,
            columns,
        })
    }

    pub fn table(&self) -> &str {
        self.table.as_str()
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    fn column(&self, key: &str) -> DbResult<&ColumnDef> {
        self.columns
            .iter()
            .find(|c| c.name.as_str() == key)
            .ok_or_else(|| DbError::UnknownColumn {
                table: self.table.to_string(),
                column: key.to_string(),
            })
    }

    fn checked(&self, key: &str, value: &TypedValue) -> DbResult<&ColumnDef> {
        let column = self.column(key)?;
        if value.kind() != column.kind {
            return Err(DbError::KindMismatch {
                column: key.to_string(),
                expected: column.kind,
                actual: value.kind(),
            });
        }
        // SQLite stores NaN as NULL, which the NOT NULL column rejects.
        if let TypedValue::Float(f) = value {
            if !f.is_finite() {
                return Err(DbError::NonFiniteFloat {
                    column: key.to_string(),
                    value: *f,
                });
            }
        }
        Ok(column)
    }

    /// Upsert touching only `columns`. Every name comes from the validated
    /// declaration, never from the caller.
    fn upsert_sql(&self, columns: &[&ColumnDef]) -> String {
        let names: Vec<String> = columns.iter().map(|c| c.name.quoted()).collect();
        let placeholders: Vec<String> = (2..=columns.len() + 1).map(|i| format!("?{i}")).collect();
        let updates: Vec<String> = names
            .iter()
            .map(|n| format!("{n} = excluded.{n}"))
            .collect();
        format!(
            "INSERT INTO {} ({}, {}) VALUES (?1, {}) ON CONFLICT({}) DO UPDATE SET {}",
            self.table.quoted(),
            self.identity.quoted(),
            names.join(", "),
            placeholders.join(", "),
            self.identity.quoted(),
            updates.join(", ")
        )
    }

}

fn to_sql_value(value: &TypedValue) -> Value {
    match value {
        TypedValue::String(s) => Value::Text(s.clone()),
        TypedValue::Float(f) => Value::Real(f64::from(*f)),
        TypedValue::Int(i) => Value::Integer(i64::from(*i)),
        TypedValue::Bool(b) => Value::Integer(i64::from(*b)),
    }
}

/// Decode a stored cell by its declared kind, falling back to the kind's
/// zero value on anything unexpected.
fn from_sql_value(cell: ValueRef<'_>, kind: ValueKind) -> TypedValue {
    match (kind, cell) {
        (ValueKind::String, ValueRef::Text(t)) => {
            TypedValue::String(String::from_utf8_lossy(t).into_owned())
        }
        (ValueKind::Float, ValueRef::Real(r)) => TypedValue::Float(r as f32),
        (ValueKind::Float, ValueRef::Integer(i)) => TypedValue::Float(i as f32),
        (ValueKind::Int, ValueRef::Integer(i)) => {
            TypedValue::Int(i32::try_from(i).unwrap_or_default())
        }
        (ValueKind::Bool, ValueRef::Integer(i)) => TypedValue::Bool(i != 0),
        (kind, ValueRef::Text(t)) => {
            TypedValue::parse_lenient(&String::from_utf8_lossy(t), kind)
        }
        (kind, _) => TypedValue::default_for(kind),
    }
}

/// Columnar table bound to a database.
#[derive(Clone, Debug)]
pub struct ColumnarTable {
    db: Database,
    schema: ColumnarSchema,
}

impl ColumnarTable {
    pub fn new(db: Database, schema: ColumnarSchema) -> Self {
        Self { db, schema }
    }

    pub fn schema(&self) -> &ColumnarSchema {
        &self.schema
    }
}

#[async_trait]
impl RemoteTable for ColumnarTable {
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
        info!(
            table = self.name(),
            layout = "columnar",
            columns = self.schema.columns.len(),
            "table ready"
        );
        Ok(())
    }

    async fn get_all(&self, identity: &str) -> DbResult<HashMap<String, TypedValue>> {
        let sql = self.schema.select_sql.clone();
        let columns = self.schema.columns.clone();
        let identity = identity.to_string();
        self.db
            .run(move |conn| {
                let row = conn
                    .query_row(&sql, params![identity], |row| {
                        columns
                            .iter()
                            .enumerate()
                            .map(|(i, c)| {
                                Ok((c.name.to_string(), from_sql_value(row.get_ref(i)?, c.kind)))
                            })
                            .collect::<rusqlite::Result<HashMap<_, _>>>()
                    })
                    .optional()?;
                Ok(row.unwrap_or_default())
            })
            .await
    }

    async fn set(&self, identity: &str, key: &str, value: TypedValue) -> DbResult<()> {
        self.set_many(identity, HashMap::from([(key.to_string(), value)]))
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
        let mut columns = Vec::with_capacity(entries.len());
        let mut values = Vec::with_capacity(entries.len() + 1);
        values.push(Value::Text(identity.to_string()));
        for (key, value) in &entries {
            columns.push(self.schema.checked(key, value)?);
            values.push(to_sql_value(value));
        }
        let sql = self.schema.upsert_sql(&columns);
        let count = columns.len();
        self.db
            .run(move |conn| {
                conn.execute(&sql, params_from_iter(values))?;
                Ok(())
            })
            .await?;
        debug!(table = self.name(), count, "columns written");
        Ok(())
    }

    async fn delete(&self, identity: &str, key: &str) -> DbResult<()> {
        // Upsert the default so the identity's row exists afterwards.
        let column = self.schema.column(key)?;
        let sql = self.schema.upsert_sql(&[column]);
        let default = to_sql_value(&TypedValue::default_for(column.kind));
        let identity = identity.to_string();
        self.db
            .run(move |conn| {
                conn.execute(&sql, params![identity, default])?;
                Ok(())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: &str = "0123456789abcdef0123456789abcdef01234567";

    fn schema() -> ColumnarSchema {
        ColumnarSchema::new(
            "vehicle_menu",
            vec![
                ColumnDef::new("plate", ValueKind::String).unwrap(),
                ColumnDef::new("torque", ValueKind::Float).unwrap(),
                ColumnDef::new("gear", ValueKind::Int).unwrap(),
                ColumnDef::new("neon", ValueKind::Bool).unwrap(),
            ],
        )
        .unwrap()
    }

    async fn table() -> ColumnarTable {
        let table = ColumnarTable::new(Database::in_memory().unwrap(), schema());
        table.create().await.unwrap();
        table
    }

    #[test]
    fn invalid_definitions_rejected() {
        assert!(matches!(
            ColumnDef::new("drop;table", ValueKind::Int),
            Err(DbError::InvalidIdentifier { .. })
        ));
        assert!(matches!(
            ColumnarSchema::new("bad name", vec![ColumnDef::new("a", ValueKind::Int).unwrap()]),
            Err(DbError::InvalidIdentifier { .. })
        ));
        assert!(matches!(
            ColumnarSchema::new("t", vec![]),
            Err(DbError::Config(_))
        ));
        let dup = vec![
            ColumnDef::new("a", ValueKind::Int).unwrap(),
            ColumnDef::new("A", ValueKind::Bool).unwrap(),
        ];
        assert!(matches!(ColumnarSchema::new("t", dup), Err(DbError::Config(_))));
        let clash = vec![ColumnDef::new("identity", ValueKind::Int).unwrap()];
        assert!(matches!(ColumnarSchema::new("t", clash), Err(DbError::Config(_))));
    }

    #[tokio::test]
    async fn missing_row_reads_empty() {
        let table = table().await;
        assert!(table.get_all(ALICE).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn set_fills_other_columns_with_defaults() {
        let table = table().await;
        table.set(ALICE, "gear", 4.into()).await.unwrap();
        let all = table.get_all(ALICE).await.unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all["gear"], TypedValue::Int(4));
        assert_eq!(all["plate"], TypedValue::from(""));
        assert_eq!(all["torque"], TypedValue::Float(0.0));
        assert_eq!(all["neon"], TypedValue::Bool(false));
    }

    #[tokio::test]
    async fn set_many_touches_only_given_columns() {
        let table = table().await;
        table.set(ALICE, "plate", "DSTORE1".into()).await.unwrap();
        let batch = HashMap::from([
            ("torque".to_string(), TypedValue::Float(1.25)),
            ("neon".to_string(), TypedValue::Bool(true)),
        ]);
        table.set_many(ALICE, batch).await.unwrap();

        let all = table.get_all(ALICE).await.unwrap();
        assert_eq!(all["plate"], TypedValue::from("DSTORE1"));
        assert_eq!(all["torque"], TypedValue::Float(1.25));
        assert_eq!(all["neon"], TypedValue::Bool(true));
        assert_eq!(all["gear"], TypedValue::Int(0));
    }

    #[tokio::test]
    async fn delete_resets_to_default() {
        let table = table().await;
        table.set(ALICE, "gear", 6.into()).await.unwrap();
        table.set(ALICE, "plate", "X".into()).await.unwrap();
        table.delete(ALICE, "gear").await.unwrap();

        let all = table.get_all(ALICE).await.unwrap();
        assert_eq!(all["gear"], TypedValue::Int(0));
        assert_eq!(all["plate"], TypedValue::from("X"));
    }

    #[tokio::test]
    async fn delete_without_row_creates_defaults() {
        let table = table().await;
        table.delete(ALICE, "gear").await.unwrap();

        let all = table.get_all(ALICE).await.unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all["gear"], TypedValue::Int(0));
        assert_eq!(all["plate"], TypedValue::from(""));
    }

    #[tokio::test]
    async fn non_finite_floats_rejected_before_sql() {
        let table = table().await;
        for bad in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            assert!(matches!(
                table.set(ALICE, "torque", TypedValue::Float(bad)).await,
                Err(DbError::NonFiniteFloat { .. })
            ));
        }
        assert!(table.get_all(ALICE).await.unwrap().is_empty());

        table.set(ALICE, "torque", TypedValue::Float(-3.5)).await.unwrap();
        assert_eq!(table.get_all(ALICE).await.unwrap()["torque"], TypedValue::Float(-3.5));
    }

    #[tokio::test]
    async fn undeclared_or_mistyped_keys_rejected() {
        let table = table().await;
        assert!(matches!(
            table.set(ALICE, "wheels", 4.into()).await,
            Err(DbError::UnknownColumn { .. })
        ));
        assert!(matches!(
            table.set(ALICE, "gear", "fourth".into()).await,
            Err(DbError::KindMismatch { expected: ValueKind::Int, actual: ValueKind::String, .. })
        ));
        assert!(matches!(
            table.delete(ALICE, "wheels").await,
            Err(DbError::UnknownColumn { .. })
        ));
        // A rejected batch writes nothing.
        let batch = HashMap::from([
            ("gear".to_string(), TypedValue::Int(2)),
            ("wheels".to_string(), TypedValue::Int(4)),
        ]);
        assert!(table.set_many(ALICE, batch).await.is_err());
        assert!(table.get_all(ALICE).await.unwrap().is_empty());
    }
}
