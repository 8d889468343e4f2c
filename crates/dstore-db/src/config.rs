use std::sync::Arc;

use dstore_types::ValueKind;
use serde::{Deserialize, Serialize};

use crate::columnar::{ColumnDef, ColumnarSchema, ColumnarTable};
use crate::database::Database;
use crate::eav::{EavSchema, EavTable};
use crate::error::DbResult;
use crate::table::RemoteTable;

/// Declarative table definition, as found in server configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "layout", rename_all = "snake_case")]
pub enum TableConfig {
    KeyValue(KeyValueLayout),
    Columnar(ColumnarLayout),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeyValueLayout {
    pub table: String,
    #[serde(default = "default_identity_column")]
    pub identity_column: String,
    #[serde(default = "default_key_column")]
    pub key_column: String,
    #[serde(default = "default_value_column")]
    pub value_column: String,
    #[serde(default = "default_type_column")]
    pub type_column: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnarLayout {
    pub table: String,
    #[serde(default = "default_identity_column")]
    pub identity_column: String,
    pub columns: Vec<ColumnConfig>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub name: String,
    pub kind: ValueKind,
}

fn default_identity_column() -> String {
    "identity".into()
}

fn default_key_column() -> String {
    "key".into()
}

fn default_value_column() -> String {
    "value".into()
}

fn default_type_column() -> String {
    "type".into()
}

impl TableConfig {
    /// Key-value layout with default column names.
    pub fn key_value(table: impl Into<String>) -> Self {
        Self::KeyValue(KeyValueLayout {
            table: table.into(),
            identity_column: default_identity_column(),
            key_column: default_key_column(),
            value_column: default_value_column(),
            type_column: default_type_column(),
        })
    }

    pub fn table_name(&self) -> &str {
        match self {
            Self::KeyValue(layout) => &layout.table,
            Self::Columnar(layout) => &layout.table,
        }
    }

    /// Build the table definition without touching a database.
    pub fn validate(&self) -> DbResult<()> {
        match self {
            Self::KeyValue(layout) => layout.schema().map(drop),
            Self::Columnar(layout) => layout.schema().map(drop),
        }
    }

    /// Bind the definition to `db`. The table is not created.
    pub fn open(&self, db: Database) -> DbResult<Arc<dyn RemoteTable>> {
        Ok(match self {
            Self::KeyValue(layout) => Arc::new(EavTable::new(db, layout.schema()?)),
            Self::Columnar(layout) => Arc::new(ColumnarTable::new(db, layout.schema()?)),
        })
    }
}

impl KeyValueLayout {
    fn schema(&self) -> DbResult<EavSchema> {
        EavSchema::with_columns(
            &self.table,
            &self.identity_column,
            &self.key_column,
            &self.value_column,
            &self.type_column,
        )
    }
}

impl ColumnarLayout {
    fn schema(&self) -> DbResult<ColumnarSchema> {
        let columns = self
            .columns
            .iter()
            .map(|c| ColumnDef::new(&c.name, c.kind))
            .collect::<DbResult<Vec<_>>>()?;
        ColumnarSchema::with_identity_column(&self.table, &self.identity_column, columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use dstore_types::TypedValue;

    #[derive(Deserialize)]
    struct Wrapper {
        table: TableConfig,
    }

    fn parse(text: &str) -> TableConfig {
        toml::from_str::<Wrapper>(text).unwrap().table
    }

    #[test]
    fn key_value_defaults_columns() {
        let config = parse(
            r#"
            [table]
            layout = "key_value"
            table = "settings"
            "#,
        );
        assert_eq!(config, TableConfig::key_value("settings"));
        assert_eq!(config.table_name(), "settings");
        config.validate().unwrap();
    }

    #[test]
    fn columnar_parses_columns() {
        let config = parse(
            r#"
            [table]
            layout = "columnar"
            table = "vehicle"
            columns = [
                { name = "plate", kind = "string" },
                { name = "gear", kind = "int" },
            ]
            "#,
        );
        let TableConfig::Columnar(layout) = &config else {
            panic!("expected columnar layout");
        };
        assert_eq!(layout.identity_column, "identity");
        assert_eq!(layout.columns[1].kind, ValueKind::Int);
        config.validate().unwrap();
    }

    #[test]
    fn unsafe_names_fail_validation() {
        let config = parse(
            r#"
            [table]
            layout = "key_value"
            table = "settings"
            value_column = "value; DROP TABLE settings"
            "#,
        );
        assert!(matches!(config.validate(), Err(DbError::InvalidIdentifier { .. })));
        assert!(config.open(Database::in_memory().unwrap()).is_err());
    }

    #[tokio::test]
    async fn opened_table_is_usable() {
        let table = TableConfig::key_value("prefs")
            .open(Database::in_memory().unwrap())
            .unwrap();
        table.create().await.unwrap();
        table.set("id", "k", true.into()).await.unwrap();
        assert_eq!(table.get_all("id").await.unwrap()["k"], TypedValue::Bool(true));
    }
}
