use std::collections::HashSet;
use std::path::Path;

use dstore_db::{DatabaseConfig, TableConfig};
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// Server configuration, usually loaded from TOML:
///
/// ```toml
/// prefix_identities = false
///
/// [database]
/// path = "dstore.db"
/// max_connections = 8
///
/// [[stores]]
/// name = "settings"
/// table = { layout = "key_value", table = "settings" }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Partition client data by `license:`-prefixed identity text.
    #[serde(default)]
    pub prefix_identities: bool,
    #[serde(default)]
    pub stores: Vec<StoreConfig>,
}

/// A named store and the table that persists it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub name: String,
    pub table: TableConfig,
}

impl ServerConfig {
    pub fn from_toml_str(text: &str) -> ServerResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> ServerResult<Self> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    /// Check names and build every table definition. Opens nothing.
    pub fn validate(&self) -> ServerResult<()> {
        let mut names = HashSet::new();
        for store in &self.stores {
            if store.name.trim().is_empty() {
                return Err(ServerError::Config("store name cannot be empty".into()));
            }
            if !names.insert(store.name.as_str()) {
                return Err(ServerError::Config(format!(
                    "store {:?} is declared twice",
                    store.name
                )));
            }
            store.table.validate()?;
        }
        Ok(())
    }

    pub fn store(&self, name: &str) -> Option<&StoreConfig> {
        self.stores.iter().find(|s| s.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dstore_db::DbError;

    const SAMPLE: &str = r#"
        prefix_identities = true

        [database]
        path = "data/dstore.db"

        [[stores]]
        name = "settings"
        table = { layout = "key_value", table = "settings" }

        [[stores]]
        name = "vehicle"
        [stores.table]
        layout = "columnar"
        table = "vehicle_menu"
        columns = [
            { name = "plate", kind = "string" },
            { name = "torque", kind = "float" },
        ]
    "#;

    #[test]
    fn default_config() {
        let c = ServerConfig::default();
        assert_eq!(c.database, DatabaseConfig::default());
        assert!(!c.prefix_identities);
        assert!(c.stores.is_empty());
        c.validate().unwrap();
    }

    #[test]
    fn parses_sample() {
        let c = ServerConfig::from_toml_str(SAMPLE).unwrap();
        assert!(c.prefix_identities);
        assert_eq!(c.database.path.as_deref(), Some(Path::new("data/dstore.db")));
        assert_eq!(c.database.max_connections, dstore_db::DEFAULT_MAX_CONNECTIONS);
        assert_eq!(c.stores.len(), 2);
        assert_eq!(c.store("vehicle").unwrap().table.table_name(), "vehicle_menu");
        assert!(c.store("missing").is_none());
    }

    #[test]
    fn unsafe_table_name_rejected_at_load() {
        let text = r#"
            [[stores]]
            name = "settings"
            table = { layout = "key_value", table = "settings`; --" }
        "#;
        assert!(matches!(
            ServerConfig::from_toml_str(text),
            Err(ServerError::Db(DbError::InvalidIdentifier { .. }))
        ));
    }

    #[test]
    fn duplicate_store_rejected() {
        let text = r#"
            [[stores]]
            name = "a"
            table = { layout = "key_value", table = "t1" }
            [[stores]]
            name = "a"
            table = { layout = "key_value", table = "t2" }
        "#;
        assert!(matches!(ServerConfig::from_toml_str(text), Err(ServerError::Config(_))));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        assert_eq!(ServerConfig::load(&path).unwrap().stores.len(), 2);
        assert!(matches!(
            ServerConfig::load(dir.path().join("absent.toml")),
            Err(ServerError::Io(_))
        ));
    }
}
