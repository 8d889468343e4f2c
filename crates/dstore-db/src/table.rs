use std::collections::HashMap;

use async_trait::async_trait;
use dstore_types::TypedValue;

use crate::error::DbResult;

/// A relational table holding typed key-value data partitioned by identity.
///
/// Implementations validate every table and column name when they are
/// constructed, so no method here can fail with an invalid identifier.
#[async_trait]
pub trait RemoteTable: Send + Sync {
    /// Name of the underlying table.
    fn name(&self) -> &str;

    /// Create the table if it does not exist.
    async fn create(&self) -> DbResult<()>;

    async fn get_all(&self, identity: &str) -> DbResult<HashMap<String, TypedValue>>;

    async fn set(&self, identity: &str, key: &str, value: TypedValue) -> DbResult<()>;

    /// Write every entry, all or nothing.
    async fn set_many(&self, identity: &str, entries: HashMap<String, TypedValue>)
        -> DbResult<()>;

    async fn delete(&self, identity: &str, key: &str) -> DbResult<()>;
}
