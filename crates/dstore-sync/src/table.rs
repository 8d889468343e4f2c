use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dstore_db::RemoteTable;
use dstore_types::{Identity, TypedValue};

use crate::error::SyncResult;
use crate::handler::SyncHandler;

/// Authoritative-side handler: reads and writes one identity's partition of
/// a relational table directly.
pub struct TableSyncHandler {
    table: Arc<dyn RemoteTable>,
    identity: String,
}

impl TableSyncHandler {
    /// Partition of `identity`, addressed by its prefixed or unprefixed text.
    pub fn new(table: Arc<dyn RemoteTable>, identity: &Identity, prefixed: bool) -> Self {
        Self {
            table,
            identity: identity.to_text(prefixed),
        }
    }

    /// Partition of the reserved global identity, for server-local data.
    pub fn server_local(table: Arc<dyn RemoteTable>, prefixed: bool) -> Self {
        Self::new(table, &Identity::global(), prefixed)
    }

    /// Partition key as written to the table.
    pub fn identity(&self) -> &str {
        &self.identity
    }
}

#[async_trait]
impl SyncHandler for TableSyncHandler {
    async fn get_all(&self) -> SyncResult<HashMap<String, TypedValue>> {
        Ok(self.table.get_all(&self.identity).await?)
    }

    async fn set(&self, key: &str, value: TypedValue) -> SyncResult<()> {
        Ok(self.table.set(&self.identity, key, value).await?)
    }

    async fn set_many(&self, entries: HashMap<String, TypedValue>) -> SyncResult<()> {
        Ok(self.table.set_many(&self.identity, entries).await?)
    }

    async fn delete(&self, key: &str) -> SyncResult<()> {
        Ok(self.table.delete(&self.identity, key).await?)
    }
}
