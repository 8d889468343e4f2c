use std::collections::HashMap;

use async_trait::async_trait;
use dstore_types::TypedValue;

use crate::error::SyncResult;

/// The durable side of a synchronizing store.
#[async_trait]
pub trait SyncHandler: Send + Sync {
    async fn get_all(&self) -> SyncResult<HashMap<String, TypedValue>>;
    async fn set(&self, key: &str, value: TypedValue) -> SyncResult<()>;
    async fn set_many(&self, entries: HashMap<String, TypedValue>) -> SyncResult<()>;
    async fn delete(&self, key: &str) -> SyncResult<()>;
}
