use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dstore_protocol::{DeleteRequest, GetAllRequest, RpcClient, SetManyRequest, SetRequest};
use dstore_types::TypedValue;
use tracing::warn;

use crate::error::SyncResult;
use crate::handler::SyncHandler;

/// Initiating-side handler: forwards every operation to the authoritative
/// side over an [`RpcClient`].
///
/// A `success: false` response is logged and otherwise swallowed (an empty
/// map for `get_all`); only transport failures are returned as errors.
pub struct RemoteSyncHandler {
    name: String,
    client: Arc<RpcClient>,
}

impl RemoteSyncHandler {
    pub fn new(name: impl Into<String>, client: Arc<RpcClient>) -> Self {
        Self {
            name: name.into(),
            client,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl SyncHandler for RemoteSyncHandler {
    async fn get_all(&self) -> SyncResult<HashMap<String, TypedValue>> {
        let response = self
            .client
            .request(GetAllRequest {
                name: self.name.clone(),
            })
            .await?;
        match response.into_result() {
            Ok(data) => Ok(data.map(|d| d.key_values).unwrap_or_default()),
            Err(error) => {
                warn!(store = %self.name, %error, "failed to get data");
                Ok(HashMap::new())
            }
        }
    }

    async fn set(&self, key: &str, value: TypedValue) -> SyncResult<()> {
        let response = self
            .client
            .request(SetRequest {
                name: self.name.clone(),
                key: key.to_string(),
                value,
            })
            .await?;
        if let Err(error) = response.into_result() {
            warn!(store = %self.name, key, %error, "failed to set data");
        }
        Ok(())
    }

    async fn set_many(&self, entries: HashMap<String, TypedValue>) -> SyncResult<()> {
        let count = entries.len();
        let response = self
            .client
            .request(SetManyRequest {
                name: self.name.clone(),
                key_values: entries,
            })
            .await?;
        if let Err(error) = response.into_result() {
            warn!(store = %self.name, count, %error, "failed to set multiple entries");
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> SyncResult<()> {
        let response = self
            .client
            .request(DeleteRequest {
                name: self.name.clone(),
                key: key.to_string(),
            })
            .await?;
        if let Err(error) = response.into_result() {
            warn!(store = %self.name, key, %error, "failed to delete data");
        }
        Ok(())
    }
}
