use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dstore_types::{TypedValue, ValueKind};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::StoreResult;
use crate::traits::Store;

/// Event name broadcast after a successful `set`.
pub const SET_EVENT: &str = "DataStore:Set";
/// Event name broadcast after a successful `delete`.
pub const DELETE_EVENT: &str = "DataStore:Delete";

/// Default capacity of the change-event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// A change notification emitted by [`NotifyingStore`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreEvent {
    Set {
        store: String,
        key: String,
        value: TypedValue,
    },
    Deleted {
        store: String,
        key: String,
    },
}

impl StoreEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Set { .. } => SET_EVENT,
            Self::Deleted { .. } => DELETE_EVENT,
        }
    }

    pub fn store(&self) -> &str {
        match self {
            Self::Set { store, .. } | Self::Deleted { store, .. } => store,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Self::Set { key, .. } | Self::Deleted { key, .. } => key,
        }
    }
}

/// A receiver of change notifications.
pub type StoreEventStream = broadcast::Receiver<StoreEvent>;

/// Decorator that broadcasts a [`StoreEvent`] after each write.
///
/// Reads pass straight through. Events are sent only after the wrapped
/// store accepted the write; a failed write emits nothing.
pub struct NotifyingStore {
    name: String,
    inner: Arc<dyn Store>,
    sender: broadcast::Sender<StoreEvent>,
}

impl NotifyingStore {
    pub fn new(name: impl Into<String>, inner: Arc<dyn Store>) -> Self {
        Self::with_capacity(name, inner, DEFAULT_EVENT_CAPACITY)
    }

    pub fn with_capacity(name: impl Into<String>, inner: Arc<dyn Store>, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            name: name.into(),
            inner,
            sender,
        }
    }

    /// Register a listener for future change events.
    pub fn subscribe(&self) -> StoreEventStream {
        self.sender.subscribe()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inner(&self) -> &Arc<dyn Store> {
        &self.inner
    }

    pub fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }

    fn emit(&self, event: StoreEvent) {
        let name = event.name();
        // Sending only fails when nobody is listening.
        let delivered = self.sender.send(event).unwrap_or(0);
        debug!(store = %self.name, event = name, delivered, "store event emitted");
    }
}

#[async_trait]
impl Store for NotifyingStore {
    async fn init(&self) -> StoreResult<()> {
        self.inner.init().await
    }

    async fn set(&self, key: &str, value: TypedValue) -> StoreResult<()> {
        self.inner.set(key, value.clone()).await?;
        self.emit(StoreEvent::Set {
            store: self.name.clone(),
            key: key.to_string(),
            value,
        });
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<TypedValue> {
        self.inner.get(key).await
    }

    async fn get_all(
        &self,
        prefix: Option<&str>,
        kind: Option<ValueKind>,
    ) -> StoreResult<HashMap<String, TypedValue>> {
        self.inner.get_all(prefix, kind).await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.inner.delete(key).await?;
        self.emit(StoreEvent::Deleted {
            store: self.name.clone(),
            key: key.to_string(),
        });
        Ok(())
    }
}
