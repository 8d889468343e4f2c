use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use dstore_types::{TypedValue, ValueKind};

use crate::error::{StoreError, StoreResult};
use crate::traits::{matches_filter, validate_key, Store};

/// In-memory, HashMap-based store.
///
/// Nothing survives the process. Used as scratch space and as the local
/// cache of a synchronized store.
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, TypedValue>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Seed a store with existing entries.
    pub fn with_entries(entries: HashMap<String, TypedValue>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Number of entries currently stored.
    pub fn len(&self) -> usize {
        self.entries.read().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted list of all keys.
    pub fn keys(&self) -> StoreResult<Vec<String>> {
        let map = self.entries.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut keys: Vec<String> = map.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    pub fn clear(&self) -> StoreResult<()> {
        self.entries
            .write()
            .map_err(|_| StoreError::LockPoisoned)?
            .clear();
        Ok(())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn set(&self, key: &str, value: TypedValue) -> StoreResult<()> {
        validate_key(key)?;
        let mut map = self.entries.write().map_err(|_| StoreError::LockPoisoned)?;
        map.insert(key.to_string(), value);
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<TypedValue> {
        let map = self.entries.read().map_err(|_| StoreError::LockPoisoned)?;
        map.get(key).cloned().ok_or_else(|| StoreError::not_found(key))
    }

    async fn get_all(
        &self,
        prefix: Option<&str>,
        kind: Option<ValueKind>,
    ) -> StoreResult<HashMap<String, TypedValue>> {
        let map = self.entries.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(map
            .iter()
            .filter(|(k, v)| matches_filter(k, v, prefix, kind))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let mut map = self.entries.write().map_err(|_| StoreError::LockPoisoned)?;
        map.remove(key);
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("entry_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples() -> Vec<(&'static str, TypedValue)> {
        vec![
            ("name", TypedValue::from("vm")),
            ("speed", TypedValue::from(1.25f32)),
            ("count", TypedValue::from(-4)),
            ("enabled", TypedValue::from(true)),
        ]
    }

    // -----------------------------------------------------------------------
    // Core CRUD
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn set_then_get_roundtrips_every_kind() {
        let store = InMemoryStore::new();
        for (key, value) in samples() {
            store.set(key, value.clone()).await.unwrap();
            let read = store.get(key).await.unwrap();
            assert_eq!(read, value);
            assert_eq!(read.kind(), value.kind());
        }
        assert_eq!(store.len(), 4);
    }

    #[tokio::test]
    async fn set_overwrites() {
        let store = InMemoryStore::new();
        store.set("k", 1.into()).await.unwrap();
        store.set("k", "now a string".into()).await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get_string("k").await.unwrap(), "now a string");
    }

    #[tokio::test]
    async fn missing_key_is_not_found() {
        let store = InMemoryStore::new();
        let err = store.get("nope").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found() {
        let store = InMemoryStore::new();
        store.set("k", true.into()).await.unwrap();
        store.delete("k").await.unwrap();
        assert!(store.get("k").await.unwrap_err().is_not_found());
        // Deleting again is harmless.
        store.delete("k").await.unwrap();
    }

    #[tokio::test]
    async fn empty_key_rejected() {
        let store = InMemoryStore::new();
        assert!(matches!(store.set("", 1.into()).await, Err(StoreError::EmptyKey)));
    }

    // -----------------------------------------------------------------------
    // Typed accessors
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn typed_getter_mismatch() {
        let store = InMemoryStore::new();
        store.set("k", 3.into()).await.unwrap();
        assert_eq!(store.get_int("k").await.unwrap(), 3);
        assert!(matches!(store.get_bool("k").await, Err(StoreError::Type(_))));
        assert!(matches!(store.get_string("k").await, Err(StoreError::Type(_))));
    }

    // -----------------------------------------------------------------------
    // Enumeration
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn get_all_filters_by_prefix_and_kind() {
        let store = InMemoryStore::new();
        store.set("ui.scale", 1.5f32.into()).await.unwrap();
        store.set("ui.theme", "dark".into()).await.unwrap();
        store.set("ui.hidden", false.into()).await.unwrap();
        store.set("hud.scale", 2.0f32.into()).await.unwrap();

        let all = store.get_all(None, None).await.unwrap();
        assert_eq!(all.len(), 4);

        let ui = store.get_all(Some("ui."), None).await.unwrap();
        let mut keys: Vec<_> = ui.keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, vec!["ui.hidden", "ui.scale", "ui.theme"]);

        let floats = store.get_all_floats(Some("ui.")).await.unwrap();
        assert_eq!(floats.len(), 1);
        assert_eq!(floats["ui.scale"], 1.5);

        let bools = store.get_all_bools(None).await.unwrap();
        assert_eq!(bools.get("ui.hidden"), Some(&false));

        let strings = store.get_all_strings(Some("hud.")).await.unwrap();
        assert!(strings.is_empty());
    }

    #[tokio::test]
    async fn keys_sorted_and_clear() {
        let store = InMemoryStore::new();
        store.set("b", 1.into()).await.unwrap();
        store.set("a", 2.into()).await.unwrap();
        assert_eq!(store.keys().unwrap(), vec!["a", "b"]);
        store.clear().unwrap();
        assert!(store.is_empty());
    }
}
