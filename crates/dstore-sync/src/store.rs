use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dstore_store::{validate_key, Store, StoreError, StoreResult};
use dstore_types::{TypedValue, ValueKind};
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::handler::SyncHandler;
use crate::reconcile::ReconcilePlan;

/// A store served from a local cache and mirrored to a [`SyncHandler`].
///
/// [`init`](Store::init) must complete before any other operation; it
/// reconciles the cache with the remote once (cache wins conflicts). After
/// that, reads come from the cache only and writes go to the remote first,
/// then to the cache. A failed remote write is logged and the cache is
/// still updated, so the two sides can drift until the next start-up.
///
/// Concurrent writes to the same key need external serialization: the
/// remote write and the cache write are not atomic together.
pub struct SyncStore {
    name: String,
    cache: Arc<dyn Store>,
    sync: Arc<dyn SyncHandler>,
    initialized: OnceCell<()>,
}

impl SyncStore {
    pub fn new(name: impl Into<String>, cache: Arc<dyn Store>, sync: Arc<dyn SyncHandler>) -> Self {
        Self {
            name: name.into(),
            cache,
            sync,
            initialized: OnceCell::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.initialized()
    }

    fn ensure_initialized(&self) -> StoreResult<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(StoreError::NotInitialized(self.name.clone()))
        }
    }

    async fn reconcile(&self) -> StoreResult<()> {
        self.cache.init().await?;
        let cached = self.cache.get_all(None, None).await?;
        let synced = self
            .sync
            .get_all()
            .await
            .map_err(|e| StoreError::Sync(e.to_string()))?;

        let plan = ReconcilePlan::compute(&cached, &synced);
        let (adopted, pushed) = (plan.adopt_into_cache.len(), plan.push_to_remote.len());
        for (key, value) in plan.adopt_into_cache {
            self.cache.set(&key, value).await?;
        }
        if !plan.push_to_remote.is_empty() {
            self.sync
                .set_many(plan.push_to_remote)
                .await
                .map_err(|e| StoreError::Sync(e.to_string()))?;
        }
        info!(store = %self.name, adopted, pushed, "store reconciled");
        Ok(())
    }
}

#[async_trait]
impl Store for SyncStore {
    async fn init(&self) -> StoreResult<()> {
        self.initialized
            .get_or_try_init(|| self.reconcile())
            .await?;
        Ok(())
    }

    async fn set(&self, key: &str, value: TypedValue) -> StoreResult<()> {
        self.ensure_initialized()?;
        validate_key(key)?;
        if let Err(e) = self.sync.set(key, value.clone()).await {
            warn!(store = %self.name, key, error = %e, "remote write failed; keeping local value");
        }
        self.cache.set(key, value).await
    }

    async fn get(&self, key: &str) -> StoreResult<TypedValue> {
        self.ensure_initialized()?;
        self.cache.get(key).await
    }

    async fn get_all(
        &self,
        prefix: Option<&str>,
        kind: Option<ValueKind>,
    ) -> StoreResult<HashMap<String, TypedValue>> {
        self.ensure_initialized()?;
        self.cache.get_all(prefix, kind).await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.ensure_initialized()?;
        if let Err(e) = self.sync.delete(key).await {
            warn!(store = %self.name, key, error = %e, "remote delete failed; deleting locally");
        }
        self.cache.delete(key).await
    }
}

impl std::fmt::Debug for SyncStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncStore")
            .field("name", &self.name)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{SyncError, SyncResult};
    use dstore_store::InMemoryStore;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Remote side backed by an in-memory store, with switchable failures.
    #[derive(Default)]
    struct FakeRemote {
        entries: InMemoryStore,
        failing: AtomicBool,
        set_many_calls: AtomicUsize,
    }

    impl FakeRemote {
        fn check(&self) -> SyncResult<()> {
            if self.failing.load(Ordering::SeqCst) {
                Err(SyncError::Remote("remote unavailable".into()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl SyncHandler for FakeRemote {
        async fn get_all(&self) -> SyncResult<HashMap<String, TypedValue>> {
            self.check()?;
            Ok(self.entries.get_all(None, None).await?)
        }

        async fn set(&self, key: &str, value: TypedValue) -> SyncResult<()> {
            self.check()?;
            Ok(self.entries.set(key, value).await?)
        }

        async fn set_many(&self, entries: HashMap<String, TypedValue>) -> SyncResult<()> {
            self.check()?;
            self.set_many_calls.fetch_add(1, Ordering::SeqCst);
            for (key, value) in entries {
                self.entries.set(&key, value).await?;
            }
            Ok(())
        }

        async fn delete(&self, key: &str) -> SyncResult<()> {
            self.check()?;
            Ok(self.entries.delete(key).await?)
        }
    }

    fn ints(pairs: &[(&str, i32)]) -> HashMap<String, TypedValue> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), TypedValue::Int(*v)))
            .collect()
    }

    fn fixture(
        cached: &[(&str, i32)],
        synced: &[(&str, i32)],
    ) -> (Arc<InMemoryStore>, Arc<FakeRemote>, SyncStore) {
        let cache = Arc::new(InMemoryStore::with_entries(ints(cached)));
        let remote = Arc::new(FakeRemote {
            entries: InMemoryStore::with_entries(ints(synced)),
            ..Default::default()
        });
        let store = SyncStore::new("prefs", cache.clone(), remote.clone());
        (cache, remote, store)
    }

    #[tokio::test]
    async fn init_converges_with_cache_winning() {
        let (cache, remote, store) = fixture(&[("a", 1), ("b", 2)], &[("b", 3), ("c", 4)]);
        store.init().await.unwrap();

        let expected = ints(&[("a", 1), ("b", 2), ("c", 4)]);
        assert_eq!(cache.get_all(None, None).await.unwrap(), expected);
        assert_eq!(remote.entries.get_all(None, None).await.unwrap(), expected);
        assert_eq!(remote.set_many_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn init_runs_once_and_skips_empty_push() {
        let (_cache, remote, store) = fixture(&[("a", 1)], &[("a", 1)]);
        store.init().await.unwrap();
        store.init().await.unwrap();
        assert!(store.is_initialized());
        assert_eq!(remote.set_many_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn use_before_init_is_rejected() {
        let (_cache, _remote, store) = fixture(&[("a", 1)], &[]);
        assert!(matches!(store.get("a").await, Err(StoreError::NotInitialized(_))));
        assert!(matches!(store.set("a", 2.into()).await, Err(StoreError::NotInitialized(_))));
        assert!(matches!(store.get_all(None, None).await, Err(StoreError::NotInitialized(_))));
        assert!(matches!(store.delete("a").await, Err(StoreError::NotInitialized(_))));
    }

    #[tokio::test]
    async fn failed_init_can_be_retried() {
        let (_cache, remote, store) = fixture(&[("a", 1)], &[]);
        remote.failing.store(true, Ordering::SeqCst);
        assert!(matches!(store.init().await, Err(StoreError::Sync(_))));
        assert!(!store.is_initialized());

        remote.failing.store(false, Ordering::SeqCst);
        store.init().await.unwrap();
        assert_eq!(remote.entries.get_int("a").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn writes_reach_both_sides_and_reads_use_cache() {
        let (cache, remote, store) = fixture(&[], &[]);
        store.init().await.unwrap();

        store.set("volume", 7.into()).await.unwrap();
        assert_eq!(cache.get_int("volume").await.unwrap(), 7);
        assert_eq!(remote.entries.get_int("volume").await.unwrap(), 7);

        // A remote-only change is invisible until the next reconciliation.
        remote.entries.set("volume", 9.into()).await.unwrap();
        assert_eq!(store.get_int("volume").await.unwrap(), 7);

        store.delete("volume").await.unwrap();
        assert!(store.get("volume").await.unwrap_err().is_not_found());
        assert!(remote.entries.get("volume").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn remote_failure_still_updates_cache() {
        let (cache, remote, store) = fixture(&[("gone", 1)], &[]);
        store.init().await.unwrap();
        remote.failing.store(true, Ordering::SeqCst);

        store.set("k", "local".into()).await.unwrap();
        assert_eq!(cache.get_string("k").await.unwrap(), "local");
        store.delete("gone").await.unwrap();
        assert!(cache.get("gone").await.unwrap_err().is_not_found());

        remote.failing.store(false, Ordering::SeqCst);
        assert!(remote.entries.get("k").await.unwrap_err().is_not_found());
        assert_eq!(remote.entries.get_int("gone").await.unwrap(), 1);
    }
}
