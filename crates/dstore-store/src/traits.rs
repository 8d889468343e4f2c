use std::collections::HashMap;

use async_trait::async_trait;
use dstore_types::{TypedValue, ValueKind};

use crate::error::{StoreError, StoreResult};

/// Key-value mapping from string keys to [`TypedValue`]s.
///
/// Backends implement the five required methods; the typed accessors are
/// derived from them and behave identically across backends.
///
/// Contract:
/// - `set` overwrites; a key never maps to two values.
/// - `get` of an absent key fails with [`StoreError::NotFound`]. Stores never
///   substitute a default.
/// - `get_all` returns exactly the keys starting with `prefix` (all keys when
///   `None`), restricted to `kind` when given.
#[async_trait]
pub trait Store: Send + Sync {
    /// Prepare the store for use. Local backends have nothing to do.
    async fn init(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn set(&self, key: &str, value: TypedValue) -> StoreResult<()>;

    async fn get(&self, key: &str) -> StoreResult<TypedValue>;

    async fn get_all(
        &self,
        prefix: Option<&str>,
        kind: Option<ValueKind>,
    ) -> StoreResult<HashMap<String, TypedValue>>;

    async fn delete(&self, key: &str) -> StoreResult<()>;

    async fn get_string(&self, key: &str) -> StoreResult<String> {
        Ok(self.get(key).await?.into_string()?)
    }

    async fn get_float(&self, key: &str) -> StoreResult<f32> {
        Ok(self.get(key).await?.as_float()?)
    }

    async fn get_int(&self, key: &str) -> StoreResult<i32> {
        Ok(self.get(key).await?.as_int()?)
    }

    async fn get_bool(&self, key: &str) -> StoreResult<bool> {
        Ok(self.get(key).await?.as_bool()?)
    }

    async fn get_all_strings(&self, prefix: Option<&str>) -> StoreResult<HashMap<String, String>> {
        self.get_all(prefix, Some(ValueKind::String))
            .await?
            .into_iter()
            .map(|(k, v)| -> StoreResult<(String, String)> { Ok((k, v.into_string()?)) })
            .collect()
    }

    async fn get_all_floats(&self, prefix: Option<&str>) -> StoreResult<HashMap<String, f32>> {
        self.get_all(prefix, Some(ValueKind::Float))
            .await?
            .into_iter()
            .map(|(k, v)| -> StoreResult<(String, f32)> { Ok((k, v.as_float()?)) })
            .collect()
    }

    async fn get_all_ints(&self, prefix: Option<&str>) -> StoreResult<HashMap<String, i32>> {
        self.get_all(prefix, Some(ValueKind::Int))
            .await?
            .into_iter()
            .map(|(k, v)| -> StoreResult<(String, i32)> { Ok((k, v.as_int()?)) })
            .collect()
    }

    async fn get_all_bools(&self, prefix: Option<&str>) -> StoreResult<HashMap<String, bool>> {
        self.get_all(prefix, Some(ValueKind::Bool))
            .await?
            .into_iter()
            .map(|(k, v)| -> StoreResult<(String, bool)> { Ok((k, v.as_bool()?)) })
            .collect()
    }
}

/// Reject the empty key.
pub fn validate_key(key: &str) -> StoreResult<()> {
    if key.is_empty() {
        return Err(StoreError::EmptyKey);
    }
    Ok(())
}

/// Shared `get_all` filter: prefix match on the key, optional kind match.
pub fn matches_filter(
    key: &str,
    value: &TypedValue,
    prefix: Option<&str>,
    kind: Option<ValueKind>,
) -> bool {
    key.starts_with(prefix.unwrap_or(""))
        && kind.map_or(true, |k| value.kind() == k)
}
