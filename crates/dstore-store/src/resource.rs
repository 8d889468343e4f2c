use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dstore_types::{parse_bool, TypedValue, ValueKind};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::host::{FindHandle, KvpHost};
use crate::traits::{validate_key, Store};

/// Separator between namespace and key in host addresses.
pub const NAMESPACE_SEPARATOR: char = ':';

/// Persistent store over a host [`KvpHost`] facility.
///
/// Keys are addressed as `"{namespace}:{key}"` when a namespace is set and
/// as the bare key otherwise. The separator is not escaped: a key that
/// itself contains `:` can alias an entry of another namespace.
///
/// Booleans are written as the strings `"True"` / `"False"`, so a string
/// value spelled like a boolean reads back as a boolean.
pub struct ResourceStore {
    host: Arc<dyn KvpHost>,
    namespace: Option<String>,
}

impl ResourceStore {
    /// A store over `host`. Blank namespaces mean no namespace.
    pub fn new(host: Arc<dyn KvpHost>, namespace: Option<&str>) -> Self {
        let namespace = namespace
            .map(str::trim)
            .filter(|ns| !ns.is_empty())
            .map(str::to_string);
        Self { host, namespace }
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Host address of `key`.
    pub fn qualify(&self, key: &str) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}{NAMESPACE_SEPARATOR}{key}"),
            None => key.to_string(),
        }
    }

    fn unqualify<'a>(&self, address: &'a str) -> &'a str {
        match &self.namespace {
            Some(ns) => address
                .strip_prefix(ns.as_str())
                .and_then(|rest| rest.strip_prefix(NAMESPACE_SEPARATOR))
                .unwrap_or(address),
            None => address,
        }
    }

    /// Decode the entry at `address`, first matching kind wins.
    ///
    /// The host keeps no reliable type tag. Boolean-as-string must come
    /// before plain string because every stored boolean is also a string.
    fn lookup(&self, address: &str) -> StoreResult<Option<TypedValue>> {
        if let Some(text) = self.host.get_string(address)? {
            return Ok(Some(match parse_bool(&text) {
                Some(b) => TypedValue::Bool(b),
                None => TypedValue::String(text),
            }));
        }
        if let Some(f) = self.host.get_float(address)? {
            return Ok(Some(TypedValue::Float(f)));
        }
        Ok(self.host.get_int(address)?.map(TypedValue::Int))
    }

    fn collect(
        &self,
        handle: FindHandle,
        kind: Option<ValueKind>,
    ) -> StoreResult<HashMap<String, TypedValue>> {
        let mut found = HashMap::new();
        while let Some(address) = self.host.find_next(handle)? {
            if address.is_empty() {
                break;
            }
            // Entries deleted since the cursor opened decode to nothing.
            let Some(value) = self.lookup(&address)? else {
                continue;
            };
            if kind.map_or(true, |k| value.kind() == k) {
                found.insert(self.unqualify(&address).to_string(), value);
            }
        }
        Ok(found)
    }
}

#[async_trait]
impl Store for ResourceStore {
    async fn set(&self, key: &str, value: TypedValue) -> StoreResult<()> {
        validate_key(key)?;
        let address = self.qualify(key);
        match &value {
            TypedValue::String(s) => self.host.set_string(&address, s),
            TypedValue::Float(f) => self.host.set_float(&address, *f),
            TypedValue::Int(i) => self.host.set_int(&address, *i),
            TypedValue::Bool(b) => {
                self.host.set_string(&address, if *b { "True" } else { "False" })
            }
        }
    }

    async fn get(&self, key: &str) -> StoreResult<TypedValue> {
        self.lookup(&self.qualify(key))?
            .ok_or_else(|| StoreError::not_found(key))
    }

    async fn get_all(
        &self,
        prefix: Option<&str>,
        kind: Option<ValueKind>,
    ) -> StoreResult<HashMap<String, TypedValue>> {
        let search = self.qualify(prefix.unwrap_or(""));
        let handle = self.host.start_find(&search)?;
        let result = self.collect(handle, kind);
        self.host.end_find(handle)?;
        let found = result?;
        debug!(prefix = %search, count = found.len(), "resource store enumerated");
        Ok(found)
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.host.delete(&self.qualify(key))
    }
}

impl std::fmt::Debug for ResourceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceStore")
            .field("namespace", &self.namespace)
            .finish()
    }
}
