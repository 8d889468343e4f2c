//! Host key-value persistence facility.
//!
//! [`KvpHost`] models a flat, string-addressed persistence primitive that
//! stores strings, floats, and integers without recording which setter wrote
//! an entry in a form the reader can query. Enumeration is cursor based:
//! open a handle for a key prefix, pull keys until the cursor is exhausted,
//! then close the handle.
//!
//! [`FileKvpHost`] is the bundled implementation, persisting entries as a
//! JSON document that is rewritten atomically on every mutation.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, RwLock};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{StoreError, StoreResult};

/// Opaque enumeration cursor.
pub type FindHandle = u32;

/// Flat key-value persistence primitive.
pub trait KvpHost: Send + Sync {
    fn set_string(&self, key: &str, value: &str) -> StoreResult<()>;
    fn set_float(&self, key: &str, value: f32) -> StoreResult<()>;
    fn set_int(&self, key: &str, value: i32) -> StoreResult<()>;

    /// `None` if the key is absent or was not written as a string.
    fn get_string(&self, key: &str) -> StoreResult<Option<String>>;
    /// `None` if the key is absent or was not written as a float.
    fn get_float(&self, key: &str) -> StoreResult<Option<f32>>;
    /// `None` if the key is absent or was not written as an integer.
    fn get_int(&self, key: &str) -> StoreResult<Option<i32>>;

    fn delete(&self, key: &str) -> StoreResult<()>;

    /// Open a cursor over every key starting with `prefix`.
    fn start_find(&self, prefix: &str) -> StoreResult<FindHandle>;
    /// Next key, or `None` once the cursor is exhausted.
    fn find_next(&self, handle: FindHandle) -> StoreResult<Option<String>>;
    fn end_find(&self, handle: FindHandle) -> StoreResult<()>;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
enum KvpEntry {
    String(String),
    Float(#[serde(with = "float_repr")] f32),
    Int(i32),
}

/// JSON has no NaN or infinity: those are written as their Rust text form
/// (`"NaN"`, `"inf"`, `"-inf"`) and finite values stay plain numbers.
mod float_repr {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f32, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f32(*value)
        } else {
            serializer.serialize_str(&value.to_string())
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f32),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f32, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(f) => Ok(f),
            Repr::Text(text) => text
                .parse()
                .map_err(|_| D::Error::custom(format!("invalid float {text:?}"))),
        }
    }
}

/// JSON-file-backed [`KvpHost`].
///
/// With no path the host lives in memory only, which is useful for tests.
pub struct FileKvpHost {
    path: Option<PathBuf>,
    entries: RwLock<BTreeMap<String, KvpEntry>>,
    cursors: Mutex<HashMap<FindHandle, std::vec::IntoIter<String>>>,
    next_handle: AtomicU32,
}

impl FileKvpHost {
    /// Open (or create) the host file at `path`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let entries = if path.exists() {
            let text = fs::read_to_string(&path)?;
            if text.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&text)
                    .map_err(|e| StoreError::Serialization(e.to_string()))?
            }
        } else {
            BTreeMap::new()
        };

        debug!(path = %path.display(), entries = entries.len(), "kvp host opened");

        Ok(Self {
            path: Some(path),
            entries: RwLock::new(entries),
            cursors: Mutex::new(HashMap::new()),
            next_handle: AtomicU32::new(1),
        })
    }

    /// A host with no backing file.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: RwLock::new(BTreeMap::new()),
            cursors: Mutex::new(HashMap::new()),
            next_handle: AtomicU32::new(1),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn write_entry(&self, key: &str, entry: Option<KvpEntry>) -> StoreResult<()> {
        let mut entries = self.entries.write().map_err(|_| StoreError::LockPoisoned)?;
        match entry {
            Some(entry) => {
                entries.insert(key.to_string(), entry);
            }
            None => {
                if entries.remove(key).is_none() {
                    return Ok(());
                }
            }
        }
        // Persist while still holding the write lock so file order matches
        // mutation order.
        self.persist(&entries)
    }

    fn persist(&self, entries: &BTreeMap<String, KvpEntry>) -> StoreResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_vec_pretty(entries)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&json)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }

    fn read_entry(&self, key: &str) -> StoreResult<Option<KvpEntry>> {
        let entries = self.entries.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(entries.get(key).cloned())
    }
}

impl KvpHost for FileKvpHost {
    fn set_string(&self, key: &str, value: &str) -> StoreResult<()> {
        self.write_entry(key, Some(KvpEntry::String(value.to_string())))
    }

    fn set_float(&self, key: &str, value: f32) -> StoreResult<()> {
        self.write_entry(key, Some(KvpEntry::Float(value)))
    }

    fn set_int(&self, key: &str, value: i32) -> StoreResult<()> {
        self.write_entry(key, Some(KvpEntry::Int(value)))
    }

    fn get_string(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(match self.read_entry(key)? {
            Some(KvpEntry::String(s)) => Some(s),
            _ => None,
        })
    }

    fn get_float(&self, key: &str) -> StoreResult<Option<f32>> {
        Ok(match self.read_entry(key)? {
            Some(KvpEntry::Float(f)) => Some(f),
            _ => None,
        })
    }

    fn get_int(&self, key: &str) -> StoreResult<Option<i32>> {
        Ok(match self.read_entry(key)? {
            Some(KvpEntry::Int(i)) => Some(i),
            _ => None,
        })
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        self.write_entry(key, None)
    }

    fn start_find(&self, prefix: &str) -> StoreResult<FindHandle> {
        let keys: Vec<String> = {
            let entries = self.entries.read().map_err(|_| StoreError::LockPoisoned)?;
            entries
                .range(prefix.to_string()..)
                .take_while(|(k, _)| k.starts_with(prefix))
                .map(|(k, _)| k.clone())
                .collect()
        };
        let handle = self.next_handle.fetch_add(1, Ordering::Relaxed);
        self.cursors
            .lock()
            .map_err(|_| StoreError::LockPoisoned)?
            .insert(handle, keys.into_iter());
        Ok(handle)
    }

    fn find_next(&self, handle: FindHandle) -> StoreResult<Option<String>> {
        let mut cursors = self.cursors.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(cursors.get_mut(&handle).and_then(|keys| keys.next()))
    }

    fn end_find(&self, handle: FindHandle) -> StoreResult<()> {
        self.cursors
            .lock()
            .map_err(|_| StoreError::LockPoisoned)?
            .remove(&handle);
        Ok(())
    }
}

impl std::fmt::Debug for FileKvpHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileKvpHost")
            .field("path", &self.path)
            .finish()
    }
}
