//! Key-value stores for typed values.
//!
//! Every backend implements the [`Store`] trait: a mapping from string keys
//! to [`TypedValue`]s with typed accessors and prefix/kind enumeration.
//!
//! # Backends
//!
//! - [`InMemoryStore`] -- `HashMap`-based store, used for scratch data and as
//!   the cache of a synchronized store
//! - [`ResourceStore`] -- persistent store over a host [`KvpHost`] facility,
//!   optionally scoped to a namespace
//! - [`NotifyingStore`] -- decorator broadcasting a [`StoreEvent`] per write
//!
//! # Rules
//!
//! 1. A key maps to at most one value; `set` overwrites.
//! 2. Reading an absent key is an error, never a default.
//! 3. Typed accessors fail on a kind mismatch instead of converting.

pub mod error;
pub mod host;
pub mod memory;
pub mod notify;
pub mod resource;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use host::{FileKvpHost, FindHandle, KvpHost};
pub use memory::InMemoryStore;
pub use notify::{NotifyingStore, StoreEvent, StoreEventStream, DELETE_EVENT, SET_EVENT};
pub use resource::{ResourceStore, NAMESPACE_SEPARATOR};
pub use traits::{matches_filter, validate_key, Store};

pub use dstore_types::{TypedValue, ValueKind};
