use dstore_types::TypeError;

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested key is absent.
    #[error("key not found: {key}")]
    NotFound { key: String },

    /// A stored value had a different kind than requested.
    #[error(transparent)]
    Type(#[from] TypeError),

    /// Keys must be non-empty.
    #[error("key must not be empty")]
    EmptyKey,

    /// The store was used before `init()` completed.
    #[error("store {0} has not been initialized")]
    NotInitialized(String),

    /// The remote half of a synchronized store failed.
    #[error("sync error: {0}")]
    Sync(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A thread panicked while holding a store lock.
    #[error("store lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    pub fn not_found(key: &str) -> Self {
        Self::NotFound {
            key: key.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
