use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use tracing::{debug, error};

use crate::codec::JsonCodec;
use crate::error::{ProtocolError, ProtocolResult};
use crate::message::CallbackId;

type Continuation = Box<dyn FnOnce(String) + Send>;

/// Pending one-shot continuations keyed by a monotonically increasing id.
///
/// One registry belongs to one communication channel. Every registered
/// continuation runs at most once: [`invoke`](Self::invoke) removes it
/// before calling it.
pub struct CorrelationRegistry {
    next_id: AtomicU64,
    pending: Mutex<HashMap<CallbackId, Continuation>>,
}

impl CorrelationRegistry {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Store `callback` under a fresh id.
    ///
    /// The payload later passed to [`invoke`](Self::invoke) is decoded as
    /// JSON into `T` before the callback sees it.
    pub fn register<T, F>(&self, callback: F) -> ProtocolResult<CallbackId>
    where
        T: DeserializeOwned,
        F: FnOnce(ProtocolResult<T>) + Send + 'static,
    {
        let id = CallbackId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let continuation: Continuation = Box::new(move |data| callback(JsonCodec::decode(&data)));
        self.pending
            .lock()
            .map_err(|_| ProtocolError::LockPoisoned)?
            .insert(id, continuation);
        debug!(%id, "callback registered");
        Ok(id)
    }

    /// Remove the continuation for `id` and run it with `data`.
    pub fn invoke(&self, id: CallbackId, data: String) -> ProtocolResult<()> {
        // Release the lock before running user code.
        let continuation = self
            .pending
            .lock()
            .map_err(|_| ProtocolError::LockPoisoned)?
            .remove(&id);
        match continuation {
            Some(continuation) => {
                continuation(data);
                debug!(%id, "callback invoked");
                Ok(())
            }
            None => {
                error!(%id, "response for a callback that is not pending");
                Err(ProtocolError::UnknownCallback(id))
            }
        }
    }

    /// Drop the continuation for `id` without running it.
    pub fn cancel(&self, id: CallbackId) -> ProtocolResult<bool> {
        Ok(self
            .pending
            .lock()
            .map_err(|_| ProtocolError::LockPoisoned)?
            .remove(&id)
            .is_some())
    }

    /// Drop every pending continuation. Returns how many were dropped.
    pub fn clear(&self) -> ProtocolResult<usize> {
        let mut pending = self.pending.lock().map_err(|_| ProtocolError::LockPoisoned)?;
        let dropped = pending.len();
        pending.clear();
        Ok(dropped)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }
}

impl Default for CorrelationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CorrelationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorrelationRegistry")
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .field("pending", &self.pending_count())
            .finish()
    }
}
