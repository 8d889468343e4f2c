//! Synchronizing store for dstore.
//!
//! A [`SyncStore`] pairs a fast local cache with a durable [`SyncHandler`].
//! Two handlers are provided:
//!
//! - [`RemoteSyncHandler`] -- initiating side, forwards operations over the
//!   request/response protocol
//! - [`TableSyncHandler`] -- authoritative side, reads and writes a relational
//!   table partition directly
//!
//! On initialization the cache and the handler are merged once by a
//! [`ReconcilePlan`]: the cache adopts remote-only keys and the remote adopts
//! cache-only or diverged keys, so the cache wins every conflict.

pub mod error;
pub mod handler;
pub mod reconcile;
pub mod remote;
pub mod store;
pub mod table;

pub use error::{SyncError, SyncResult};
pub use handler::SyncHandler;
pub use reconcile::ReconcilePlan;
pub use remote::RemoteSyncHandler;
pub use store::SyncStore;
pub use table::TableSyncHandler;
