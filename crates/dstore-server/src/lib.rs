//! Authoritative side of dstore.
//!
//! Hosts the configured relational stores and answers the request/response
//! protocol for connected clients, partitioning every store by the calling
//! client's identity. Also builds synchronized stores over the server's own
//! global partition.

pub mod config;
pub mod error;
pub mod server;
pub mod service;

pub use config::{ServerConfig, StoreConfig};
pub use error::{ServerError, ServerResult};
pub use server::DataStoreServer;
pub use service::{decode_request, DataStoreService};
