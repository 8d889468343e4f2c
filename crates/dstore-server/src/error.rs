use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("no store named {0:?}")]
    UnknownStore(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid configuration file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("database error: {0}")]
    Db(#[from] dstore_db::DbError),

    #[error("protocol error: {0}")]
    Protocol(#[from] dstore_protocol::ProtocolError),

    #[error("store error: {0}")]
    Store(#[from] dstore_store::StoreError),

    #[error("sync error: {0}")]
    Sync(#[from] dstore_sync::SyncError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ServerResult<T> = Result<T, ServerError>;
