use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("remote error: {0}")]
    Remote(String),

    #[error("protocol error: {0}")]
    Protocol(#[from] dstore_protocol::ProtocolError),

    #[error("database error: {0}")]
    Db(#[from] dstore_db::DbError),

    #[error("store error: {0}")]
    Store(#[from] dstore_store::StoreError),
}

pub type SyncResult<T> = Result<T, SyncError>;
