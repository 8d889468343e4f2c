use thiserror::Error;

use crate::message::CallbackId;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// A response named a callback that is not pending. Under the
    /// request/response discipline this is a peer or programming fault.
    #[error("no pending callback with id {0}")]
    UnknownCallback(CallbackId),

    #[error("unknown event: {0}")]
    UnknownEvent(String),

    #[error("event channel closed")]
    ChannelClosed,

    #[error("callback registry lock poisoned")]
    LockPoisoned,
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;
