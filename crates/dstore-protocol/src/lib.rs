//! Wire protocol for dstore.
//!
//! The transport between a client and the authoritative side is a one-way
//! event channel. Request/response semantics are built on top of it:
//!
//! 1. The caller registers a one-shot continuation in a
//!    [`CorrelationRegistry`] and receives a fresh [`CallbackId`].
//! 2. It emits a request event (`DataStore:GetAll`, `DataStore:Set`, ...)
//!    whose body is a [`RequestEnvelope`] carrying that id.
//! 3. The authoritative side answers with a `DataStore:CallbackInvoked`
//!    event carrying the id and a JSON-encoded [`Response`].
//! 4. The registry removes the continuation for that id and runs it.
//!
//! Bodies are JSON text ([`JsonCodec`]); callback ids travel as strings.

pub mod bus;
pub mod client;
pub mod codec;
pub mod correlation;
pub mod error;
pub mod message;

pub use bus::{connect, BusEvent, ClientEnd, EventReceiver, EventSender, ServerEnd};
pub use client::RpcClient;
pub use codec::JsonCodec;
pub use correlation::CorrelationRegistry;
pub use error::{ProtocolError, ProtocolResult};
pub use message::{
    Ack, CallbackId, CallbackInvocation, DataStoreRequest, DeleteRequest, GetAllRequest,
    GetAllResponse, Operation, RequestEnvelope, Response, SetManyRequest, SetRequest,
    CALLBACK_INVOKED_EVENT, DELETE_EVENT, GET_ALL_EVENT, SET_EVENT, SET_MANY_EVENT,
};
