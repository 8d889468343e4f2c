//! In-process, fire-and-forget event channel between one client and the
//! authoritative side.
//!
//! Events are one-way: emitting never waits for the peer. Request/response
//! semantics are layered on top with a
//! [`CorrelationRegistry`](crate::correlation::CorrelationRegistry).

use dstore_types::Identity;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::codec::JsonCodec;
use crate::error::{ProtocolError, ProtocolResult};

/// A named event with a JSON body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BusEvent {
    pub name: String,
    pub body: String,
}

impl BusEvent {
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
        }
    }

    /// An event whose body is `value` encoded as JSON.
    pub fn encode<T: Serialize>(name: impl Into<String>, value: &T) -> ProtocolResult<Self> {
        Ok(Self::new(name, JsonCodec::encode(value)?))
    }
}

/// Sending half of one direction of a connection. Cheap to clone.
#[derive(Clone, Debug)]
pub struct EventSender {
    inner: mpsc::UnboundedSender<BusEvent>,
}

impl EventSender {
    pub fn emit(&self, event: BusEvent) -> ProtocolResult<()> {
        self.inner.send(event).map_err(|_| ProtocolError::ChannelClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

/// Receiving half of one direction of a connection.
pub type EventReceiver = mpsc::UnboundedReceiver<BusEvent>;

/// The initiating side of a connection.
#[derive(Debug)]
pub struct ClientEnd {
    pub sender: EventSender,
    pub receiver: EventReceiver,
}

/// The authoritative side of a connection, which knows who is calling.
#[derive(Debug)]
pub struct ServerEnd {
    pub peer: Identity,
    pub sender: EventSender,
    pub receiver: EventReceiver,
}

/// Open a connection for the client identified by `peer`.
pub fn connect(peer: Identity) -> (ClientEnd, ServerEnd) {
    let (to_server, from_client) = mpsc::unbounded_channel();
    let (to_client, from_server) = mpsc::unbounded_channel();
    (
        ClientEnd {
            sender: EventSender { inner: to_server },
            receiver: from_server,
        },
        ServerEnd {
            peer,
            sender: EventSender { inner: to_client },
            receiver: from_client,
        },
    )
}
