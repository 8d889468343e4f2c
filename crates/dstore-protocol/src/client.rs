use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::bus::{BusEvent, ClientEnd, EventReceiver, EventSender};
use crate::codec::JsonCodec;
use crate::correlation::CorrelationRegistry;
use crate::error::{ProtocolError, ProtocolResult};
use crate::message::{CallbackInvocation, Operation, RequestEnvelope, Response, CALLBACK_INVOKED_EVENT};

/// Request helper for the initiating side of a connection.
///
/// A background task routes every callback event to the registry. Requests
/// have no timeout: a peer that never answers leaves the caller waiting
/// until the connection closes.
pub struct RpcClient {
    sender: EventSender,
    registry: Arc<CorrelationRegistry>,
    dispatcher: JoinHandle<()>,
}

impl RpcClient {
    /// Take over `end`. Must be called inside a Tokio runtime.
    pub fn new(end: ClientEnd) -> Self {
        let registry = Arc::new(CorrelationRegistry::new());
        let dispatcher = tokio::spawn(dispatch(end.receiver, registry.clone()));
        Self {
            sender: end.sender,
            registry,
            dispatcher,
        }
    }

    /// Send `payload` and wait for the correlated response.
    pub async fn request<O: Operation>(&self, payload: O) -> ProtocolResult<Response<O::Output>> {
        let (tx, rx) = oneshot::channel();
        let id = self.registry.register(move |response: ProtocolResult<Response<O::Output>>| {
            // The caller may have gone away; nothing to deliver to then.
            let _ = tx.send(response);
        })?;

        let sent = BusEvent::encode(O::EVENT, &RequestEnvelope { id, payload })
            .and_then(|event| self.sender.emit(event));
        if let Err(e) = sent {
            self.registry.cancel(id)?;
            return Err(e);
        }
        debug!(event = O::EVENT, %id, "request sent");

        rx.await.map_err(|_| ProtocolError::ChannelClosed)?
    }

    pub fn pending_requests(&self) -> usize {
        self.registry.pending_count()
    }
}

impl Drop for RpcClient {
    fn drop(&mut self) {
        self.dispatcher.abort();
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("registry", &self.registry)
            .finish()
    }
}

async fn dispatch(mut receiver: EventReceiver, registry: Arc<CorrelationRegistry>) {
    while let Some(event) = receiver.recv().await {
        if event.name != CALLBACK_INVOKED_EVENT {
            debug!(event = %event.name, "ignoring event");
            continue;
        }
        let result = JsonCodec::decode::<CallbackInvocation>(&event.body)
            .and_then(|invocation| registry.invoke(invocation.id, invocation.data));
        if let Err(e) = result {
            warn!(error = %e, "callback event not delivered");
        }
    }
    // Closed connection: dropping the continuations wakes their callers.
    match registry.clear() {
        Ok(0) | Err(_) => {}
        Ok(dropped) => warn!(dropped, "connection closed with requests pending"),
    }
}
