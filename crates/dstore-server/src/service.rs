use std::collections::HashMap;
use std::sync::Arc;

use dstore_db::RemoteTable;
use dstore_protocol::{
    Ack, BusEvent, CallbackId, CallbackInvocation, DataStoreRequest, DeleteRequest, GetAllRequest,
    GetAllResponse, JsonCodec, ProtocolError, ProtocolResult, RequestEnvelope, Response,
    SetManyRequest, SetRequest, CALLBACK_INVOKED_EVENT, DELETE_EVENT, GET_ALL_EVENT, SET_EVENT,
    SET_MANY_EVENT,
};
use dstore_types::Identity;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{ServerError, ServerResult};

/// Request handlers of the authoritative side.
///
/// Each request is served against the calling peer's partition of the named
/// store's table. Failures become `success: false` responses; they never
/// close the connection.
pub struct DataStoreService {
    tables: HashMap<String, Arc<dyn RemoteTable>>,
    prefix_identities: bool,
}

impl DataStoreService {
    pub fn new(tables: HashMap<String, Arc<dyn RemoteTable>>, prefix_identities: bool) -> Self {
        Self {
            tables,
            prefix_identities,
        }
    }

    pub fn table(&self, name: &str) -> ServerResult<&Arc<dyn RemoteTable>> {
        self.tables
            .get(name)
            .ok_or_else(|| ServerError::UnknownStore(name.to_string()))
    }

    pub fn store_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn partition(&self, peer: &Identity) -> String {
        peer.to_text(self.prefix_identities)
    }

    pub async fn get_all(&self, peer: &Identity, request: GetAllRequest) -> Response<GetAllResponse> {
        let result = self.try_get_all(peer, &request).await;
        respond(&request.name, result)
    }

    pub async fn set(&self, peer: &Identity, request: SetRequest) -> Response<Ack> {
        let name = request.name.clone();
        respond(&name, self.try_set(peer, request).await)
    }

    pub async fn set_many(&self, peer: &Identity, request: SetManyRequest) -> Response<Ack> {
        let name = request.name.clone();
        respond(&name, self.try_set_many(peer, request).await)
    }

    pub async fn delete(&self, peer: &Identity, request: DeleteRequest) -> Response<Ack> {
        let result = self.try_delete(peer, &request).await;
        respond(&request.name, result)
    }

    async fn try_get_all(&self, peer: &Identity, request: &GetAllRequest) -> ServerResult<GetAllResponse> {
        let key_values = self.table(&request.name)?.get_all(&self.partition(peer)).await?;
        Ok(GetAllResponse { key_values })
    }

    async fn try_set(&self, peer: &Identity, request: SetRequest) -> ServerResult<Ack> {
        self.table(&request.name)?
            .set(&self.partition(peer), &request.key, request.value)
            .await?;
        Ok(Ack {})
    }

    async fn try_set_many(&self, peer: &Identity, request: SetManyRequest) -> ServerResult<Ack> {
        self.table(&request.name)?
            .set_many(&self.partition(peer), request.key_values)
            .await?;
        Ok(Ack {})
    }

    async fn try_delete(&self, peer: &Identity, request: &DeleteRequest) -> ServerResult<Ack> {
        self.table(&request.name)?
            .delete(&self.partition(peer), &request.key)
            .await?;
        Ok(Ack {})
    }

    /// Serve one decoded request and encode the callback event answering it.
    pub async fn dispatch(
        &self,
        peer: &Identity,
        id: CallbackId,
        request: DataStoreRequest,
    ) -> ProtocolResult<BusEvent> {
        debug!(event = request.event_name(), store = request.store_name(), %id, "request received");
        match request {
            DataStoreRequest::GetAll(r) => reply(id, &self.get_all(peer, r).await),
            DataStoreRequest::Set(r) => reply(id, &self.set(peer, r).await),
            DataStoreRequest::SetMany(r) => reply(id, &self.set_many(peer, r).await),
            DataStoreRequest::Delete(r) => reply(id, &self.delete(peer, r).await),
        }
    }

    /// Serve a raw request event.
    pub async fn handle_event(&self, peer: &Identity, event: &BusEvent) -> ProtocolResult<BusEvent> {
        let (id, request) = decode_request(event)?;
        self.dispatch(peer, id, request).await
    }
}

fn respond<T>(store: &str, result: ServerResult<T>) -> Response<T> {
    match result {
        Ok(data) => Response::ok(data),
        Err(e) => {
            warn!(store, error = %e, "request failed");
            Response::failed(e.to_string())
        }
    }
}

fn reply<T: Serialize>(id: CallbackId, response: &Response<T>) -> ProtocolResult<BusEvent> {
    let invocation = CallbackInvocation {
        id,
        data: JsonCodec::encode(response)?,
    };
    BusEvent::encode(CALLBACK_INVOKED_EVENT, &invocation)
}

/// Decode a request event by its name.
pub fn decode_request(event: &BusEvent) -> ProtocolResult<(CallbackId, DataStoreRequest)> {
    fn open<T: serde::de::DeserializeOwned>(
        body: &str,
        wrap: fn(T) -> DataStoreRequest,
    ) -> ProtocolResult<(CallbackId, DataStoreRequest)> {
        let envelope: RequestEnvelope<T> = JsonCodec::decode(body)?;
        Ok((envelope.id, wrap(envelope.payload)))
    }

    match event.name.as_str() {
        GET_ALL_EVENT => open(&event.body, DataStoreRequest::GetAll),
        SET_EVENT => open(&event.body, DataStoreRequest::Set),
        SET_MANY_EVENT => open(&event.body, DataStoreRequest::SetMany),
        DELETE_EVENT => open(&event.body, DataStoreRequest::Delete),
        other => Err(ProtocolError::UnknownEvent(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dstore_db::{Database, TableConfig};
    use dstore_types::TypedValue;

    const PEER: &str = "license:ABCDEF0123456789abcdef0123456789abcdef01";

    async fn service(prefix_identities: bool) -> (Arc<dyn RemoteTable>, DataStoreService) {
        let table = TableConfig::key_value("settings")
            .open(Database::in_memory().unwrap())
            .unwrap();
        table.create().await.unwrap();
        let tables = HashMap::from([("settings".to_string(), table.clone())]);
        (table, DataStoreService::new(tables, prefix_identities))
    }

    fn peer() -> Identity {
        PEER.parse().unwrap()
    }

    #[tokio::test]
    async fn writes_land_in_peer_partition() {
        let (table, service) = service(false).await;
        let response = service
            .set(
                &peer(),
                SetRequest {
                    name: "settings".into(),
                    key: "volume".into(),
                    value: TypedValue::Int(4),
                },
            )
            .await;
        assert!(response.success);

        let stored = table.get_all("abcdef0123456789abcdef0123456789abcdef01").await.unwrap();
        assert_eq!(stored["volume"], TypedValue::Int(4));

        let all = service
            .get_all(&peer(), GetAllRequest { name: "settings".into() })
            .await;
        assert_eq!(all.data.unwrap().key_values["volume"], TypedValue::Int(4));
    }

    #[tokio::test]
    async fn prefixed_partitions() {
        let (table, service) = service(true).await;
        service
            .set_many(
                &peer(),
                SetManyRequest {
                    name: "settings".into(),
                    key_values: HashMap::from([("a".to_string(), TypedValue::Bool(true))]),
                },
            )
            .await;
        let stored = table
            .get_all("license:abcdef0123456789abcdef0123456789abcdef01")
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn unknown_store_is_a_failed_response() {
        let (_table, service) = service(false).await;
        let response = service
            .delete(&peer(), DeleteRequest { name: "nope".into(), key: "k".into() })
            .await;
        assert!(!response.success);
        assert!(response.error.unwrap().contains("nope"));
        assert_eq!(service.store_names(), vec!["settings"]);
    }

    #[tokio::test]
    async fn handle_event_answers_with_callback() {
        let (_table, service) = service(false).await;
        let request = BusEvent::encode(
            GET_ALL_EVENT,
            &RequestEnvelope {
                id: CallbackId(11),
                payload: GetAllRequest { name: "settings".into() },
            },
        )
        .unwrap();
        let reply = service.handle_event(&peer(), &request).await.unwrap();
        assert_eq!(reply.name, CALLBACK_INVOKED_EVENT);

        let invocation: CallbackInvocation = JsonCodec::decode(&reply.body).unwrap();
        assert_eq!(invocation.id, CallbackId(11));
        let response: Response<GetAllResponse> = JsonCodec::decode(&invocation.data).unwrap();
        assert!(response.success);
        assert!(response.data.unwrap().key_values.is_empty());
    }

    #[test]
    fn unknown_or_malformed_events_rejected() {
        let unknown = BusEvent::new("DataStore:Explode", "{}");
        assert!(matches!(decode_request(&unknown), Err(ProtocolError::UnknownEvent(_))));
        let malformed = BusEvent::new(SET_EVENT, "{\"id\":\"1\"}");
        assert!(matches!(
            decode_request(&malformed),
            Err(ProtocolError::Deserialization(_))
        ));
    }
}
