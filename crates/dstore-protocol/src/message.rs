use std::collections::HashMap;
use std::fmt;

use dstore_types::TypedValue;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Request event: fetch every entry of a store.
pub const GET_ALL_EVENT: &str = "DataStore:GetAll";
/// Request event: write one entry.
pub const SET_EVENT: &str = "DataStore:Set";
/// Request event: write a batch of entries.
pub const SET_MANY_EVENT: &str = "DataStore:SetMany";
/// Request event: remove one entry.
pub const DELETE_EVENT: &str = "DataStore:Delete";
/// Response event carrying a [`CallbackInvocation`].
pub const CALLBACK_INVOKED_EVENT: &str = "DataStore:CallbackInvoked";

/// Correlation id of a pending request.
///
/// Travels as a decimal string so that peers without 64-bit integers can
/// echo it back unchanged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CallbackId(pub u64);

impl fmt::Display for CallbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for CallbackId {
    type Error = std::num::ParseIntError;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        text.trim().parse().map(Self)
    }
}

impl From<CallbackId> for String {
    fn from(id: CallbackId) -> Self {
        id.0.to_string()
    }
}

/// `{ id, payload }` sent with every request event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope<T> {
    pub id: CallbackId,
    pub payload: T,
}

/// `{ success, data?, error? }` delivered back through the callback.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Response<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Response<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }

    /// Data of a successful response, the error text otherwise.
    pub fn into_result(self) -> Result<Option<T>, String> {
        if self.success {
            Ok(self.data)
        } else {
            Err(self.error.unwrap_or_else(|| "unspecified remote failure".to_string()))
        }
    }
}

/// Body of a [`CALLBACK_INVOKED_EVENT`]: the id and the JSON-encoded response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackInvocation {
    pub id: CallbackId,
    pub data: String,
}

/// A request payload bound to its event name and response type.
pub trait Operation: Serialize + DeserializeOwned + Send + 'static {
    const EVENT: &'static str;
    type Output: Serialize + DeserializeOwned + Send + 'static;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetAllRequest {
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetRequest {
    pub name: String,
    pub key: String,
    pub value: TypedValue,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetManyRequest {
    pub name: String,
    pub key_values: HashMap<String, TypedValue>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequest {
    pub name: String,
    pub key: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetAllResponse {
    pub key_values: HashMap<String, TypedValue>,
}

/// Empty response data of the write operations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {}

impl Operation for GetAllRequest {
    const EVENT: &'static str = GET_ALL_EVENT;
    type Output = GetAllResponse;
}

impl Operation for SetRequest {
    const EVENT: &'static str = SET_EVENT;
    type Output = Ack;
}

impl Operation for SetManyRequest {
    const EVENT: &'static str = SET_MANY_EVENT;
    type Output = Ack;
}

impl Operation for DeleteRequest {
    const EVENT: &'static str = DELETE_EVENT;
    type Output = Ack;
}

/// Every request the authoritative side understands.
#[derive(Clone, Debug, PartialEq)]
pub enum DataStoreRequest {
    GetAll(GetAllRequest),
    Set(SetRequest),
    SetMany(SetManyRequest),
    Delete(DeleteRequest),
}

impl DataStoreRequest {
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::GetAll(_) => GET_ALL_EVENT,
            Self::Set(_) => SET_EVENT,
            Self::SetMany(_) => SET_MANY_EVENT,
            Self::Delete(_) => DELETE_EVENT,
        }
    }

    /// Store the request addresses.
    pub fn store_name(&self) -> &str {
        match self {
            Self::GetAll(r) => &r.name,
            Self::Set(r) => &r.name,
            Self::SetMany(r) => &r.name,
            Self::Delete(r) => &r.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callback_id_travels_as_string() {
        let json = serde_json::to_string(&CallbackId(42)).unwrap();
        assert_eq!(json, "\"42\"");
        let back: CallbackId = serde_json::from_str("\"42\"").unwrap();
        assert_eq!(back, CallbackId(42));
        assert!(serde_json::from_str::<CallbackId>("\"forty-two\"").is_err());
    }

    #[test]
    fn response_shapes() {
        let ok = serde_json::to_value(Response::ok(Ack {})).unwrap();
        assert_eq!(ok, serde_json::json!({ "success": true, "data": {} }));

        let failed = serde_json::to_value(Response::<Ack>::failed("no such store")).unwrap();
        assert_eq!(
            failed,
            serde_json::json!({ "success": false, "error": "no such store" })
        );

        let decoded: Response<Ack> = serde_json::from_value(failed).unwrap();
        assert_eq!(decoded.into_result(), Err("no such store".to_string()));
    }

    #[test]
    fn set_many_uses_camel_case_key_values() {
        let request = SetManyRequest {
            name: "prefs".into(),
            key_values: HashMap::from([("a".to_string(), TypedValue::Bool(true))]),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["keyValues"]["a"]["value"], true);
    }

    #[test]
    fn request_routing_names() {
        let request = DataStoreRequest::Delete(DeleteRequest {
            name: "prefs".into(),
            key: "k".into(),
        });
        assert_eq!(request.event_name(), DELETE_EVENT);
        assert_eq!(request.store_name(), "prefs");
        assert_eq!(<GetAllRequest as Operation>::EVENT, GET_ALL_EVENT);
    }
}
