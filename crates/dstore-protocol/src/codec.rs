use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ProtocolError, ProtocolResult};

/// JSON text codec for event bodies.
pub struct JsonCodec;

impl JsonCodec {
    pub fn encode<T: Serialize>(value: &T) -> ProtocolResult<String> {
        serde_json::to_string(value).map_err(|e| ProtocolError::Serialization(e.to_string()))
    }

    pub fn decode<T: DeserializeOwned>(text: &str) -> ProtocolResult<T> {
        serde_json::from_str(text).map_err(|e| ProtocolError::Deserialization(e.to_string()))
    }
}
