use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{JsonRpcError, JsonRpcErrorObject, ServiceError};
use crate::types::{JsonRpcVersion, RequestId};

/// A successful JSON-RPC response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(rename = "jsonrpc")]
    pub version: JsonRpcVersion,
    pub result: Value,
    #[serde(default)]
    pub id: RequestId,
}

impl JsonRpcResponse {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            version: JsonRpcVersion::V2_0,
            result,
            id,
        }
    }
}

impl From<(RequestId, Value)> for JsonRpcResponse {
    fn from((id, result): (RequestId, Value)) -> Self {
        Self::success(id, result)
    }
}

/// Either a successful response or an error response, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcMessage {
    /// Successful response with result field
    Response(JsonRpcResponse),
    /// Error response with error field
    Error(JsonRpcError),
}

impl JsonRpcMessage {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self::Response(JsonRpcResponse::success(id, result))
    }

    pub fn error(id: RequestId, error: JsonRpcErrorObject) -> Self {
        Self::Error(JsonRpcError::new(id, error))
    }

    pub fn from_outcome(id: RequestId, outcome: Result<Value, ServiceError>) -> Self {
        match outcome {
            Ok(result) => Self::success(id, result),
            Err(error) => Self::Error(JsonRpcError::from_service_error(id, error)),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, JsonRpcMessage::Error(_))
    }

    pub fn id(&self) -> &RequestId {
        match self {
            JsonRpcMessage::Response(resp) => &resp.id,
            JsonRpcMessage::Error(err) => &err.id,
        }
    }

    pub fn result(&self) -> Option<&Value> {
        match self {
            JsonRpcMessage::Response(resp) => Some(&resp.result),
            JsonRpcMessage::Error(_) => None,
        }
    }

    pub fn error_object(&self) -> Option<&JsonRpcErrorObject> {
        match self {
            JsonRpcMessage::Response(_) => None,
            JsonRpcMessage::Error(err) => Some(&err.error),
        }
    }
}

impl From<JsonRpcResponse> for JsonRpcMessage {
    fn from(response: JsonRpcResponse) -> Self {
        Self::Response(response)
    }
}

impl From<JsonRpcError> for JsonRpcMessage {
    fn from(error: JsonRpcError) -> Self {
        Self::Error(error)
    }
}

/// What one run over an inbound payload produced. Absence of any body is
/// expressed as `Option::<RunOutput>::None` by the runner.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RunOutput {
    Single(JsonRpcMessage),
    Batch(Vec<JsonRpcMessage>),
}

impl RunOutput {
    pub fn as_single(&self) -> Option<&JsonRpcMessage> {
        match self {
            RunOutput::Single(message) => Some(message),
            RunOutput::Batch(_) => None,
        }
    }

    pub fn as_batch(&self) -> Option<&[JsonRpcMessage]> {
        match self {
            RunOutput::Single(_) => None,
            RunOutput::Batch(messages) => Some(messages),
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
