use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

use crate::error_codes;
use crate::types::{JsonRpcVersion, RequestId, integer};

/// JSON-RPC error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonRpcErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    /// Generic bucket for anything a service raised that is not already
    /// shaped as `{code, message}`.
    ServerError,
}

impl JsonRpcErrorCode {
    pub fn code(&self) -> i64 {
        match self {
            JsonRpcErrorCode::ParseError => error_codes::PARSE_ERROR,
            JsonRpcErrorCode::InvalidRequest => error_codes::INVALID_REQUEST,
            JsonRpcErrorCode::MethodNotFound => error_codes::METHOD_NOT_FOUND,
            JsonRpcErrorCode::InvalidParams => error_codes::INVALID_PARAMS,
            JsonRpcErrorCode::InternalError => error_codes::INTERNAL_ERROR,
            JsonRpcErrorCode::ServerError => error_codes::SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            JsonRpcErrorCode::ParseError => "Parse error",
            JsonRpcErrorCode::InvalidRequest => "Invalid Request",
            JsonRpcErrorCode::MethodNotFound => "Method not found",
            JsonRpcErrorCode::InvalidParams => "Invalid params",
            JsonRpcErrorCode::InternalError => "Internal error",
            JsonRpcErrorCode::ServerError => "Server error",
        }
    }
}

impl fmt::Display for JsonRpcErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// The normalized `{code, message, data}` error shape sent on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcErrorObject {
    pub fn new(code: i64, message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            code,
            message: message.into(),
            data,
        }
    }

    pub fn from_code(code: JsonRpcErrorCode) -> Self {
        Self::new(code.code(), code.message(), None)
    }

    /// Normalizes an arbitrary value: recognized `{code, message}` shapes
    /// pass through verbatim, anything else is wrapped as a server error
    /// carrying the original value as `data`.
    pub fn from_value(value: Value) -> Self {
        ServiceError::from_value(value).into_error_object()
    }

    pub fn parse_error() -> Self {
        Self::from_code(JsonRpcErrorCode::ParseError)
    }

    pub fn invalid_request() -> Self {
        Self::from_code(JsonRpcErrorCode::InvalidRequest)
    }

    pub fn method_not_found() -> Self {
        Self::from_code(JsonRpcErrorCode::MethodNotFound)
    }

    pub fn invalid_params() -> Self {
        Self::from_code(JsonRpcErrorCode::InvalidParams)
    }

    pub fn internal_error(data: Option<Value>) -> Self {
        Self::new(
            error_codes::INTERNAL_ERROR,
            JsonRpcErrorCode::InternalError.message(),
            data,
        )
    }

    pub fn is_server_error(&self) -> bool {
        self.code == error_codes::SERVER_ERROR
    }
}

impl fmt::Display for JsonRpcErrorObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(data) = &self.data {
            write!(f, " {}", data)?;
        }
        Ok(())
    }
}

/// JSON-RPC Error response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    #[serde(rename = "jsonrpc")]
    pub version: JsonRpcVersion,
    pub error: JsonRpcErrorObject,
    #[serde(default)]
    pub id: RequestId,
}

impl JsonRpcError {
    pub fn new(id: RequestId, error: JsonRpcErrorObject) -> Self {
        Self {
            version: JsonRpcVersion::V2_0,
            error,
            id,
        }
    }

    pub fn from_service_error(id: RequestId, error: ServiceError) -> Self {
        Self::new(id, error.into_error_object())
    }

    pub fn parse_error() -> Self {
        Self::new(RequestId::Null, JsonRpcErrorObject::parse_error())
    }

    pub fn invalid_request(id: RequestId) -> Self {
        Self::new(id, JsonRpcErrorObject::invalid_request())
    }

    pub fn method_not_found(id: RequestId) -> Self {
        Self::new(id, JsonRpcErrorObject::method_not_found())
    }
}

impl fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "JSON-RPC Error {}: {}",
            self.error.code, self.error.message
        )
    }
}

impl std::error::Error for JsonRpcError {}

/// Error raised by a service hook or action.
///
/// `Recognized` errors reach the caller with their own code and message.
/// `Opaque` errors are wrapped into the generic server error with the
/// payload preserved as `data`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServiceError {
    #[error("[{code}] {message}")]
    Recognized {
        code: i64,
        message: String,
        data: Option<Value>,
    },

    #[error("service error: {payload}")]
    Opaque { payload: Value },
}

impl ServiceError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self::Recognized {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(code: i64, message: impl Into<String>, data: Value) -> Self {
        Self::Recognized {
            code,
            message: message.into(),
            data: Some(data),
        }
    }

    /// Wraps any serializable domain value as an opaque error.
    pub fn opaque<T: Serialize>(payload: T) -> Self {
        let payload =
            serde_json::to_value(payload).unwrap_or_else(|e| Value::String(e.to_string()));
        Self::Opaque { payload }
    }

    pub fn invalid_params(detail: impl Into<String>) -> Self {
        Self::with_data(
            error_codes::INVALID_PARAMS,
            JsonRpcErrorCode::InvalidParams.message(),
            Value::String(detail.into()),
        )
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::with_data(
            error_codes::INTERNAL_ERROR,
            JsonRpcErrorCode::InternalError.message(),
            Value::String(detail.into()),
        )
    }

    /// Applies the recognition rule to an arbitrary value: an object with an
    /// integer `code` and a string `message` is recognized, everything else
    /// is opaque.
    pub fn from_value(value: Value) -> Self {
        match recognized_parts(&value) {
            Some((code, message, data)) => Self::Recognized {
                code,
                message,
                data,
            },
            None => Self::Opaque { payload: value },
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            Self::Recognized { code, .. } => *code,
            Self::Opaque { .. } => error_codes::SERVER_ERROR,
        }
    }

    pub fn is_opaque(&self) -> bool {
        matches!(self, Self::Opaque { .. })
    }

    pub fn into_error_object(self) -> JsonRpcErrorObject {
        match self {
            Self::Recognized {
                code,
                message,
                data,
            } => JsonRpcErrorObject::new(code, message, data),
            Self::Opaque { payload } => JsonRpcErrorObject::new(
                error_codes::SERVER_ERROR,
                JsonRpcErrorCode::ServerError.message(),
                Some(payload),
            ),
        }
    }
}

fn recognized_parts(value: &Value) -> Option<(i64, String, Option<Value>)> {
    let object: &Map<String, Value> = value.as_object()?;
    let code = match object.get("code")? {
        Value::Number(n) => integer(n)?,
        _ => return None,
    };
    let message = object.get("message")?.as_str()?.to_string();
    Some((code, message, object.get("data").cloned()))
}

impl From<JsonRpcErrorCode> for ServiceError {
    fn from(code: JsonRpcErrorCode) -> Self {
        Self::new(code.code(), code.message())
    }
}

impl From<JsonRpcErrorObject> for ServiceError {
    fn from(error: JsonRpcErrorObject) -> Self {
        Self::Recognized {
            code: error.code,
            message: error.message,
            data: error.data,
        }
    }
}

impl From<RequestError> for ServiceError {
    fn from(error: RequestError) -> Self {
        error.code().into()
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(error: serde_json::Error) -> Self {
        Self::invalid_params(error.to_string())
    }
}

/// Why an inbound value could not become a request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("Parse error: no payload")]
    Parse,

    #[error("Invalid Request: {0}")]
    InvalidRequest(&'static str),

    #[error("Invalid params: {0}")]
    InvalidParams(&'static str),
}

impl RequestError {
    pub fn code(&self) -> JsonRpcErrorCode {
        match self {
            RequestError::Parse => JsonRpcErrorCode::ParseError,
            RequestError::InvalidRequest(_) => JsonRpcErrorCode::InvalidRequest,
            RequestError::InvalidParams(_) => JsonRpcErrorCode::InvalidParams,
        }
    }

    pub fn to_error_object(&self) -> JsonRpcErrorObject {
        JsonRpcErrorObject::from_code(self.code())
    }
}
