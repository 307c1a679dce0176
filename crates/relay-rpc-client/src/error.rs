//! Error types for client calls

use serde_json::{Value, json};
use thiserror::Error;

use relay_json_rpc_server::error_codes;
use relay_json_rpc_server::{JsonRpcErrorObject, RequestError, ServiceError};

/// Result type for client operations
pub type RpcClientResult<T> = Result<T, RpcClientError>;

/// Every way a remote call can fail, reported in the same code space as
/// server-side errors
#[derive(Error, Debug)]
pub enum RpcClientError {
    /// The outgoing request failed local validation
    #[error("Invalid request: {0}")]
    Request(#[from] RequestError),

    /// The request never produced a usable reply
    #[error("Network error: {0}")]
    Network(#[from] TransportError),

    /// The server answered with an error object
    #[error("Service error: {0}")]
    Service(ServiceError),

    /// The reply had neither `result` nor an `error` object
    #[error("Unknown response shape: {0}")]
    UnknownResponseShape(Value),

    /// The name is reserved for introspection and cannot be called
    #[error("'{0}' is a reserved name")]
    ReservedName(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Transport-specific errors
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP transport error: {0}")]
    Http(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Invalid response body: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            TransportError::Timeout
        } else if error.is_connect() {
            TransportError::ConnectionFailed(error.to_string())
        } else {
            TransportError::Http(error.to_string())
        }
    }
}

impl RpcClientError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// The error code a caller sees for this failure
    pub fn code(&self) -> i64 {
        match self {
            Self::Request(e) => e.code().code(),
            Self::Network(_) => error_codes::NETWORK_ERROR,
            Self::Service(e) => e.code(),
            Self::UnknownResponseShape(_) => error_codes::UNKNOWN_RESPONSE_SHAPE,
            Self::ReservedName(_) | Self::Config(_) => error_codes::INVALID_REQUEST,
        }
    }

    /// The failure as a normalized `{code, message, data}` error object
    pub fn to_error_object(&self) -> JsonRpcErrorObject {
        match self {
            Self::Request(e) => e.to_error_object(),
            Self::Network(e) => JsonRpcErrorObject::new(
                error_codes::NETWORK_ERROR,
                "Network error",
                Some(json!(e.to_string())),
            ),
            Self::Service(e) => e.clone().into_error_object(),
            Self::UnknownResponseShape(reply) => JsonRpcErrorObject::new(
                error_codes::UNKNOWN_RESPONSE_SHAPE,
                "Unknown response shape",
                Some(reply.clone()),
            ),
            Self::ReservedName(name) => JsonRpcErrorObject::new(
                error_codes::INVALID_REQUEST,
                "Invalid Request",
                Some(json!(format!("'{}' is a reserved name", name))),
            ),
            Self::Config(message) => JsonRpcErrorObject::new(
                error_codes::INVALID_REQUEST,
                "Invalid Request",
                Some(json!(message)),
            ),
        }
    }

    /// The service's own error, when the server reported one
    pub fn service_error(&self) -> Option<&ServiceError> {
        match self {
            Self::Service(e) => Some(e),
            _ => None,
        }
    }

    /// Whether the failure happened before or outside the server
    pub fn is_network_error(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(
            RpcClientError::Network(TransportError::Timeout).code(),
            -32001
        );
        assert_eq!(
            RpcClientError::UnknownResponseShape(json!({"jsonrpc": "2.0"})).code(),
            -32002
        );
        assert_eq!(
            RpcClientError::Request(RequestError::InvalidRequest("method")).code(),
            -32600
        );
        assert_eq!(
            RpcClientError::Service(ServiceError::new(10056, "x")).code(),
            10056
        );
        assert_eq!(
            RpcClientError::Service(ServiceError::opaque("boom")).code(),
            -32000
        );
    }

    #[test]
    fn test_error_objects() {
        let object =
            RpcClientError::Service(ServiceError::opaque(json!({"message": "error from B"})))
                .to_error_object();
        assert_eq!(object.code, -32000);
        assert_eq!(object.data, Some(json!({"message": "error from B"})));

        let object = RpcClientError::Network(TransportError::Http("HTTP 502".into()))
            .to_error_object();
        assert_eq!(object.code, -32001);
        assert_eq!(object.message, "Network error");
    }
}
