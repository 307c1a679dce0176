use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::RequestError;
use crate::types::{JsonRpcVersion, RequestId};

/// Parameters for a JSON-RPC request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RequestParams {
    /// Positional parameters as an array
    Array(Vec<Value>),
    /// Named parameters as an object
    Object(Map<String, Value>),
}

impl RequestParams {
    /// Only arrays and objects are structured params.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Array(items) => Some(RequestParams::Array(items)),
            Value::Object(map) => Some(RequestParams::Object(map)),
            _ => None,
        }
    }

    /// Get a parameter by name (object params only)
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            RequestParams::Object(map) => map.get(key),
            RequestParams::Array(_) => None,
        }
    }

    /// Get a parameter by index (array params only)
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        match self {
            RequestParams::Array(vec) => vec.get(index),
            RequestParams::Object(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            RequestParams::Object(map) => map.is_empty(),
            RequestParams::Array(vec) => vec.is_empty(),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            RequestParams::Object(map) => Value::Object(map.clone()),
            RequestParams::Array(arr) => Value::Array(arr.clone()),
        }
    }
}

impl From<Map<String, Value>> for RequestParams {
    fn from(map: Map<String, Value>) -> Self {
        RequestParams::Object(map)
    }
}

impl From<Vec<Value>> for RequestParams {
    fn from(vec: Vec<Value>) -> Self {
        RequestParams::Array(vec)
    }
}

/// A validated JSON-RPC request.
///
/// Built only through [`JsonRpcRequest::new`] or the validating
/// [`JsonRpcRequest::from_value`]; a value that fails validation never
/// produces a partially filled request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonRpcRequest {
    #[serde(rename = "jsonrpc")]
    pub version: JsonRpcVersion,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<RequestParams>,
    /// `None` means the id was absent, which makes this a notification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
}

impl JsonRpcRequest {
    pub fn new(
        id: Option<RequestId>,
        method: impl Into<String>,
        params: Option<RequestParams>,
    ) -> Self {
        Self {
            version: JsonRpcVersion::V2_0,
            method: method.into(),
            params,
            id,
        }
    }

    /// Create a notification (no id, no response expected)
    pub fn notification(method: impl Into<String>, params: Option<RequestParams>) -> Self {
        Self::new(None, method, params)
    }

    /// Validates a payload that may be missing entirely. A missing payload
    /// is a parse error.
    pub fn from_payload(payload: Option<Value>) -> Result<Self, RequestError> {
        match payload {
            Some(value) => Self::from_value(value),
            None => Err(RequestError::Parse),
        }
    }

    /// Validates an arbitrary JSON value. Checks run in a fixed order:
    /// object shape, version and method, id, then params.
    pub fn from_value(value: Value) -> Result<Self, RequestError> {
        let Value::Object(mut object) = value else {
            return Err(RequestError::InvalidRequest("request must be an object"));
        };

        let version = object
            .get("jsonrpc")
            .and_then(Value::as_str)
            .and_then(JsonRpcVersion::parse);
        let method = match object.remove("method") {
            Some(Value::String(method)) => Some(method),
            _ => None,
        };
        let (Some(version), Some(method)) = (version, method) else {
            return Err(RequestError::InvalidRequest(
                "jsonrpc must be \"2.0\" and method must be a string",
            ));
        };

        let id = match object.get("id") {
            None => None,
            Some(raw) => Some(RequestId::from_value(raw).ok_or(RequestError::InvalidRequest(
                "id must be null, a string or an integer",
            ))?),
        };

        let params = match object.remove("params") {
            None => None,
            Some(raw) => Some(RequestParams::from_value(raw).ok_or(
                RequestError::InvalidParams("params must be an array or an object"),
            )?),
        };

        Ok(Self {
            version,
            method,
            params,
            id,
        })
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    /// The id to echo in a response; null when the request carried none.
    pub fn response_id(&self) -> RequestId {
        self.id.clone().unwrap_or_default()
    }

    /// Get a parameter by name (if params are an object)
    pub fn get_param(&self, name: &str) -> Option<&Value> {
        self.params.as_ref()?.get(name)
    }

    /// Get a parameter by index (if params are an array)
    pub fn get_param_index(&self, index: usize) -> Option<&Value> {
        self.params.as_ref()?.get_index(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn invalid_request(value: Value) -> bool {
        matches!(
            JsonRpcRequest::from_value(value),
            Err(RequestError::InvalidRequest(_))
        )
    }

    #[test]
    fn test_valid_request() {
        let request = JsonRpcRequest::from_value(json!({
            "jsonrpc": "2.0",
            "method": "B.mirror",
            "params": {"kk": 1},
            "id": 1
        }))
        .unwrap();

        assert_eq!(request.method, "B.mirror");
        assert_eq!(request.id, Some(RequestId::Number(1)));
        assert_eq!(request.get_param("kk"), Some(&json!(1)));
        assert!(!request.is_notification());
    }

    #[test]
    fn test_null_id_is_not_a_notification() {
        let request =
            JsonRpcRequest::from_value(json!({"jsonrpc": "2.0", "method": "a.b", "id": null}))
                .unwrap();
        assert_eq!(request.id, Some(RequestId::Null));
        assert!(!request.is_notification());
    }

    #[test]
    fn test_absent_id_is_a_notification() {
        let request =
            JsonRpcRequest::from_value(json!({"jsonrpc": "2.0", "method": "a.b"})).unwrap();
        assert!(request.is_notification());
        assert_eq!(request.response_id(), RequestId::Null);
    }

    #[test]
    fn test_missing_fields_are_invalid_requests() {
        assert!(invalid_request(json!({"jsonrpc": "2.0", "id": 1})));
        assert!(invalid_request(json!({"method": "a.b", "id": 1})));
        assert!(invalid_request(json!({"jsonrpc": "1.0", "method": "a.b"})));
        assert!(invalid_request(json!({"jsonrpc": 2.0, "method": "a.b"})));
        assert!(invalid_request(json!({"jsonrpc": "2.0", "method": 3})));
    }

    #[test]
    fn test_non_objects_are_invalid_requests() {
        assert!(invalid_request(json!("a.b")));
        assert!(invalid_request(json!(1)));
        assert!(invalid_request(json!(null)));
        assert!(invalid_request(json!([{"jsonrpc": "2.0", "method": "a.b"}])));
    }

    #[test]
    fn test_structured_ids_are_invalid_requests() {
        assert!(invalid_request(json!({"jsonrpc": "2.0", "method": "a.b", "id": {}})));
        assert!(invalid_request(json!({"jsonrpc": "2.0", "method": "a.b", "id": [1]})));
        assert!(invalid_request(json!({"jsonrpc": "2.0", "method": "a.b", "id": 1.25})));
        assert!(invalid_request(json!({"jsonrpc": "2.0", "method": "a.b", "id": false})));
    }

    #[test]
    fn test_integral_float_id_is_accepted() {
        let request =
            JsonRpcRequest::from_value(json!({"jsonrpc": "2.0", "method": "a.b", "id": 1.0}))
                .unwrap();
        assert_eq!(request.id, Some(RequestId::Number(1)));
    }

    #[test]
    fn test_scalar_params_are_invalid_params() {
        let result =
            JsonRpcRequest::from_value(json!({"jsonrpc": "2.0", "method": "a.b", "params": 3}));
        assert!(matches!(result, Err(RequestError::InvalidParams(_))));
    }

    #[test]
    fn test_bad_id_wins_over_bad_params() {
        let result = JsonRpcRequest::from_value(
            json!({"jsonrpc": "2.0", "method": "a.b", "params": "x", "id": {}}),
        );
        assert!(matches!(result, Err(RequestError::InvalidRequest(_))));
    }

    #[test]
    fn test_missing_payload_is_parse_error() {
        assert_eq!(JsonRpcRequest::from_payload(None), Err(RequestError::Parse));
    }

    #[test]
    fn test_request_serialization() {
        let request = JsonRpcRequest::new(
            Some(RequestId::Number(3)),
            "Utility.sayHi",
            Some(vec![json!({"name": "Special Name"})].into()),
        );
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "jsonrpc": "2.0",
                "method": "Utility.sayHi",
                "params": [{"name": "Special Name"}],
                "id": 3
            })
        );

        let notification = JsonRpcRequest::notification("Blog.save", None);
        let json_str = serde_json::to_string(&notification).unwrap();
        assert!(!json_str.contains("\"id\""));
    }
}
