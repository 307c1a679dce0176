use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::fmt;

/// Identifier carried by a request and echoed by its response.
///
/// `Null` is a legitimate id on the wire (the request still expects a
/// response); an *absent* id is modelled as `Option::None` on the request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum RequestId {
    #[default]
    Null,
    String(String),
    Number(i64),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::Null => write!(f, "null"),
            RequestId::String(s) => write!(f, "{}", s),
            RequestId::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        RequestId::Number(n)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        RequestId::String(s.to_string())
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        RequestId::String(s)
    }
}

impl RequestId {
    /// Accepts null, strings and integers (including integral floats such
    /// as `1.0`). Fractional numbers, booleans, arrays and objects are not
    /// valid ids.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(RequestId::Null),
            Value::String(s) => Some(RequestId::String(s.clone())),
            Value::Number(n) => integer(n).map(RequestId::Number),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RequestId::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            RequestId::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            RequestId::Number(n) => Some(*n),
            _ => None,
        }
    }
}

/// A JSON number with no fractional part, as an `i64`
pub(crate) fn integer(n: &Number) -> Option<i64> {
    if let Some(i) = n.as_i64() {
        return Some(i);
    }
    n.as_f64()
        .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
        .map(|f| f as i64)
}

/// JSON-RPC version
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum JsonRpcVersion {
    #[default]
    V2_0,
}

impl JsonRpcVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            JsonRpcVersion::V2_0 => crate::JSONRPC_VERSION,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            crate::JSONRPC_VERSION => Some(JsonRpcVersion::V2_0),
            _ => None,
        }
    }
}

impl fmt::Display for JsonRpcVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for JsonRpcVersion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for JsonRpcVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        JsonRpcVersion::parse(&s).ok_or_else(|| {
            serde::de::Error::custom(format!("Invalid JSON-RPC version: {}", s))
        })
    }
}
