//! Configuration types for the RPC client

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Main client configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ClientConfig {
    /// Timeout configurations
    pub timeouts: TimeoutConfig,

    /// Connection configurations
    pub connection: ConnectionConfig,

    /// How request ids are generated
    pub id_policy: IdPolicy,
}

/// Timeout configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeoutConfig {
    /// Connection timeout
    #[serde(with = "duration_serde")]
    pub connect: Duration,

    /// Request timeout for individual calls
    #[serde(with = "duration_serde")]
    pub request: Duration,
}

/// Connection configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionConfig {
    /// User agent string
    pub user_agent: Option<String>,

    /// Custom headers to include in every request
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

/// Request id generation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IdPolicy {
    /// A unique, increasing integer per call
    #[default]
    Sequential,
    /// Every call carries `"id": null`
    Null,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            request: Duration::from_secs(30),
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            user_agent: Some(format!("relay-rpc-client/{}", env!("CARGO_PKG_VERSION"))),
            headers: HashMap::new(),
        }
    }
}

// Helper module for Duration serialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
