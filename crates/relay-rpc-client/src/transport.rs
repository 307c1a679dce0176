//! Transport layer for the RPC client

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use crate::error::TransportError;

pub mod http;

// Re-export transport implementations
pub use http::HttpTransport;

/// Boxed transport for dynamic dispatch
pub type BoxedTransport = Box<dyn Transport>;

/// Delivers one request payload and returns the decoded reply
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request. `headers` are added on top of the transport's own
    /// defaults. `Ok(None)` means the server answered without a body.
    async fn send(
        &self,
        request: Value,
        headers: &HashMap<String, String>,
    ) -> Result<Option<Value>, TransportError>;

    /// Where requests are sent, for logging
    fn endpoint(&self) -> String;
}
