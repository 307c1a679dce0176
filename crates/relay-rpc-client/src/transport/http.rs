//! HTTP transport implementation for the RPC client

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::error::{RpcClientError, RpcClientResult, TransportError};
use crate::transport::Transport;

/// JSON-over-HTTP POST transport
#[derive(Debug)]
pub struct HttpTransport {
    /// HTTP client
    client: Client,
    /// Server endpoint URL
    endpoint: Url,
    /// Request counter
    request_counter: AtomicU64,
}

impl HttpTransport {
    /// Create a new HTTP transport with default configuration
    pub fn new(endpoint: &str) -> RpcClientResult<Self> {
        Self::with_config(endpoint, &ClientConfig::default())
    }

    /// Create a new HTTP transport honoring timeouts, user agent and
    /// default headers from `config`
    pub fn with_config(endpoint: &str, config: &ClientConfig) -> RpcClientResult<Self> {
        let url = parse_endpoint(endpoint)?;

        let mut builder = Client::builder()
            .timeout(config.timeouts.request)
            .connect_timeout(config.timeouts.connect)
            .default_headers(header_map(&config.connection.headers)?);
        if let Some(user_agent) = &config.connection.user_agent {
            builder = builder.user_agent(user_agent.as_str());
        }

        let client = builder.build().map_err(|e| {
            RpcClientError::config(format!("Failed to create HTTP client: {}", e))
        })?;

        Ok(Self::from_parts(client, url))
    }

    /// Create HTTP transport with custom client
    pub fn with_client(endpoint: &str, client: Client) -> RpcClientResult<Self> {
        Ok(Self::from_parts(client, parse_endpoint(endpoint)?))
    }

    fn from_parts(client: Client, endpoint: Url) -> Self {
        Self {
            client,
            endpoint,
            request_counter: AtomicU64::new(0),
        }
    }

    /// Number of requests sent so far
    pub fn requests_sent(&self) -> u64 {
        self.request_counter.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        request: Value,
        headers: &HashMap<String, String>,
    ) -> Result<Option<Value>, TransportError> {
        let sequence = self.request_counter.fetch_add(1, Ordering::Relaxed);
        debug!(endpoint = %self.endpoint, sequence, "sending request");

        let mut builder = self.client.post(self.endpoint.clone()).json(&request);
        for (name, value) in headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            warn!(endpoint = %self.endpoint, status = %status, "request rejected");
            return Err(TransportError::Http(format!(
                "HTTP error {}: {}",
                status, error_text
            )));
        }

        let body = response.bytes().await?;
        if body.is_empty() {
            return Ok(None);
        }
        serde_json::from_slice(&body)
            .map(Some)
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))
    }

    fn endpoint(&self) -> String {
        self.endpoint.to_string()
    }
}

fn parse_endpoint(endpoint: &str) -> RpcClientResult<Url> {
    let url = Url::parse(endpoint)
        .map_err(|e| RpcClientError::config(format!("Invalid URL: {}", e)))?;

    // Validate URL scheme
    if !matches!(url.scheme(), "http" | "https") {
        return Err(RpcClientError::config(format!(
            "Invalid scheme for HTTP transport: {}",
            url.scheme()
        )));
    }
    Ok(url)
}

fn header_map(headers: &HashMap<String, String>) -> RpcClientResult<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| RpcClientError::config(format!("Invalid header name: {}", name)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| RpcClientError::config(format!("Invalid value for header {}", name)))?;
        map.insert(name, value);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_endpoints() {
        assert!(matches!(
            HttpTransport::new("not a url"),
            Err(RpcClientError::Config(_))
        ));
        assert!(matches!(
            HttpTransport::new("ftp://localhost/rpc"),
            Err(RpcClientError::Config(_))
        ));
    }

    #[test]
    fn test_default_headers_are_validated() {
        let mut config = ClientConfig::default();
        config
            .connection
            .headers
            .insert("bad header".to_string(), "x".to_string());
        assert!(HttpTransport::with_config("http://localhost:3000/rpc", &config).is_err());

        let transport = HttpTransport::new("http://localhost:3000/rpc").unwrap();
        assert_eq!(transport.endpoint(), "http://localhost:3000/rpc");
        assert_eq!(transport.requests_sent(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        let transport = HttpTransport::new("http://127.0.0.1:1/rpc").unwrap();
        let result = transport
            .send(serde_json::json!({"jsonrpc": "2.0"}), &HashMap::new())
            .await;
        assert!(result.is_err());
    }
}
