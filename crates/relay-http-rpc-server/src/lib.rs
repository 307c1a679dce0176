//! # HTTP JSON-RPC Server
//!
//! HTTP/1.1 transport for the relay service runtime. One endpoint path
//! accepts `POST` bodies holding a single JSON-RPC request or a batch and
//! answers with the runner's output, or `204 No Content` when there is
//! nothing to send back (notifications).
//!
//! ## Features
//! - hyper 1 accept loop, one task per connection
//! - CORS support for browser-based clients
//! - Request headers and peer address forwarded to services
//! - Body size limit
//! - Environment-driven configuration

pub mod config;
pub mod cors;
pub mod handler;
pub mod server;

// Re-export main types
pub use config::{ConfigError, ServerConfig};
pub use cors::CorsLayer;
pub use handler::RpcHttpHandler;
pub use server::{HttpRpcServer, HttpRpcServerBuilder};

// Re-export foundational types
pub use relay_json_rpc_server::{RpcServer, Runner};

/// Result type for HTTP transport operations
pub type Result<T> = std::result::Result<T, HttpRpcError>;

/// HTTP transport errors
#[derive(Debug, thiserror::Error)]
pub enum HttpRpcError {
    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
