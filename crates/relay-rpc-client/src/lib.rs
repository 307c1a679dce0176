//! # RPC Client Library
//!
//! Calls `"Service.action"` methods exposed by a relay JSON-RPC server.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use relay_rpc_client::RpcClient;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = RpcClient::connect("http://localhost:3000/rpc")?;
//!     client.set_header("auth", "123");
//!
//!     let blog = client.service("Blog").expect("not a reserved name");
//!     let id = blog.call("save", vec![json!("hello")]).await?;
//!     println!("saved post {}", id);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Errors
//!
//! Every failure is an [`RpcClientError`] with a JSON-RPC style
//! [`code`](RpcClientError::code): the server's own code for service errors,
//! `-32001` when the server could not be reached and `-32002` when the reply
//! could not be understood. A `-32000` server error is unwrapped so the
//! caller sees the payload the service originally failed with.

pub mod client;
pub mod config;
pub mod error;
pub mod prelude;
pub mod transport;

// Re-export main types
pub use client::{ActionHandle, RpcClient, RpcClientBuilder, ServiceHandle, RESERVED_NAMES};
pub use config::{ClientConfig, ConnectionConfig, IdPolicy, TimeoutConfig};
pub use error::{RpcClientError, RpcClientResult, TransportError};

// Re-export transport types
pub use transport::{BoxedTransport, HttpTransport, Transport};

// Re-export error types callers match on
pub use relay_json_rpc_server::{JsonRpcErrorObject, ServiceError};
