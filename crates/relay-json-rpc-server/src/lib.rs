//! # JSON-RPC 2.0 Service Runtime
//!
//! A transport-agnostic JSON-RPC 2.0 engine. Requests of the form
//! `"Service.action"` are validated, resolved against a registry of named
//! services and run through the service's `before` hook, the action and its
//! `after` hook, all sharing one [`CallContext`].
//!
//! ## Features
//! - Single requests, notifications and sequential batches
//! - Normalized error objects: anything that is not `{code, message}` is
//!   wrapped as a `-32000` server error with the original value as `data`
//! - Context mounts: sync or async factories injected per run
//! - No transport code; see `relay-http-rpc-server` for an HTTP binding

pub mod context;
pub mod error;
pub mod mount;
pub mod prelude;
pub mod registry;
pub mod request;
pub mod resolver;
pub mod response;
pub mod runner;
pub mod server;
pub mod service;
pub mod types;

// Re-export main types
pub use context::{CallContext, MountedValue, TransportMeta};
pub use error::{JsonRpcError, JsonRpcErrorCode, JsonRpcErrorObject, RequestError, ServiceError};
pub use mount::{MountFactory, MountMap};
pub use registry::{RegistryError, ServiceRegistry};
pub use request::{JsonRpcRequest, RequestParams};
pub use resolver::ResolvedMethod;
pub use response::{JsonRpcMessage, JsonRpcResponse, RunOutput};
pub use runner::{ContextMode, Runner};
pub use server::RpcServer;
pub use service::{Action, ActionResult, Args, FnService, HookFn, Service, ServiceBuilder};
pub use types::{JsonRpcVersion, RequestId};

/// JSON-RPC 2.0 version constant
pub const JSONRPC_VERSION: &str = "2.0";

/// Standard JSON-RPC 2.0 error codes
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;

    /// Catch-all for service errors that carry no usable `{code, message}`
    pub const SERVER_ERROR: i64 = -32000;

    // Client-local codes, never sent by a server
    pub const NETWORK_ERROR: i64 = -32001;
    pub const UNKNOWN_RESPONSE_SHAPE: i64 = -32002;
}
