//! # JSON-RPC Runtime Prelude
//!
//! ```rust
//! use relay_json_rpc_server::prelude::*;
//! ```

// Core JSON-RPC types
pub use crate::error::{JsonRpcError, JsonRpcErrorCode, JsonRpcErrorObject, ServiceError};
pub use crate::request::{JsonRpcRequest, RequestParams};
pub use crate::response::{JsonRpcMessage, JsonRpcResponse, RunOutput};
pub use crate::types::{JsonRpcVersion, RequestId};

// Services and execution
pub use crate::context::{CallContext, TransportMeta};
pub use crate::mount::MountMap;
pub use crate::runner::{ContextMode, Runner};
pub use crate::server::RpcServer;
pub use crate::service::{Action, ActionResult, Args, Service, ServiceBuilder};

// Standard error codes
pub use crate::error_codes::*;
