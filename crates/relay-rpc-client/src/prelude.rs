//! # RPC Client Prelude
//!
//! ```rust
//! use relay_rpc_client::prelude::*;
//! ```

// Core client types
pub use crate::client::{ActionHandle, RpcClient, RpcClientBuilder, ServiceHandle};
pub use crate::config::{ClientConfig, IdPolicy, TimeoutConfig};
pub use crate::error::{RpcClientError, RpcClientResult};

// Transport types
pub use crate::transport::{HttpTransport, Transport};

pub use relay_json_rpc_server::ServiceError;

// Standard library types commonly used with the client
pub use std::time::Duration;
