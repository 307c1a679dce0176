//! Per-invocation execution context shared by hooks and actions

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{JsonRpcErrorCode, ServiceError};
use crate::registry::ServiceRegistry;
use crate::request::JsonRpcRequest;
use crate::resolver;
use crate::service::{ActionResult, Args};

/// A mounted, type-erased shared resource
pub type MountedValue = Arc<dyn Any + Send + Sync>;

/// Transport-level facts about the inbound request (HTTP headers, peer
/// address, ...). The engine never interprets them; they are carried so
/// hooks and actions can.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransportMeta {
    headers: HashMap<String, String>,
    metadata: Map<String, Value>,
}

impl TransportMeta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Header names are stored lowercased
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.insert_header(name, value);
        self
    }

    pub fn insert_header(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn add_metadata(&mut self, key: impl Into<String>, value: Value) {
        self.metadata.insert(key.into(), value);
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }
}

/// The scope a service runs against.
///
/// One context is built per runner invocation (or per batch entry when
/// per-request isolation is enabled) and handed to `before`, the action and
/// `after` in turn as `&mut`.
pub struct CallContext {
    registry: Arc<ServiceRegistry>,
    transport: TransportMeta,
    mounts: HashMap<String, MountedValue>,
    state: Map<String, Value>,
    request: Option<JsonRpcRequest>,
}

impl CallContext {
    pub fn new(
        registry: Arc<ServiceRegistry>,
        transport: TransportMeta,
        mounts: HashMap<String, MountedValue>,
    ) -> Self {
        Self {
            registry,
            transport,
            mounts,
            state: Map::new(),
            request: None,
        }
    }

    /// Read-only view of the registry this invocation was started with
    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    pub fn transport(&self) -> &TransportMeta {
        &self.transport
    }

    /// Shorthand for `transport().header(name)`
    pub fn header(&self, name: &str) -> Option<&str> {
        self.transport.header(name)
    }

    /// The request currently being served. `None` only before the first
    /// request of a run has been bound.
    pub fn request(&self) -> Option<&JsonRpcRequest> {
        self.request.as_ref()
    }

    pub(crate) fn bind_request(&mut self, request: JsonRpcRequest) {
        self.request = Some(request);
    }

    /// Typed access to a mounted resource
    pub fn mounted<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        self.mounts
            .get(key)
            .cloned()
            .and_then(|value| value.downcast::<T>().ok())
    }

    /// Like [`CallContext::mounted`] but a missing or mistyped mount is an
    /// internal error
    pub fn require_mounted<T: Any + Send + Sync>(&self, key: &str) -> Result<Arc<T>, ServiceError> {
        self.mounted(key)
            .ok_or_else(|| ServiceError::internal(format!("mount '{}' is not available", key)))
    }

    pub fn has_mount(&self, key: &str) -> bool {
        self.mounts.contains_key(key)
    }

    /// Mount or replace a resource for the rest of this invocation
    pub fn mount(&mut self, key: impl Into<String>, value: MountedValue) {
        self.mounts.insert(key.into(), value);
    }

    /// Scratch value shared between hooks and actions
    pub fn state(&self, key: &str) -> Option<&Value> {
        self.state.get(key)
    }

    pub fn set_state(&mut self, key: impl Into<String>, value: Value) {
        self.state.insert(key.into(), value);
    }

    pub fn remove_state(&mut self, key: &str) -> Option<Value> {
        self.state.remove(key)
    }

    /// Call another registered action with this same context. Hooks of the
    /// target service are not run.
    pub async fn invoke(&mut self, method: &str, args: Args) -> ActionResult {
        let resolved = resolver::resolve(&self.registry, method)
            .ok_or_else(|| ServiceError::from(JsonRpcErrorCode::MethodNotFound))?;
        resolved.action.call(self, args).await
    }
}

impl fmt::Debug for CallContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut mounts: Vec<&String> = self.mounts.keys().collect();
        mounts.sort();
        f.debug_struct("CallContext")
            .field("services", &self.registry.names())
            .field("transport", &self.transport)
            .field("mounts", &mounts)
            .field("state", &self.state)
            .field("request", &self.request)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn empty_context() -> CallContext {
        CallContext::new(
            Arc::new(ServiceRegistry::new()),
            TransportMeta::new().with_header("Auth", "123"),
            HashMap::new(),
        )
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let ctx = empty_context();
        assert_eq!(ctx.header("auth"), Some("123"));
        assert_eq!(ctx.header("AUTH"), Some("123"));
        assert_eq!(ctx.header("missing"), None);
    }

    #[test]
    fn test_mounted_values_are_typed() {
        let mut ctx = empty_context();
        ctx.mount("bb", Arc::new(String::from("??")));

        assert_eq!(ctx.mounted::<String>("bb").as_deref(), Some(&String::from("??")));
        assert!(ctx.mounted::<u32>("bb").is_none());
        assert!(ctx.mounted::<String>("cc").is_none());
        assert_eq!(ctx.require_mounted::<String>("cc").unwrap_err().code(), -32603);
    }

    #[test]
    fn test_state_round_trip() {
        let mut ctx = empty_context();
        ctx.set_state("user", json!({"id": 1}));
        assert_eq!(ctx.state("user"), Some(&json!({"id": 1})));
        assert_eq!(ctx.remove_state("user"), Some(json!({"id": 1})));
        assert!(ctx.state("user").is_none());
    }

    #[tokio::test]
    async fn test_invoke_unknown_method() {
        let mut ctx = empty_context();
        let error = ctx.invoke("B.rpc", Args::Positional(vec![])).await.unwrap_err();
        assert_eq!(error.code(), -32601);
    }
}
