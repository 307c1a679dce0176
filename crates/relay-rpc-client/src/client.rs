//! Main RPC client implementation

use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::{debug, warn};

use relay_json_rpc_server::error_codes;
use relay_json_rpc_server::{JsonRpcRequest, RequestId, RequestParams, ServiceError};

use crate::config::{ClientConfig, IdPolicy};
use crate::error::{RpcClientError, RpcClientResult};
use crate::transport::{BoxedTransport, HttpTransport};

/// Names that never resolve to a service or action. Debuggers and
/// pretty-printers probe them.
pub const RESERVED_NAMES: &[&str] = &["inspect"];

fn is_reserved(name: &str) -> bool {
    RESERVED_NAMES.contains(&name)
}

/// Calls `"Service.action"` methods on a remote runtime
pub struct RpcClient {
    /// Transport layer
    transport: BoxedTransport,
    /// Configuration
    config: ClientConfig,
    /// Headers added to every request
    headers: RwLock<HashMap<String, String>>,
    /// Request ID counter
    request_counter: AtomicI64,
}

impl RpcClient {
    /// Create a new client with the given transport
    pub fn new(transport: BoxedTransport, config: ClientConfig) -> Self {
        Self {
            transport,
            config,
            headers: RwLock::new(HashMap::new()),
            request_counter: AtomicI64::new(1),
        }
    }

    /// HTTP client for `url` with default configuration
    pub fn connect(url: &str) -> RpcClientResult<Self> {
        RpcClientBuilder::new().with_url(url).build()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Handle for the remote service `name`. Reserved names yield `None`.
    pub fn service(&self, name: &str) -> Option<ServiceHandle<'_>> {
        if is_reserved(name) {
            return None;
        }
        Some(ServiceHandle {
            client: self,
            name: name.to_string(),
        })
    }

    /// Add or replace a header sent with every subsequent call
    pub fn set_header(&self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.write().insert(name.into(), value.into());
    }

    pub fn remove_header(&self, name: &str) -> Option<String> {
        self.headers.write().remove(name)
    }

    /// Call `service.action` with positional arguments
    pub async fn invoke(
        &self,
        service: &str,
        action: &str,
        args: Vec<Value>,
    ) -> RpcClientResult<Value> {
        let method = format!("{}.{}", service, action);
        let request = build_request(Some(self.next_id()), &method, args)?;

        debug!(method = %method, id = ?request.get("id"), "calling remote action");
        let reply = self.send(request).await.inspect_err(|e| {
            warn!(method = %method, error = %e, "call failed");
        })?;

        interpret_reply(reply).inspect_err(|e| {
            debug!(method = %method, code = e.code(), "remote action failed");
        })
    }

    /// Send `service.action` as a notification. Whatever the server
    /// answers is ignored; only transport failures are reported.
    pub async fn notify(
        &self,
        service: &str,
        action: &str,
        args: Vec<Value>,
    ) -> RpcClientResult<()> {
        let method = format!("{}.{}", service, action);
        let request = build_request(None, &method, args)?;

        debug!(method = %method, "sending notification");
        self.send(request).await?;
        Ok(())
    }

    async fn send(&self, request: Value) -> RpcClientResult<Option<Value>> {
        let headers = self.headers.read().clone();
        Ok(self.transport.send(request, &headers).await?)
    }

    fn next_id(&self) -> RequestId {
        match self.config.id_policy {
            IdPolicy::Sequential => {
                RequestId::Number(self.request_counter.fetch_add(1, Ordering::SeqCst))
            }
            IdPolicy::Null => RequestId::Null,
        }
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("endpoint", &self.transport.endpoint())
            .field("config", &self.config)
            .finish()
    }
}

/// A remote service, bound to the client that created it
#[derive(Debug, Clone)]
pub struct ServiceHandle<'a> {
    client: &'a RpcClient,
    name: String,
}

impl<'a> ServiceHandle<'a> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handle for one action. Reserved names yield `None`.
    pub fn action(&self, name: &str) -> Option<ActionHandle<'a>> {
        if is_reserved(name) {
            return None;
        }
        Some(ActionHandle {
            client: self.client,
            service: self.name.clone(),
            name: name.to_string(),
        })
    }

    pub async fn call(&self, action: &str, args: Vec<Value>) -> RpcClientResult<Value> {
        match self.action(action) {
            Some(handle) => handle.call(args).await,
            None => Err(RpcClientError::ReservedName(action.to_string())),
        }
    }

    pub async fn notify(&self, action: &str, args: Vec<Value>) -> RpcClientResult<()> {
        match self.action(action) {
            Some(handle) => handle.notify(args).await,
            None => Err(RpcClientError::ReservedName(action.to_string())),
        }
    }
}

/// A callable remote action
#[derive(Debug, Clone)]
pub struct ActionHandle<'a> {
    client: &'a RpcClient,
    service: String,
    name: String,
}

impl ActionHandle<'_> {
    /// `"Service.action"`
    pub fn method(&self) -> String {
        format!("{}.{}", self.service, self.name)
    }

    pub async fn call(&self, args: Vec<Value>) -> RpcClientResult<Value> {
        self.client.invoke(&self.service, &self.name, args).await
    }

    pub async fn notify(&self, args: Vec<Value>) -> RpcClientResult<()> {
        self.client.notify(&self.service, &self.name, args).await
    }
}

/// Builds the wire request and runs it through the same validation the
/// server applies
fn build_request(id: Option<RequestId>, method: &str, args: Vec<Value>) -> RpcClientResult<Value> {
    let request = JsonRpcRequest::new(id, method, Some(RequestParams::Array(args)));
    let value = serde_json::to_value(&request)
        .map_err(|e| RpcClientError::config(format!("request is not serializable: {}", e)))?;
    JsonRpcRequest::from_value(value.clone())?;
    Ok(value)
}

/// Maps a reply onto the call outcome. An `error` object wins over
/// `result`; a generic server error is unwrapped to the service's own
/// payload.
fn interpret_reply(reply: Option<Value>) -> RpcClientResult<Value> {
    let mut reply = match reply {
        Some(Value::Object(reply)) => reply,
        other => {
            return Err(RpcClientError::UnknownResponseShape(
                other.unwrap_or(Value::Null),
            ));
        }
    };

    if let Some(Value::Object(error)) = reply.get("error") {
        return Err(RpcClientError::Service(service_error(error)));
    }

    match reply.remove("result") {
        Some(result) => Ok(result),
        None => Err(RpcClientError::UnknownResponseShape(Value::Object(reply))),
    }
}

fn service_error(error: &Map<String, Value>) -> ServiceError {
    let code = error.get("code").and_then(Value::as_i64);
    if code == Some(error_codes::SERVER_ERROR) {
        ServiceError::Opaque {
            payload: error.get("data").cloned().unwrap_or(Value::Null),
        }
    } else {
        ServiceError::from_value(Value::Object(error.clone()))
    }
}

/// Builder for creating RPC clients
pub struct RpcClientBuilder {
    transport: Option<BoxedTransport>,
    url: Option<String>,
    config: Option<ClientConfig>,
}

impl RpcClientBuilder {
    /// Create a new client builder
    pub fn new() -> Self {
        Self {
            transport: None,
            url: None,
            config: None,
        }
    }

    /// Set transport
    pub fn with_transport(mut self, transport: BoxedTransport) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Use an HTTP transport for `url`, built from the final configuration
    pub fn with_url(mut self, url: &str) -> Self {
        self.url = Some(url.to_string());
        self
    }

    /// Set configuration
    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the client
    pub fn build(self) -> RpcClientResult<RpcClient> {
        let config = self.config.unwrap_or_default();
        let transport = match (self.transport, self.url) {
            (Some(transport), _) => transport,
            (None, Some(url)) => Box::new(HttpTransport::with_config(&url, &config)?),
            (None, None) => {
                return Err(RpcClientError::config(
                    "a transport or URL must be set before building the client",
                ));
            }
        };
        Ok(RpcClient::new(transport, config))
    }
}

impl Default for RpcClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::transport::Transport;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Arc;

    type Reply = Result<Option<Value>, TransportError>;

    #[derive(Default)]
    struct Recorded {
        replies: Mutex<VecDeque<Reply>>,
        requests: Mutex<Vec<(Value, HashMap<String, String>)>>,
    }

    /// Replays canned replies and records what was sent
    #[derive(Clone, Default)]
    struct MockTransport(Arc<Recorded>);

    impl MockTransport {
        fn reply(self, reply: Reply) -> Self {
            self.0.replies.lock().push_back(reply);
            self
        }

        fn requests(&self) -> Vec<(Value, HashMap<String, String>)> {
            self.0.requests.lock().clone()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(
            &self,
            request: Value,
            headers: &HashMap<String, String>,
        ) -> Result<Option<Value>, TransportError> {
            self.0.requests.lock().push((request, headers.clone()));
            self.0
                .replies
                .lock()
                .pop_front()
                .unwrap_or(Err(TransportError::ConnectionFailed("no reply".into())))
        }

        fn endpoint(&self) -> String {
            "mock://".to_string()
        }
    }

    fn client(transport: &MockTransport, config: ClientConfig) -> RpcClient {
        RpcClient::new(Box::new(transport.clone()), config)
    }

    #[tokio::test]
    async fn test_call_sends_positional_params_with_sequential_ids() {
        let transport = MockTransport::default()
            .reply(Ok(Some(json!({"jsonrpc": "2.0", "result": "hello from B", "id": 1}))))
            .reply(Ok(Some(json!({"jsonrpc": "2.0", "result": {"kk": 1}, "id": 2}))));
        let client = client(&transport, ClientConfig::default());

        let b = client.service("B").unwrap();
        assert_eq!(b.call("say", vec![]).await.unwrap(), json!("hello from B"));
        let mirror = b.action("mirror").unwrap();
        assert_eq!(mirror.method(), "B.mirror");
        assert_eq!(mirror.call(vec![json!({"kk": 1})]).await.unwrap(), json!({"kk": 1}));

        let sent = transport.requests();
        assert_eq!(
            sent[0].0,
            json!({"jsonrpc": "2.0", "method": "B.say", "params": [], "id": 1})
        );
        assert_eq!(sent[1].0["params"], json!([{"kk": 1}]));
        assert_eq!(sent[1].0["id"], json!(2));
    }

    #[tokio::test]
    async fn test_null_id_policy() {
        let transport = MockTransport::default()
            .reply(Ok(Some(json!({"jsonrpc": "2.0", "result": 1, "id": null}))));
        let config = ClientConfig {
            id_policy: IdPolicy::Null,
            ..ClientConfig::default()
        };
        client(&transport, config).invoke("B", "say", vec![]).await.unwrap();
        assert_eq!(transport.requests()[0].0["id"], Value::Null);
    }

    #[test]
    fn test_reserved_names_never_build_calls() {
        let transport = MockTransport::default();
        let client = client(&transport, ClientConfig::default());

        assert!(client.service("inspect").is_none());
        assert!(client.service("B").unwrap().action("inspect").is_none());
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_reserved_action_call_fails_locally() {
        let transport = MockTransport::default();
        let client = client(&transport, ClientConfig::default());

        let error = client.service("B").unwrap().call("inspect", vec![]).await.unwrap_err();
        assert!(matches!(error, RpcClientError::ReservedName(_)));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_server_error_is_unwrapped_to_service_payload() {
        let transport = MockTransport::default().reply(Ok(Some(json!({
            "jsonrpc": "2.0",
            "error": {"code": -32000, "message": "Server error", "data": {"message": "error from B"}},
            "id": 1
        }))));
        let error = client(&transport, ClientConfig::default())
            .invoke("B", "wrong", vec![])
            .await
            .unwrap_err();

        assert_eq!(
            error.service_error(),
            Some(&ServiceError::Opaque {
                payload: json!({"message": "error from B"})
            })
        );
        assert_eq!(error.code(), -32000);
    }

    #[tokio::test]
    async fn test_other_errors_pass_through() {
        let transport = MockTransport::default().reply(Ok(Some(json!({
            "jsonrpc": "2.0",
            "error": {"code": -32601, "message": "Method not found"},
            "id": 1
        }))));
        let error = client(&transport, ClientConfig::default())
            .invoke("B", "wrong3", vec![])
            .await
            .unwrap_err();

        assert_eq!(error.code(), -32601);
        assert_eq!(
            error.to_error_object(),
            relay_json_rpc_server::JsonRpcErrorObject::method_not_found()
        );
    }

    #[tokio::test]
    async fn test_null_result_is_a_value() {
        let transport = MockTransport::default()
            .reply(Ok(Some(json!({"jsonrpc": "2.0", "result": null, "id": 1}))));
        let result = client(&transport, ClientConfig::default())
            .invoke("B", "nothing", vec![])
            .await
            .unwrap();
        assert_eq!(result, Value::Null);
    }

    #[tokio::test]
    async fn test_unknown_shapes() {
        let transport = MockTransport::default()
            .reply(Ok(Some(json!({"jsonrpc": "2.0", "id": 1}))))
            .reply(Ok(None))
            .reply(Ok(Some(json!([]))))
            .reply(Ok(Some(json!({"jsonrpc": "2.0", "error": "boom", "id": 1}))));
        let client = client(&transport, ClientConfig::default());

        for _ in 0..4 {
            let error = client.invoke("B", "say", vec![]).await.unwrap_err();
            assert_eq!(error.code(), -32002, "{error}");
        }
    }

    #[tokio::test]
    async fn test_transport_failure_is_network_error() {
        let transport = MockTransport::default().reply(Err(TransportError::Timeout));
        let error = client(&transport, ClientConfig::default())
            .invoke("B", "say", vec![])
            .await
            .unwrap_err();
        assert!(error.is_network_error());
        assert_eq!(error.code(), -32001);
    }

    #[tokio::test]
    async fn test_headers_and_notifications() {
        let transport = MockTransport::default().reply(Ok(None));
        let client = client(&transport, ClientConfig::default());
        client.set_header("auth", "123");

        client
            .service("Blog")
            .unwrap()
            .notify("touch", vec![json!(1)])
            .await
            .unwrap();

        let (request, headers) = &transport.requests()[0];
        assert!(request.get("id").is_none());
        assert_eq!(request["method"], json!("Blog.touch"));
        assert_eq!(headers.get("auth").map(String::as_str), Some("123"));

        assert_eq!(client.remove_header("auth").as_deref(), Some("123"));
    }

    #[test]
    fn test_builder_requires_a_transport() {
        assert!(matches!(
            RpcClientBuilder::new().build(),
            Err(RpcClientError::Config(_))
        ));
        assert!(RpcClientBuilder::new()
            .with_url("http://localhost:3000/rpc")
            .build()
            .is_ok());
    }
}
