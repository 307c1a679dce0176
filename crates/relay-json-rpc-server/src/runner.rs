//! Single and batch execution over one inbound payload

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::context::{CallContext, TransportMeta};
use crate::error::{JsonRpcError, JsonRpcErrorCode, ServiceError};
use crate::mount::MountMap;
use crate::registry::ServiceRegistry;
use crate::request::JsonRpcRequest;
use crate::resolver;
use crate::response::{JsonRpcMessage, RunOutput};
use crate::service::{ActionResult, Args};
use crate::types::RequestId;

/// How batch entries see the execution context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContextMode {
    /// One context per run; batch entries execute in input order and
    /// observe each other's mounted state and hook side effects.
    #[default]
    Shared,
    /// A fresh context (mounts resolved again) for every batch entry.
    PerRequest,
}

/// Drives one inbound payload through validation, resolution and
/// invocation. Holds an immutable registry snapshot, so concurrent runs
/// never observe registry changes.
#[derive(Clone, Debug)]
pub struct Runner {
    registry: Arc<ServiceRegistry>,
    mounts: Arc<MountMap>,
    mode: ContextMode,
}

impl Runner {
    pub fn new(registry: Arc<ServiceRegistry>, mounts: Arc<MountMap>) -> Self {
        Self {
            registry,
            mounts,
            mode: ContextMode::default(),
        }
    }

    pub fn with_context_mode(mut self, mode: ContextMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn context_mode(&self) -> ContextMode {
        self.mode
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// Adapts a raw transport request: `parse_body` turns it into a JSON
    /// value, and any parse failure counts as a missing body.
    pub async fn handle<R, E, P>(
        &self,
        raw: R,
        parse_body: P,
        transport: TransportMeta,
    ) -> Option<RunOutput>
    where
        P: FnOnce(R) -> Result<Value, E>,
        E: std::fmt::Display,
    {
        let payload = match parse_body(raw) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(error = %e, "request body could not be parsed");
                None
            }
        };
        self.run(payload, transport).await
    }

    /// [`Runner::handle`] with JSON text as the body format
    pub async fn handle_bytes(&self, body: &[u8], transport: TransportMeta) -> Option<RunOutput> {
        self.handle(body, serde_json::from_slice::<Value>, transport)
            .await
    }

    /// Runs a payload. Never fails: every problem becomes an error
    /// response. `None` means there is nothing to send back.
    pub async fn run(&self, payload: Option<Value>, transport: TransportMeta) -> Option<RunOutput> {
        let Some(payload) = payload else {
            return Some(RunOutput::Single(JsonRpcError::parse_error().into()));
        };

        match payload {
            Value::Array(items) => self.run_batch(items, transport).await,
            single => {
                let request = match parse_entry(single) {
                    Ok(request) => request,
                    Err(rejected) => return Some(RunOutput::Single(rejected)),
                };
                let mut ctx = match self.build_context(transport).await {
                    Ok(ctx) => ctx,
                    Err(error) if request.is_notification() => {
                        warn!(error = %error, "context mounts failed for notification");
                        return None;
                    }
                    Err(error) => return Some(mount_failure(error)),
                };
                self.run_request(&mut ctx, request)
                    .await
                    .map(RunOutput::Single)
            }
        }
    }

    async fn run_batch(&self, items: Vec<Value>, transport: TransportMeta) -> Option<RunOutput> {
        if items.is_empty() {
            return Some(RunOutput::Single(
                JsonRpcError::invalid_request(RequestId::Null).into(),
            ));
        }

        debug!(size = items.len(), mode = ?self.mode, "running batch");

        let entries: Vec<_> = items.into_iter().map(parse_entry).collect();
        let mut responses = Vec::with_capacity(entries.len());
        match self.mode {
            ContextMode::Shared => {
                let mut ctx = match self.build_context(transport).await {
                    Ok(ctx) => ctx,
                    Err(error) if entries.iter().all(is_notification_entry) => {
                        warn!(error = %error, "context mounts failed for notification batch");
                        return None;
                    }
                    Err(error) => return Some(mount_failure(error)),
                };
                for entry in entries {
                    let response = match entry {
                        Ok(request) => self.run_request(&mut ctx, request).await,
                        Err(rejected) => Some(rejected),
                    };
                    responses.extend(response);
                }
            }
            ContextMode::PerRequest => {
                for entry in entries {
                    let request = match entry {
                        Ok(request) => request,
                        Err(rejected) => {
                            responses.push(rejected);
                            continue;
                        }
                    };
                    let response = match self.build_context(transport.clone()).await {
                        Ok(mut ctx) => self.run_request(&mut ctx, request).await,
                        Err(error) if request.is_notification() => {
                            warn!(error = %error, "context mounts failed for notification");
                            None
                        }
                        Err(error) => {
                            warn!(error = %error, "context mounts could not be resolved");
                            Some(JsonRpcError::from_service_error(RequestId::Null, error).into())
                        }
                    };
                    responses.extend(response);
                }
            }
        }

        if responses.is_empty() {
            None
        } else {
            Some(RunOutput::Batch(responses))
        }
    }

    async fn build_context(&self, transport: TransportMeta) -> Result<CallContext, ServiceError> {
        let mounts = self.mounts.resolve().await?;
        Ok(CallContext::new(Arc::clone(&self.registry), transport, mounts))
    }

    /// Handles one validated request. Returns `None` for notifications.
    async fn run_request(
        &self,
        ctx: &mut CallContext,
        request: JsonRpcRequest,
    ) -> Option<JsonRpcMessage> {
        let method = request.method.clone();
        let id = request.id.clone();
        let outcome = self.invoke(ctx, request).await;

        match (&outcome, &id) {
            (Ok(_), _) => debug!(method = %method, id = ?id, "request succeeded"),
            (Err(error), None) => {
                warn!(method = %method, error = %error, "notification failed")
            }
            (Err(error), Some(id)) => {
                warn!(method = %method, id = %id, error = %error, "request failed")
            }
        }

        let id = id?;
        Some(JsonRpcMessage::from_outcome(id, outcome))
    }

    /// before -> action -> after, sharing `ctx`. A failure in any step ends
    /// the chain.
    async fn invoke(&self, ctx: &mut CallContext, request: JsonRpcRequest) -> ActionResult {
        let resolved = resolver::resolve(&self.registry, &request.method)
            .ok_or_else(|| ServiceError::from(JsonRpcErrorCode::MethodNotFound))?;

        let args = Args::from_params(request.params.clone());
        ctx.bind_request(request);

        resolved.service.before(ctx).await?;
        let result = resolved.action.call(ctx, args).await?;
        resolved.service.after(ctx).await?;
        Ok(result)
    }
}

/// Validates one request value; a rejected value carries its error response.
fn parse_entry(value: Value) -> Result<JsonRpcRequest, JsonRpcMessage> {
    JsonRpcRequest::from_value(value).map_err(|e| {
        debug!(error = %e, "rejected request");
        JsonRpcError::new(RequestId::Null, e.to_error_object()).into()
    })
}

fn is_notification_entry(entry: &Result<JsonRpcRequest, JsonRpcMessage>) -> bool {
    matches!(entry, Ok(request) if request.is_notification())
}

fn mount_failure(error: ServiceError) -> RunOutput {
    warn!(error = %error, "context mounts could not be resolved");
    RunOutput::Single(JsonRpcError::from_service_error(RequestId::Null, error).into())
}
