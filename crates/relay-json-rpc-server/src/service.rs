//! Services, actions and the arguments actions receive.
//!
//! A service is a named bag of actions plus an optional `before`/`after`
//! hook pair. Hooks and actions all receive the same [`CallContext`], so a
//! `before` hook can stash data (parsed credentials, a transaction handle)
//! that the action reads afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::context::CallContext;
use crate::error::ServiceError;
use crate::request::RequestParams;

/// Result type returned by actions and hooks
pub type ActionResult = Result<Value, ServiceError>;

/// Arguments handed to an action.
///
/// Array params arrive positionally; object params (or no params at all)
/// arrive as a single keyed mapping.
#[derive(Debug, Clone, PartialEq)]
pub enum Args {
    Positional(Vec<Value>),
    Named(Map<String, Value>),
}

impl Args {
    pub fn from_params(params: Option<RequestParams>) -> Self {
        match params {
            Some(RequestParams::Array(items)) => Args::Positional(items),
            Some(RequestParams::Object(map)) => Args::Named(map),
            None => Args::Named(Map::new()),
        }
    }

    /// Number of arguments as the action sees them: the positional count,
    /// or one for a keyed mapping.
    pub fn len(&self) -> usize {
        match self {
            Args::Positional(items) => items.len(),
            Args::Named(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Args::Positional(items) => items.is_empty(),
            Args::Named(map) => map.is_empty(),
        }
    }

    /// Raw argument at `index`. A keyed mapping is argument zero.
    pub fn value(&self, index: usize) -> Option<Value> {
        match self {
            Args::Positional(items) => items.get(index).cloned(),
            Args::Named(map) if index == 0 => Some(Value::Object(map.clone())),
            Args::Named(_) => None,
        }
    }

    /// Deserializes the argument at `index`; a missing argument is
    /// deserialized from `null` so `Option<T>` parameters work.
    pub fn get<T: DeserializeOwned>(&self, index: usize) -> Result<T, ServiceError> {
        let value = self.value(index).unwrap_or(Value::Null);
        serde_json::from_value(value).map_err(|e| {
            ServiceError::invalid_params(format!("argument {}: {}", index, e))
        })
    }

    /// Deserializes a named field of a keyed mapping.
    pub fn named<T: DeserializeOwned>(&self, key: &str) -> Result<T, ServiceError> {
        let value = match self {
            Args::Named(map) => map.get(key).cloned().unwrap_or(Value::Null),
            Args::Positional(_) => {
                return Err(ServiceError::invalid_params(format!(
                    "expected named parameter '{}', got positional params",
                    key
                )));
            }
        };
        serde_json::from_value(value)
            .map_err(|e| ServiceError::invalid_params(format!("parameter '{}': {}", key, e)))
    }

    pub fn into_values(self) -> Vec<Value> {
        match self {
            Args::Positional(items) => items,
            Args::Named(map) => vec![Value::Object(map)],
        }
    }
}

/// An invocable unit with a `(context, args) -> result` signature
#[async_trait]
pub trait Action: Send + Sync {
    async fn call(&self, ctx: &mut CallContext, args: Args) -> ActionResult;
}

#[async_trait]
impl<F> Action for F
where
    F: for<'a> Fn(&'a mut CallContext, Args) -> BoxFuture<'a, ActionResult> + Send + Sync,
{
    async fn call(&self, ctx: &mut CallContext, args: Args) -> ActionResult {
        (self)(ctx, args).await
    }
}

/// A registrable service
#[async_trait]
pub trait Service: Send + Sync {
    /// Name used when the service is registered without an explicit one
    fn name(&self) -> &str;

    /// Look up an action by name
    fn action(&self, name: &str) -> Option<Arc<dyn Action>>;

    /// Names of all actions (optional - used for introspection)
    fn actions(&self) -> Vec<String> {
        vec![]
    }

    /// Runs before every action of this service
    async fn before(&self, ctx: &mut CallContext) -> Result<(), ServiceError> {
        let _ = ctx;
        Ok(())
    }

    /// Runs after every action of this service that succeeded
    async fn after(&self, ctx: &mut CallContext) -> Result<(), ServiceError> {
        let _ = ctx;
        Ok(())
    }
}

/// Hook closure signature shared by `before` and `after`
pub type HookFn = Arc<
    dyn for<'a> Fn(&'a mut CallContext) -> BoxFuture<'a, Result<(), ServiceError>> + Send + Sync,
>;

/// A closure-backed service assembled with [`ServiceBuilder`]
pub struct FnService {
    name: String,
    actions: HashMap<String, Arc<dyn Action>>,
    before: Option<HookFn>,
    after: Option<HookFn>,
}

#[async_trait]
impl Service for FnService {
    fn name(&self) -> &str {
        &self.name
    }

    fn action(&self, name: &str) -> Option<Arc<dyn Action>> {
        self.actions.get(name).cloned()
    }

    fn actions(&self) -> Vec<String> {
        let mut names: Vec<String> = self.actions.keys().cloned().collect();
        names.sort();
        names
    }

    async fn before(&self, ctx: &mut CallContext) -> Result<(), ServiceError> {
        match &self.before {
            Some(hook) => hook(ctx).await,
            None => Ok(()),
        }
    }

    async fn after(&self, ctx: &mut CallContext) -> Result<(), ServiceError> {
        match &self.after {
            Some(hook) => hook(ctx).await,
            None => Ok(()),
        }
    }
}

/// Builder for closure-backed services
///
/// ```rust
/// use futures::FutureExt;
/// use relay_json_rpc_server::service::ServiceBuilder;
///
/// let service = ServiceBuilder::new("B")
///     .action("mirror", |_ctx, args| {
///         async move { Ok(args.value(0).unwrap_or_default()) }.boxed()
///     })
///     .build();
/// # let _ = service;
/// ```
pub struct ServiceBuilder {
    name: String,
    actions: HashMap<String, Arc<dyn Action>>,
    before: Option<HookFn>,
    after: Option<HookFn>,
}

impl ServiceBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            actions: HashMap::new(),
            before: None,
            after: None,
        }
    }

    /// Register an action; a later registration under the same name wins
    pub fn action<F>(mut self, name: impl Into<String>, action: F) -> Self
    where
        F: for<'a> Fn(&'a mut CallContext, Args) -> BoxFuture<'a, ActionResult>
            + Send
            + Sync
            + 'static,
    {
        self.actions.insert(name.into(), Arc::new(action));
        self
    }

    /// Register an [`Action`] implementation
    pub fn action_impl<A>(mut self, name: impl Into<String>, action: A) -> Self
    where
        A: Action + 'static,
    {
        self.actions.insert(name.into(), Arc::new(action));
        self
    }

    pub fn before<F>(mut self, hook: F) -> Self
    where
        F: for<'a> Fn(&'a mut CallContext) -> BoxFuture<'a, Result<(), ServiceError>>
            + Send
            + Sync
            + 'static,
    {
        self.before = Some(Arc::new(hook));
        self
    }

    pub fn after<F>(mut self, hook: F) -> Self
    where
        F: for<'a> Fn(&'a mut CallContext) -> BoxFuture<'a, Result<(), ServiceError>>
            + Send
            + Sync
            + 'static,
    {
        self.after = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> FnService {
        FnService {
            name: self.name,
            actions: self.actions,
            before: self.before,
            after: self.after,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use serde_json::json;

    #[test]
    fn test_args_from_params() {
        assert_eq!(Args::from_params(None), Args::Named(Map::new()));
        assert_eq!(
            Args::from_params(Some(RequestParams::Array(vec![json!(1), json!(2)]))).len(),
            2
        );

        let named = Args::from_params(Some(RequestParams::Object(
            json!({"kk": 1}).as_object().cloned().unwrap(),
        )));
        assert_eq!(named.value(0), Some(json!({"kk": 1})));
        assert_eq!(named.value(1), None);
    }

    #[test]
    fn test_args_typed_access() {
        let positional = Args::Positional(vec![json!(2), json!("two")]);
        assert_eq!(positional.get::<i64>(0).unwrap(), 2);
        assert_eq!(positional.get::<String>(1).unwrap(), "two");
        assert_eq!(positional.get::<Option<i64>>(5).unwrap(), None);

        let error = positional.get::<i64>(1).unwrap_err();
        assert_eq!(error.code(), -32602);

        let named = Args::Named(json!({"name": "Yi"}).as_object().cloned().unwrap());
        assert_eq!(named.named::<String>("name").unwrap(), "Yi");
        assert!(positional.named::<String>("name").is_err());
    }

    async fn say_hi(_ctx: &mut CallContext, args: Args) -> ActionResult {
        let name: String = args.named("name")?;
        Ok(json!({"say": format!("hello, {}", name)}))
    }

    #[tokio::test]
    async fn test_builder_exposes_actions() {
        let service = ServiceBuilder::new("Utility")
            .action("time", |_ctx, _args| async { Ok(json!("now")) }.boxed())
            .action("sayHi", |ctx, args| say_hi(ctx, args).boxed())
            .build();

        assert_eq!(service.name(), "Utility");
        assert_eq!(service.actions(), vec!["sayHi".to_string(), "time".to_string()]);
        assert!(service.action("time").is_some());
        assert!(service.action("missing").is_none());
    }
}
