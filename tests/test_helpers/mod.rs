//! Shared fixtures for the integration tests: sample services and a server
//! bound to an ephemeral port.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::FutureExt;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use relay_http_rpc_server::HttpRpcServer;
use relay_json_rpc_server::prelude::*;
use relay_json_rpc_server::FnService;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Everything the fixture services observed
#[derive(Clone, Default)]
pub struct Observed {
    pub auth_headers: Arc<Mutex<Vec<Option<String>>>>,
    pub after_calls: Arc<AtomicUsize>,
}

impl Observed {
    pub fn after_calls(&self) -> usize {
        self.after_calls.load(Ordering::SeqCst)
    }
}

async fn record_auth(ctx: &mut CallContext, observed: Observed) -> Result<(), ServiceError> {
    let auth = ctx.header("auth").map(str::to_string);
    observed.auth_headers.lock().push(auth.clone());
    ctx.set_state("auth", json!(auth));
    Ok(())
}

async fn whoami(ctx: &mut CallContext, _args: Args) -> ActionResult {
    Ok(ctx.state("auth").cloned().unwrap_or(Value::Null))
}

async fn rpc(_ctx: &mut CallContext, args: Args) -> ActionResult {
    let n: Option<i64> = args.get(0)?;
    Ok(json!({"rpc": n.unwrap_or(1)}))
}

async fn remember(ctx: &mut CallContext, args: Args) -> ActionResult {
    let memo = args.value(0).unwrap_or(Value::Null);
    ctx.set_state("memo", memo.clone());
    Ok(memo)
}

async fn recall(ctx: &mut CallContext, _args: Args) -> ActionResult {
    Ok(ctx.state("memo").cloned().unwrap_or(Value::Null))
}

/// Calls `B.rpc` through the shared context
async fn forward(ctx: &mut CallContext, _args: Args) -> ActionResult {
    ctx.invoke("B.rpc", Args::Positional(vec![json!(7)])).await
}

async fn get_setting(ctx: &mut CallContext, args: Args) -> ActionResult {
    let key: String = args.get(0)?;
    let settings = ctx.require_mounted::<Settings>("settings")?;
    Ok(settings.0.get(&key).cloned().unwrap_or(Value::Null))
}

/// Mounted configuration map
pub struct Settings(pub serde_json::Map<String, Value>);

/// Service `B`, modelled on the sample services used across the tests
pub fn service_b(observed: &Observed) -> FnService {
    let before = observed.clone();
    let after = observed.clone();
    ServiceBuilder::new("B")
        .before(move |ctx| record_auth(ctx, before.clone()).boxed())
        .after(move |_ctx| {
            after.after_calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }.boxed()
        })
        .action("say", |_ctx, _args| async { Ok(json!("hello from B")) }.boxed())
        .action("remember", |ctx, args| remember(ctx, args).boxed())
        .action("recall", |ctx, args| recall(ctx, args).boxed())
        .action("mirror", |_ctx, args| {
            async move { Ok(args.value(0).unwrap_or(Value::Null)) }.boxed()
        })
        .action("wrong", |_ctx, _args| {
            async { Err(ServiceError::opaque(json!({"message": "error from B"}))) }.boxed()
        })
        .action("coded", |_ctx, _args| {
            async { Err(ServiceError::new(10056, "insufficient balance")) }.boxed()
        })
        .action("nothing", |_ctx, _args| async { Ok(Value::Null) }.boxed())
        .action("pair", |_ctx, _args| {
            async {
                let d = json!({"a": 1});
                Ok(json!([d, d]))
            }
            .boxed()
        })
        .action("whoami", |ctx, args| whoami(ctx, args).boxed())
        .action("rpc", |ctx, args| rpc(ctx, args).boxed())
        .action("forward", |ctx, args| forward(ctx, args).boxed())
        .build()
}

pub fn config_service() -> FnService {
    ServiceBuilder::new("Config")
        .action("get", |ctx, args| get_setting(ctx, args).boxed())
        .build()
}

pub fn rpc_server(observed: &Observed) -> RpcServer {
    let mut settings = serde_json::Map::new();
    settings.insert("theme".to_string(), json!("dark"));
    let settings = Arc::new(settings);

    let mut server = RpcServer::new();
    server
        .register(service_b(observed))
        .expect("register B")
        .register(config_service())
        .expect("register Config")
        .mount(MountMap::new().sync("settings", move || Settings((*settings).clone())));
    server
}

/// Serve `rpc` on an ephemeral local port; returns the endpoint URL
pub async fn spawn_server(rpc: RpcServer) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr: SocketAddr = listener.local_addr().expect("local addr");
    let server = HttpRpcServer::builder().rpc_server(rpc).build();
    tokio::spawn(async move { server.serve(listener).await });
    format!("http://{}/rpc", addr)
}
