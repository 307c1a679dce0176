//! Blog service over HTTP
//!
//! ```text
//! cargo run -p relay-http-rpc-server --example blog_server
//! curl -s localhost:3000/rpc -H 'auth: 123' \
//!   -d '{"jsonrpc":"2.0","method":"Blog.save","params":["hello"],"id":1}'
//! ```

use std::sync::Arc;

use futures::FutureExt;
use parking_lot::RwLock;
use serde_json::{Value, json};
use tracing::info;
use tracing_subscriber::EnvFilter;

use relay_http_rpc_server::{HttpRpcServer, ServerConfig};
use relay_json_rpc_server::prelude::*;

#[derive(Clone, Default)]
struct PostStore {
    posts: Arc<RwLock<Vec<Value>>>,
}

async fn authenticate(ctx: &mut CallContext) -> Result<(), ServiceError> {
    let user = ctx
        .header("auth")
        .ok_or_else(|| ServiceError::new(401, "missing auth header"))?
        .to_string();
    ctx.set_state("user", json!(user));
    Ok(())
}

async fn list_posts(ctx: &mut CallContext, _args: Args) -> ActionResult {
    let store = ctx.require_mounted::<PostStore>("db")?;
    let posts = store.posts.read().clone();
    Ok(Value::Array(posts))
}

async fn save_post(ctx: &mut CallContext, args: Args) -> ActionResult {
    let title: String = args.get(0)?;
    let author = ctx.state("user").cloned().unwrap_or(Value::Null);
    let store = ctx.require_mounted::<PostStore>("db")?;

    let mut posts = store.posts.write();
    let id = posts.len() + 1;
    posts.push(json!({"id": id, "title": title, "author": author}));
    Ok(json!(id))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let store = PostStore::default();

    let mut rpc = RpcServer::new();
    rpc.register(
        ServiceBuilder::new("Blog")
            .before(|ctx| authenticate(ctx).boxed())
            .action("get", |ctx, args| list_posts(ctx, args).boxed())
            .action("save", |ctx, args| save_post(ctx, args).boxed())
            .build(),
    )?
    .mount(MountMap::new().value("db", store));

    let config = ServerConfig::from_env()?;
    info!(methods = ?rpc.registry().methods(), "starting blog server");

    HttpRpcServer::builder()
        .config(config)
        .rpc_server(rpc)
        .build()
        .run()
        .await?;
    Ok(())
}
