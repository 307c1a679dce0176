//! HTTP JSON-RPC server: configuration builder and hyper accept loop

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use relay_json_rpc_server::{ContextMode, RpcServer, Runner};

use crate::{Result, RpcHttpHandler, ServerConfig};

/// Builder for [`HttpRpcServer`]
pub struct HttpRpcServerBuilder {
    config: ServerConfig,
    rpc: RpcServer,
    context_mode: Option<ContextMode>,
}

impl HttpRpcServerBuilder {
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            rpc: RpcServer::new(),
            context_mode: None,
        }
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the bind address
    pub fn bind_address(mut self, addr: SocketAddr) -> Self {
        self.config.bind_address = addr;
        self
    }

    /// Set the JSON-RPC endpoint path
    pub fn rpc_path(mut self, path: impl Into<String>) -> Self {
        self.config.rpc_path = path.into();
        self
    }

    /// Enable or disable CORS
    pub fn cors(mut self, enable: bool) -> Self {
        self.config.enable_cors = enable;
        self
    }

    /// Set maximum request body size
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.config.max_body_size = size;
        self
    }

    /// Serve the services and mounts registered on `rpc`
    pub fn rpc_server(mut self, rpc: RpcServer) -> Self {
        self.rpc = rpc;
        self
    }

    /// Override the context mode configured on the [`RpcServer`]
    pub fn context_mode(mut self, mode: ContextMode) -> Self {
        self.context_mode = Some(mode);
        self
    }

    pub fn build(self) -> HttpRpcServer {
        let mut runner = self.rpc.runner();
        if let Some(mode) = self.context_mode {
            runner = runner.with_context_mode(mode);
        }
        HttpRpcServer::new(self.config, runner)
    }
}

impl Default for HttpRpcServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// HTTP/1.1 front end for a [`Runner`]
#[derive(Clone, Debug)]
pub struct HttpRpcServer {
    config: Arc<ServerConfig>,
    handler: RpcHttpHandler,
}

impl HttpRpcServer {
    pub fn builder() -> HttpRpcServerBuilder {
        HttpRpcServerBuilder::new()
    }

    pub fn new(config: ServerConfig, runner: Runner) -> Self {
        let config = Arc::new(config);
        let handler = RpcHttpHandler::new(Arc::clone(&config), runner);
        Self { config, handler }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Bind the configured address and serve until an accept error
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_address).await?;
        self.serve(listener).await
    }

    /// Serve connections from an already bound listener
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let local_addr = listener.local_addr()?;
        info!(
            addr = %local_addr,
            path = %self.config.rpc_path,
            services = ?self.handler_services(),
            "HTTP JSON-RPC server listening"
        );

        loop {
            let (stream, peer_addr) = listener.accept().await?;
            debug!(peer = %peer_addr, "new connection");

            let handler = self.handler.clone();
            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let service = service_fn(move |req| {
                    let handler = handler.clone();
                    async move { Ok::<_, Infallible>(handler.handle(req, Some(peer_addr)).await) }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    if err.is_incomplete_message() {
                        debug!(peer = %peer_addr, "client disconnected: {}", err);
                    } else {
                        error!(peer = %peer_addr, "error serving connection: {}", err);
                    }
                }
            });
        }
    }

    fn handler_services(&self) -> Vec<String> {
        self.handler.runner().registry().names()
    }
}
