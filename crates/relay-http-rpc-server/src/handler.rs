//! HTTP request handler for the JSON-RPC endpoint

use std::error::Error as StdError;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body::Body;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::header::{ALLOW, CONTENT_TYPE, HeaderValue};
use hyper::{HeaderMap, Method, Request, Response, StatusCode};
use serde_json::json;
use tracing::{debug, error, warn};

use relay_json_rpc_server::{Runner, TransportMeta};

use crate::{CorsLayer, ServerConfig};

/// Routes HTTP requests to a [`Runner`] and turns its output into responses
#[derive(Clone, Debug)]
pub struct RpcHttpHandler {
    config: Arc<ServerConfig>,
    runner: Runner,
}

impl RpcHttpHandler {
    pub fn new(config: Arc<ServerConfig>, runner: Runner) -> Self {
        Self { config, runner }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn runner(&self) -> &Runner {
        &self.runner
    }

    /// Handle any request reaching the server. Never fails: every outcome
    /// is an HTTP response.
    pub async fn handle<B>(
        &self,
        req: Request<B>,
        peer: Option<SocketAddr>,
    ) -> Response<Full<Bytes>>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<Box<dyn StdError + Send + Sync>>,
    {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        debug!(method = %method, path = %path, "handling request");

        let request_headers = req.headers().clone();
        let mut response = if path != self.config.rpc_path {
            plain(StatusCode::NOT_FOUND, "Not Found")
        } else {
            match method {
                Method::POST => self.handle_rpc(req, peer).await,
                Method::OPTIONS => plain(StatusCode::OK, ""),
                _ => {
                    let mut response = plain(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed");
                    response
                        .headers_mut()
                        .insert(ALLOW, HeaderValue::from_static("POST, OPTIONS"));
                    response
                }
            }
        };

        if self.config.enable_cors {
            if method == Method::OPTIONS {
                CorsLayer::apply_preflight_headers(response.headers_mut(), &request_headers);
            } else {
                CorsLayer::apply_cors_headers(response.headers_mut());
            }
        }
        response
    }

    async fn handle_rpc<B>(
        &self,
        req: Request<B>,
        peer: Option<SocketAddr>,
    ) -> Response<Full<Bytes>>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<Box<dyn StdError + Send + Sync>>,
    {
        let transport = transport_meta(req.headers(), peer);

        let body = Limited::new(req.into_body(), self.config.max_body_size);
        let body_bytes = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(err) if err.is::<LengthLimitError>() => {
                warn!(limit = self.config.max_body_size, "request body too large");
                return plain(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large");
            }
            Err(err) => {
                error!(error = %err, "failed to read request body");
                return plain(StatusCode::BAD_REQUEST, "Failed to read request body");
            }
        };

        let Some(output) = self.runner.handle_bytes(&body_bytes, transport).await else {
            debug!("no response body");
            return empty(StatusCode::NO_CONTENT);
        };

        match serde_json::to_vec(&output) {
            Ok(body) => {
                let mut response = Response::new(Full::new(Bytes::from(body)));
                response
                    .headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                response
            }
            Err(err) => {
                error!(error = %err, "failed to serialize response");
                plain(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
        }
    }
}

/// Request headers (lowercased) plus the peer address
fn transport_meta(headers: &HeaderMap, peer: Option<SocketAddr>) -> TransportMeta {
    let mut meta = TransportMeta::new();
    for (name, value) in headers {
        match value.to_str() {
            Ok(value) => meta.insert_header(name.as_str(), value),
            Err(_) => debug!(header = %name, "skipping non-ascii header"),
        }
    }
    if let Some(peer) = peer {
        meta.add_metadata("peer_addr", json!(peer.to_string()));
    }
    meta
}

fn plain(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(body.as_bytes())));
    *response.status_mut() = status;
    response
}

fn empty(status: StatusCode) -> Response<Full<Bytes>> {
    plain(status, "")
}
