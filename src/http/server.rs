//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the proxy handler
//! - Wire up middleware (request ID, tracing, timeout)
//! - Bind server to listener with graceful shutdown
//! - Answer CORS preflights without touching the upstream
//! - Resolve, fetch and rewrite every other request
//! - Observability (metrics, correlation IDs)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::{Body, Bytes},
    extract::{ConnectInfo, State},
    http::{Method, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::codec::OriginCodec;
use crate::config::ProxyConfig;
use crate::http::error::ProxyError;
use crate::http::request::{request_id, UuidRequestId, X_REQUEST_ID};
use crate::http::response::{into_client_response, ResponseContext};
use crate::http::upstream::UpstreamClient;
use crate::observability::metrics;
use crate::rewrite::{ContentKind, RewriteOptions};
use crate::routing::resolve;
use crate::security::HeaderPolicy;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub codec: OriginCodec,
    pub upstream: UpstreamClient,
    pub headers: Arc<HeaderPolicy>,
    pub rewrite: Arc<RewriteOptions>,
    pub max_request_body: usize,
}

impl AppState {
    /// Build the shared state from a validated configuration.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            codec: config.codec.build(),
            upstream: UpstreamClient::new(&config.upstream, &config.timeouts)?,
            headers: Arc::new(HeaderPolicy::new(&config.headers)),
            rewrite: Arc::new(RewriteOptions::from(&config.rewrite)),
            max_request_body: config.upstream.max_request_body,
        })
    }
}

/// HTTP server for the rewriting proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, reqwest::Error> {
        let state = AppState::from_config(&config)?;
        let router = Self::build_router(&config, state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        // One second over the upstream budget so the client timeout fires first.
        let handler_budget = Duration::from_secs(config.timeouts.request_secs + 1);

        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
                    .layer(
                        TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                            tracing::info_span!(
                                "request",
                                request_id = %request_id(request),
                                method = %request.method(),
                                path = %request.uri().path(),
                            )
                        }),
                    )
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
                    .layer(TimeoutLayer::new(handler_budget)),
            )
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            scheme = ?self.config.codec.scheme,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Main proxy handler.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(&request).to_string();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    tracing::debug!(
        request_id = %request_id,
        client = %peer,
        method = %method,
        path = %path,
        "Proxying request"
    );

    if method == Method::OPTIONS {
        let mut response = StatusCode::OK.into_response();
        state.headers.apply_cors(response.headers_mut());
        metrics::record_request(method.as_str(), 200, "preflight", start_time);
        return response;
    }

    match forward(&state, request).await {
        Ok((response, kind)) => {
            let status = response.status();
            tracing::info!(
                request_id = %request_id,
                method = %method,
                status = status.as_u16(),
                pass = kind.label(),
                elapsed_ms = start_time.elapsed().as_millis() as u64,
                "Request proxied"
            );
            metrics::record_request(method.as_str(), status.as_u16(), kind.label(), start_time);
            response
        }
        Err(err) => {
            match &err {
                ProxyError::BadRequest(_) | ProxyError::BodyTooLarge { .. } => {
                    tracing::warn!(request_id = %request_id, path = %path, error = %err, "Rejected request")
                }
                ProxyError::Upstream(_) => {
                    tracing::error!(request_id = %request_id, path = %path, error = %err, "Upstream error")
                }
            }
            metrics::record_request(method.as_str(), err.status().as_u16(), "error", start_time);
            err.into_response_with(&state.headers)
        }
    }
}

/// Resolve, fetch and rewrite one request.
async fn forward(
    state: &AppState,
    request: Request<Body>,
) -> Result<(Response, ContentKind), ProxyError> {
    let target = resolve(&state.codec, request.uri().path(), request.uri().query())?;
    tracing::debug!(upstream = %target.url, mode = ?target.mode, "Resolved upstream");

    let (parts, body) = request.into_parts();
    let body = if parts.method == Method::GET || parts.method == Method::HEAD {
        Bytes::new()
    } else {
        // The length limit is the only expected failure here.
        axum::body::to_bytes(body, state.max_request_body)
            .await
            .map_err(|_| ProxyError::BodyTooLarge {
                limit: state.max_request_body,
            })?
    };

    let upstream = state
        .upstream
        .fetch(&target, &parts.method, &parts.headers, body)
        .await?;

    into_client_response(
        upstream,
        ResponseContext {
            target: &target,
            codec: &state.codec,
            policy: &state.headers,
            options: &state.rewrite,
            head_only: parts.method == Method::HEAD,
        },
    )
    .await
}
