//! Client-facing error responses.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::routing::ResolveError;
use crate::security::HeaderPolicy;

/// Failure of a single proxied exchange.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Malformed proxy path, bad token or non-http(s) target. No fetch happened.
    #[error("bad request: {0}")]
    BadRequest(#[from] ResolveError),

    /// Connect, TLS, timeout or body read failure on the upstream side.
    #[error("upstream error: {0}")]
    Upstream(#[from] reqwest::Error),

    /// Forwarded request body exceeded the configured limit.
    #[error("request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ProxyError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }

    /// Short fixed body; details stay in the logs.
    pub fn body(&self) -> &'static str {
        match self {
            ProxyError::BadRequest(_) => "Bad request",
            ProxyError::Upstream(_) => "Upstream error",
            ProxyError::BodyTooLarge { .. } => "Payload too large",
        }
    }

    /// Response carrying CORS headers from `policy`.
    pub fn into_response_with(self, policy: &HeaderPolicy) -> Response {
        let mut response = self.into_response();
        policy.apply_cors(response.headers_mut());
        response
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let mut response = (self.status(), self.body()).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }
}
