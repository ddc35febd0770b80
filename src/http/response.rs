//! Upstream response → client response.
//!
//! # Responsibilities
//! - Mirror the upstream status
//! - Filter headers, finalize content type, attach CORS
//! - Route the body through the rewrite pass chosen by content type
//!
//! # Data Flow
//! ```text
//! reqwest::Response
//!     → HeaderPolicy::filter → finalize_content_type → apply_cors
//!     → ContentKind::classify
//!         html/css/js  → read fully → lossy UTF-8 → rewrite_body → Body::from
//!         passthrough  → Body::from_stream (bytes untouched)
//! ```
//!
//! # Design Decisions
//! - Rewriting is relative to the final URL after redirects, not the
//!   requested one
//! - Rewritable content types drop `Content-Length`, `HEAD` included, since
//!   the rewritten `GET` body has a different length
//! - `HEAD` responses are never rewritten
//! - A body read failure on the rewrite path is an upstream error, so no
//!   partial rewritten body is ever sent

use axum::body::Body;
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::response::Response;

use crate::codec::OriginCodec;
use crate::http::error::ProxyError;
use crate::observability::metrics;
use crate::rewrite::{rewrite_body, ContentKind, RewriteContext, RewriteOptions};
use crate::routing::UpstreamTarget;
use crate::security::headers::{finalize_content_type, set_content_type};
use crate::security::HeaderPolicy;

/// Everything the response stage needs besides the upstream response.
#[derive(Debug, Clone, Copy)]
pub struct ResponseContext<'a> {
    pub target: &'a UpstreamTarget,
    pub codec: &'a OriginCodec,
    pub policy: &'a HeaderPolicy,
    pub options: &'a RewriteOptions,
    pub head_only: bool,
}

/// Build the client response and report which pass handled the body.
pub async fn into_client_response(
    upstream: reqwest::Response,
    cx: ResponseContext<'_>,
) -> Result<(Response, ContentKind), ProxyError> {
    let status = upstream.status();
    let target = cx.target.redirected(cx.codec, upstream.url());
    if target.url != cx.target.url {
        tracing::debug!(requested = %cx.target.url, upstream = %target.url, "Followed redirect");
    }

    let declared = upstream
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let content_type = finalize_content_type(target.url.path(), declared.as_deref());

    let mut headers = cx.policy.filter(upstream.headers());
    set_content_type(&mut headers, &content_type);
    cx.policy.apply_cors(&mut headers);

    let kind = ContentKind::classify(&content_type);
    if kind != ContentKind::Passthrough {
        headers.remove(CONTENT_LENGTH);
    }

    let (body, kind) = match kind {
        _ if cx.head_only => (Body::empty(), ContentKind::Passthrough),
        ContentKind::Passthrough => (Body::from_stream(upstream.bytes_stream()), kind),
        _ => {
            let raw = upstream.bytes().await?;
            let text = String::from_utf8_lossy(&raw);
            let ctx = RewriteContext::new(cx.codec, &target);
            let rewritten = rewrite_body(kind, &text, &ctx, cx.options);
            tracing::debug!(
                pass = kind.label(),
                bytes_in = raw.len(),
                bytes_out = rewritten.len(),
                "Rewrote body"
            );
            metrics::record_rewrite(kind.label(), rewritten.len());
            (Body::from(rewritten), kind)
        }
    };

    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok((response, kind))
}
