//! Outbound HTTP client.
//!
//! # Responsibilities
//! - Issue exactly one request per proxied exchange (redirects aside)
//! - Mirror the inbound method and forward its body
//! - Present the upstream's own origin in `Referer` and `Origin`
//! - Ask for an uncompressed body so it can be rewritten, and decode
//!   gzip, brotli or deflate from upstreams that ignore the request
//!
//! # Design Decisions
//! - `reqwest` owns connection pooling, TLS and the redirect policy
//! - The request timeout covers connect, headers and body together
//! - Dropping the returned future cancels the outbound request

use std::time::Duration;

use axum::body::Bytes;
use axum::http::header::{
    ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, CONTENT_TYPE, ORIGIN, RANGE, REFERER, USER_AGENT,
};
use axum::http::{HeaderMap, HeaderValue, Method};
use reqwest::redirect::Policy;

use crate::config::{TimeoutConfig, UpstreamConfig};
use crate::routing::UpstreamTarget;

/// Client headers forwarded as-is when present.
const FORWARDED_REQUEST_HEADERS: [axum::http::HeaderName; 2] = [ACCEPT_LANGUAGE, RANGE];

/// Shared upstream client. Cheap to clone.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    default_user_agent: HeaderValue,
    default_accept: HeaderValue,
}

impl UpstreamClient {
    pub fn new(upstream: &UpstreamConfig, timeouts: &TimeoutConfig) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder()
            .redirect(Policy::limited(upstream.max_redirects))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .timeout(Duration::from_secs(timeouts.request_secs));
        if !upstream.system_proxy {
            builder = builder.no_proxy();
        }
        let client = builder.build()?;
        Ok(Self {
            client,
            default_user_agent: header_or(&upstream.default_user_agent, "Mozilla/5.0"),
            default_accept: header_or(&upstream.default_accept, "*/*"),
        })
    }

    /// Send the upstream request and wait for its response head.
    pub async fn fetch(
        &self,
        target: &UpstreamTarget,
        method: &Method,
        client_headers: &HeaderMap,
        body: Bytes,
    ) -> Result<reqwest::Response, reqwest::Error> {
        let headers = self.request_headers(target, client_headers, !body.is_empty());
        let mut request = self
            .client
            .request(method.clone(), target.url.clone())
            .headers(headers);
        if !body.is_empty() {
            request = request.body(body);
        }
        request.send().await
    }

    /// Outbound header set for `target`.
    pub fn request_headers(
        &self,
        target: &UpstreamTarget,
        client_headers: &HeaderMap,
        has_body: bool,
    ) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            client_headers
                .get(USER_AGENT)
                .cloned()
                .unwrap_or_else(|| self.default_user_agent.clone()),
        );
        headers.insert(
            ACCEPT,
            client_headers
                .get(ACCEPT)
                .cloned()
                .unwrap_or_else(|| self.default_accept.clone()),
        );
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

        let origin = target.origin.to_string();
        if let Ok(value) = HeaderValue::from_str(&format!("{origin}/")) {
            headers.insert(REFERER, value);
        }
        if let Ok(value) = HeaderValue::from_str(&origin) {
            headers.insert(ORIGIN, value);
        }

        for name in FORWARDED_REQUEST_HEADERS {
            if let Some(value) = client_headers.get(&name) {
                headers.insert(name, value.clone());
            }
        }
        if has_body {
            if let Some(value) = client_headers.get(CONTENT_TYPE) {
                headers.insert(CONTENT_TYPE, value.clone());
            }
        }
        headers
    }
}

fn header_or(value: &str, fallback: &'static str) -> HeaderValue {
    HeaderValue::from_str(value).unwrap_or_else(|_| HeaderValue::from_static(fallback))
}
