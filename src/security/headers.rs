//! Response header policy.
//!
//! # Responsibilities
//! - Drop upstream headers that defeat embedding or no longer describe the body
//! - Attach permissive CORS and cross-origin embedding headers
//! - Finalize the outgoing content type (WebAssembly correction)
//!
//! # Design Decisions
//! - The deny-list is configuration; everything else is forwarded verbatim
//! - Content type is set after the forwarding loop so it always wins
//! - Error responses get CORS headers only, never upstream headers

use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    CONTENT_TYPE,
};
use axum::http::{HeaderMap, HeaderName, HeaderValue};

use crate::config::HeaderPolicyConfig;

/// Upstream response headers dropped by default.
pub const DEFAULT_STRIPPED_HEADERS: [&str; 22] = [
    "x-frame-options",
    "content-security-policy",
    "content-security-policy-report-only",
    "content-encoding",
    "transfer-encoding",
    "connection",
    "keep-alive",
    "cross-origin-resource-policy",
    "cross-origin-embedder-policy",
    "cross-origin-opener-policy",
    "report-to",
    "nel",
    "server",
    "cf-ray",
    "cf-cache-status",
    "x-served-by",
    "x-cache",
    "x-cache-hits",
    "x-timer",
    "via",
    "alt-svc",
    "server-timing",
];

pub const WASM_CONTENT_TYPE: &str = "application/wasm";
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

const CROSS_ORIGIN_RESOURCE_POLICY: HeaderName =
    HeaderName::from_static("cross-origin-resource-policy");

/// Compiled header policy, shared by every request.
#[derive(Debug, Clone)]
pub struct HeaderPolicy {
    strip: Vec<HeaderName>,
    allow_methods: HeaderValue,
}

impl HeaderPolicy {
    /// Compile the policy. Invalid names are skipped with a warning; they are
    /// rejected earlier by config validation.
    pub fn new(config: &HeaderPolicyConfig) -> Self {
        let strip = config
            .strip
            .iter()
            .filter_map(|name| match HeaderName::from_bytes(name.as_bytes()) {
                Ok(name) => Some(name),
                Err(_) => {
                    tracing::warn!(header = %name, "Ignoring invalid header name in deny-list");
                    None
                }
            })
            .collect();
        let allow_methods = HeaderValue::from_str(&config.allow_methods).unwrap_or_else(|_| {
            tracing::warn!(value = %config.allow_methods, "Invalid allow_methods, using default");
            HeaderValue::from_static("GET, HEAD, POST, OPTIONS")
        });
        Self {
            strip,
            allow_methods,
        }
    }

    /// True when `name` is on the deny-list.
    pub fn is_stripped(&self, name: &HeaderName) -> bool {
        self.strip.contains(name)
    }

    /// Forwardable subset of the upstream headers, in upstream order.
    pub fn filter(&self, upstream: &HeaderMap) -> HeaderMap {
        let mut forwarded = HeaderMap::with_capacity(upstream.len());
        for (name, value) in upstream {
            if !self.is_stripped(name) {
                forwarded.append(name.clone(), value.clone());
            }
        }
        forwarded
    }

    /// Permissive CORS plus the cross-origin embedding override.
    pub fn apply_cors(&self, headers: &mut HeaderMap) {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        headers.insert(ACCESS_CONTROL_ALLOW_METHODS, self.allow_methods.clone());
        headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("*"));
        headers.insert(
            CROSS_ORIGIN_RESOURCE_POLICY,
            HeaderValue::from_static("cross-origin"),
        );
    }
}

impl Default for HeaderPolicy {
    fn default() -> Self {
        Self::new(&HeaderPolicyConfig::default())
    }
}

/// Outgoing content type for an upstream response.
///
/// A `.wasm` path or a declared WebAssembly type yields exactly
/// `application/wasm`; browsers refuse streaming compilation otherwise.
pub fn finalize_content_type(upstream_path: &str, declared: Option<&str>) -> String {
    let declared = declared.map(str::trim).filter(|ct| !ct.is_empty());
    let is_wasm = upstream_path.to_ascii_lowercase().ends_with(".wasm")
        || declared.is_some_and(|ct| ct.to_ascii_lowercase().contains(WASM_CONTENT_TYPE));
    if is_wasm {
        WASM_CONTENT_TYPE.to_string()
    } else {
        declared.unwrap_or(DEFAULT_CONTENT_TYPE).to_string()
    }
}

/// Set the finalized content type, replacing any forwarded value.
pub fn set_content_type(headers: &mut HeaderMap, content_type: &str) {
    match HeaderValue::from_str(content_type) {
        Ok(value) => {
            headers.insert(CONTENT_TYPE, value);
        }
        Err(_) => {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
        }
    }
}
