//! Content rewrite engine.
//!
//! # Data Flow
//! ```text
//! upstream body + content type
//!     → ContentKind::classify (html → css → js → passthrough)
//!     → html.rs / css.rs / js.rs (regex-level passes)
//!     → rewritten body, every reference routed through /r/...
//! ```
//!
//! # Design Decisions
//! - Passes work on the whole body; nothing is streamed while rewriting
//! - A fragment that fails to parse is left as-is, never an error
//! - Running a pass over its own output changes nothing
//! - The codec inside `RewriteContext` also feeds the browser interceptor

pub mod css;
pub mod fallback;
pub mod html;
pub mod interceptor;
pub mod js;
pub mod links;

use std::time::Duration;

use regex::Captures;

use crate::codec::{Origin, OriginCodec};
use crate::config::RewriteConfig;
use crate::routing::UpstreamTarget;

/// Which pass a response body goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Html,
    Css,
    JavaScript,
    Passthrough,
}

impl ContentKind {
    /// Classify by content-type substring, HTML first.
    pub fn classify(content_type: &str) -> Self {
        let content_type = content_type.to_ascii_lowercase();
        if content_type.contains("text/html") {
            Self::Html
        } else if content_type.contains("text/css") {
            Self::Css
        } else if content_type.contains("javascript") || content_type.contains("ecmascript") {
            Self::JavaScript
        } else {
            Self::Passthrough
        }
    }

    /// Short label used in logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Css => "css",
            Self::JavaScript => "js",
            Self::Passthrough => "passthrough",
        }
    }
}

/// Per-request state threaded through every pass.
#[derive(Debug, Clone)]
pub struct RewriteContext {
    pub codec: OriginCodec,
    pub origin: Origin,
    pub encoded_origin: String,
    pub rest_path: String,
}

impl RewriteContext {
    pub fn new(codec: &OriginCodec, target: &UpstreamTarget) -> Self {
        Self {
            codec: codec.clone(),
            origin: target.origin.clone(),
            encoded_origin: target.encoded_origin.clone(),
            rest_path: target.rest_path.clone(),
        }
    }

    /// Build a context for an origin and path directly.
    pub fn for_origin(codec: &OriginCodec, origin: Origin, rest_path: impl Into<String>) -> Self {
        Self {
            encoded_origin: codec.encode(&origin),
            codec: codec.clone(),
            origin,
            rest_path: rest_path.into(),
        }
    }

    /// Re-address an attribute or `url()` value; `None` leaves it untouched.
    pub fn reference(&self, value: &str) -> Option<String> {
        links::rewrite_reference(&self.codec, &self.encoded_origin, value)
    }

    /// Re-address an absolute http(s) URL.
    pub fn link(&self, raw: &str) -> Option<String> {
        links::proxy_link(&self.codec, raw)
    }
}

/// Options for the optional parts of the HTML pass.
#[derive(Debug, Clone)]
pub struct RewriteOptions {
    pub sdk_fallback: bool,
    pub sdk_fallback_delay: Duration,
}

impl Default for RewriteOptions {
    fn default() -> Self {
        Self::from(&RewriteConfig::default())
    }
}

impl From<&RewriteConfig> for RewriteOptions {
    fn from(config: &RewriteConfig) -> Self {
        Self {
            sdk_fallback: config.sdk_fallback,
            sdk_fallback_delay: Duration::from_millis(config.sdk_fallback_delay_ms),
        }
    }
}

/// Run the pass selected by `kind` over `body`.
pub fn rewrite_body(
    kind: ContentKind,
    body: &str,
    ctx: &RewriteContext,
    options: &RewriteOptions,
) -> String {
    match kind {
        ContentKind::Html => html::rewrite_html(body, ctx, options),
        ContentKind::Css => css::rewrite_css(body, ctx),
        ContentKind::JavaScript => js::rewrite_js(body, ctx),
        ContentKind::Passthrough => body.to_string(),
    }
}

/// Value and quote character of a `"…"|'…'` alternation.
pub(crate) fn quoted<'h>(
    caps: &Captures<'h>,
    double: usize,
    single: usize,
) -> Option<(&'h str, char)> {
    caps.get(double)
        .map(|m| (m.as_str(), '"'))
        .or_else(|| caps.get(single).map(|m| (m.as_str(), '\'')))
}

/// The whole match, unchanged.
pub(crate) fn unchanged(caps: &Captures<'_>) -> String {
    caps.get(0).map(|m| m.as_str()).unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_priority() {
        assert_eq!(ContentKind::classify("text/html; charset=utf-8"), ContentKind::Html);
        assert_eq!(ContentKind::classify("TEXT/CSS"), ContentKind::Css);
        assert_eq!(ContentKind::classify("application/javascript"), ContentKind::JavaScript);
        assert_eq!(ContentKind::classify("text/ecmascript"), ContentKind::JavaScript);
        assert_eq!(ContentKind::classify("application/wasm"), ContentKind::Passthrough);
        assert_eq!(ContentKind::classify("image/png"), ContentKind::Passthrough);
        assert_eq!(ContentKind::classify(""), ContentKind::Passthrough);
    }
}
