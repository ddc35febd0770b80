//! Proxy path → upstream URL resolution.
//!
//! # Responsibilities
//! - Pick the raw input channel (`_p` query parameter or request path)
//! - Strip the mount prefix; request paths outside it are refused
//! - Decode full-URL mode (`_/<token>`) and origin+path mode (`<token>/<rest>`)
//! - Re-attach the pass-through query string
//! - Refuse anything that is not http(s) before a fetch can happen
//!
//! # Design Decisions
//! - Query pass-through is textual so upstream signatures survive untouched
//! - Trailing slashes in the rest path are preserved
//! - Fragments never reach the upstream

use thiserror::Error;
use url::{form_urlencoded, Url};

use crate::codec::{DecodeError, Origin, OriginCodec, OriginError};

/// Mount prefix of the proxy path space.
pub const MOUNT_PREFIX: &str = "/r";

/// Accepted mount prefixes, longest first.
pub const MOUNT_ALIASES: [&str; 2] = ["/api/r", MOUNT_PREFIX];

/// First segment marking full-URL mode.
pub const FULL_URL_SEGMENT: &str = "_";

/// Query parameter carrying the raw path when the path itself is unavailable.
pub const PATH_PARAM: &str = "_p";

/// Errors produced while resolving a proxy path. All map to `400`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("proxy path is empty")]
    EmptyPath,

    #[error("path is outside the proxy mount")]
    NotMounted,

    #[error("full-URL mode without a token")]
    MissingToken,

    #[error("undecodable token: {0}")]
    Token(#[from] DecodeError),

    #[error("invalid upstream URL: {0}")]
    InvalidUrl(String),

    #[error("unsupported upstream scheme: {0}")]
    UnsupportedScheme(String),
}

/// How the proxy path addressed the upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveMode {
    /// `/r/<encodedOrigin>/<restPath>`
    OriginPath,
    /// `/r/_/<encodedFullURL>`
    FullUrl,
}

/// A resolved upstream request target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamTarget {
    pub url: Url,
    pub origin: Origin,
    /// Canonical token of `origin`, propagated into rewritten output.
    pub encoded_origin: String,
    /// Path component of `url`, used to compute the injected `<base>`.
    pub rest_path: String,
    pub mode: ResolveMode,
}

impl UpstreamTarget {
    /// Target for the URL a fetch actually ended at after following
    /// redirects. Keeps `self` when `url` is unchanged or not http(s).
    pub fn redirected(&self, codec: &OriginCodec, url: &Url) -> UpstreamTarget {
        if *url == self.url {
            return self.clone();
        }
        build_target(codec, url.clone(), self.mode).unwrap_or_else(|_| self.clone())
    }
}

/// Resolve an inbound proxy request into its upstream target.
pub fn resolve(
    codec: &OriginCodec,
    path: &str,
    query: Option<&str>,
) -> Result<UpstreamTarget, ResolveError> {
    let query = query.unwrap_or("");
    let passthrough = strip_param(query, PATH_PARAM);

    let (raw_path, query) = match find_param(query, PATH_PARAM) {
        Some(value) => match value.split_once('?') {
            Some((p, inner)) => (
                strip_mount(p).unwrap_or(p).to_string(),
                join_query(inner, &passthrough),
            ),
            None => (strip_mount(&value).unwrap_or(&value).to_string(), passthrough),
        },
        None => (
            strip_mount(path).ok_or(ResolveError::NotMounted)?.to_string(),
            passthrough,
        ),
    };

    let trimmed = raw_path.trim_start_matches('/');
    if trimmed.is_empty() {
        return Err(ResolveError::EmptyPath);
    }

    let (first, rest) = match trimmed.split_once('/') {
        Some((first, rest)) => (first, Some(rest)),
        None => (trimmed, None),
    };

    if first == FULL_URL_SEGMENT {
        let token = rest
            .and_then(|r| r.split('/').find(|s| !s.is_empty()))
            .ok_or(ResolveError::MissingToken)?;
        let decoded = codec.decode_str(token)?;
        let mut url = Url::parse(&decoded).map_err(|e| ResolveError::InvalidUrl(e.to_string()))?;
        if !query.is_empty() {
            let combined = match url.query() {
                Some(existing) if !existing.is_empty() => format!("{existing}&{query}"),
                _ => query,
            };
            url.set_query(Some(&combined));
        }
        url.set_fragment(None);
        build_target(codec, url, ResolveMode::FullUrl)
    } else {
        let origin = codec.decode(first)?;
        let rest_path = match rest {
            Some(rest) => format!("/{rest}"),
            None => "/".to_string(),
        };
        let mut raw = format!("{origin}{rest_path}");
        if !query.is_empty() {
            raw.push('?');
            raw.push_str(&query);
        }
        let mut url = Url::parse(&raw).map_err(|e| ResolveError::InvalidUrl(e.to_string()))?;
        url.set_fragment(None);
        build_target(codec, url, ResolveMode::OriginPath)
    }
}

fn build_target(
    codec: &OriginCodec,
    url: Url,
    mode: ResolveMode,
) -> Result<UpstreamTarget, ResolveError> {
    let origin = Origin::from_url(&url).map_err(|e| match e {
        OriginError::Scheme(scheme) => ResolveError::UnsupportedScheme(scheme),
        other => ResolveError::InvalidUrl(other.to_string()),
    })?;
    Ok(UpstreamTarget {
        encoded_origin: codec.encode(&origin),
        rest_path: url.path().to_string(),
        origin,
        url,
        mode,
    })
}

/// Path below the mount, or `None` when `path` is not mounted.
fn strip_mount(path: &str) -> Option<&str> {
    MOUNT_ALIASES.iter().find_map(|prefix| {
        path.strip_prefix(prefix)
            .filter(|rest| rest.is_empty() || rest.starts_with('/'))
    })
}

fn find_param(query: &str, name: &str) -> Option<String> {
    form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// Drop every `name=...` pair, keeping the others byte-for-byte.
fn strip_param(query: &str, name: &str) -> String {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| {
            let key = pair.split('=').next().unwrap_or_default();
            form_urlencoded::parse(key.as_bytes())
                .next()
                .map(|(k, _)| k != name)
                .unwrap_or(true)
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn join_query(first: &str, second: &str) -> String {
    match (first.is_empty(), second.is_empty()) {
        (true, _) => second.to_string(),
        (_, true) => first.to_string(),
        _ => format!("{first}&{second}"),
    }
}
