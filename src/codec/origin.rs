//! Web origin value type.
//!
//! # Design Decisions
//! - Only `http` and `https` origins are representable
//! - Canonical string form follows the browser's `URL.origin` (lower-case
//!   scheme and host, default port omitted) so server-side and client-side
//!   encodings agree byte-for-byte

use std::fmt;

use thiserror::Error;
use url::Url;

/// Errors produced when a string is not a usable origin.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OriginError {
    #[error("not a URL: {0}")]
    Parse(String),

    #[error("unsupported scheme: {0}")]
    Scheme(String),

    #[error("origin has no host")]
    MissingHost,

    #[error("origin carries a path, query, fragment or credentials")]
    NotBare,
}

/// A remote web origin: scheme, host and optional non-default port.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin {
    scheme: String,
    host: String,
    port: Option<u16>,
}

impl Origin {
    /// Parse a canonical origin string such as `https://example.com:8443`.
    ///
    /// A single trailing `/` is tolerated; any other path component is
    /// rejected.
    pub fn parse(input: &str) -> Result<Self, OriginError> {
        let url = Url::parse(input).map_err(|e| OriginError::Parse(e.to_string()))?;
        let origin = Self::from_url(&url)?;
        if url.path() != "/"
            || url.query().is_some()
            || url.fragment().is_some()
            || !url.username().is_empty()
            || url.password().is_some()
        {
            return Err(OriginError::NotBare);
        }
        Ok(origin)
    }

    /// Take the origin of an absolute http(s) URL, ignoring its path.
    pub fn from_url(url: &Url) -> Result<Self, OriginError> {
        let scheme = url.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(OriginError::Scheme(scheme.to_string()));
        }
        let host = url.host_str().ok_or(OriginError::MissingHost)?;
        if host.is_empty() {
            return Err(OriginError::MissingHost);
        }
        Ok(Self {
            scheme: scheme.to_string(),
            host: host.to_string(),
            port: url.port(),
        })
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}://{}:{}", self.scheme, self.host, port),
            None => write!(f, "{}://{}", self.scheme, self.host),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_form_drops_default_port() {
        let origin = Origin::parse("HTTPS://Example.COM:443").unwrap();
        assert_eq!(origin.to_string(), "https://example.com");

        let origin = Origin::parse("http://localhost:8080/").unwrap();
        assert_eq!(origin.to_string(), "http://localhost:8080");
        assert_eq!(origin.port(), Some(8080));
    }

    #[test]
    fn rejects_non_http_schemes() {
        assert_eq!(
            Origin::parse("file:///etc/passwd"),
            Err(OriginError::Scheme("file".into()))
        );
        assert!(matches!(
            Origin::parse("ftp://example.com"),
            Err(OriginError::Scheme(_))
        ));
    }

    #[test]
    fn rejects_paths() {
        assert_eq!(
            Origin::parse("https://example.com/base"),
            Err(OriginError::NotBare)
        );
        assert_eq!(
            Origin::parse("https://user@example.com"),
            Err(OriginError::NotBare)
        );
    }

    #[test]
    fn from_url_ignores_path() {
        let url = Url::parse("https://cdn.example.com:8443/a/b?c=d").unwrap();
        let origin = Origin::from_url(&url).unwrap();
        assert_eq!(origin.to_string(), "https://cdn.example.com:8443");
    }
}
