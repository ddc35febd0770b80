//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files, and
//! every section has defaults so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};

use crate::codec::{EncodingScheme, OriginCodec, DEFAULT_KEY};

/// Root configuration for the rewriting proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Origin token codec.
    pub codec: CodecConfig,

    /// Outbound request settings.
    pub upstream: UpstreamConfig,

    /// Response header policy.
    pub headers: HeaderPolicyConfig,

    /// Content rewrite options.
    pub rewrite: RewriteConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration for outbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Total budget for the upstream exchange, body included, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 10,
            request_secs: 30,
        }
    }
}

/// Origin token codec settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Encoding scheme (`xor_hex` or `base64`).
    pub scheme: EncodingScheme,

    /// XOR key bytes. Ignored by `base64`.
    pub key: Vec<u8>,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            scheme: EncodingScheme::XorHex,
            key: DEFAULT_KEY.to_vec(),
        }
    }
}

impl CodecConfig {
    /// Build the process-wide codec.
    pub fn build(&self) -> OriginCodec {
        OriginCodec::new(self.scheme, self.key.clone())
    }
}

/// Outbound request settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// `User-Agent` sent when the client supplied none.
    pub default_user_agent: String,

    /// `Accept` sent when the client supplied none.
    pub default_accept: String,

    /// Maximum redirects followed per request.
    pub max_redirects: usize,

    /// Maximum forwarded request body in bytes.
    pub max_request_body: usize,

    /// Honor `HTTP_PROXY`/`HTTPS_PROXY` from the environment.
    pub system_proxy: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            default_user_agent: "Mozilla/5.0".to_string(),
            default_accept: "*/*".to_string(),
            max_redirects: 10,
            max_request_body: 2 * 1024 * 1024, // 2MB
            system_proxy: true,
        }
    }
}

/// Response header policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HeaderPolicyConfig {
    /// Upstream response headers never forwarded (case-insensitive).
    pub strip: Vec<String>,

    /// Value of `Access-Control-Allow-Methods`.
    pub allow_methods: String,
}

impl Default for HeaderPolicyConfig {
    fn default() -> Self {
        Self {
            strip: crate::security::headers::DEFAULT_STRIPPED_HEADERS
                .iter()
                .map(|name| name.to_string())
                .collect(),
            allow_methods: "GET, HEAD, POST, OPTIONS".to_string(),
        }
    }
}

/// Content rewrite options.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RewriteConfig {
    /// Inject the GameDistribution start-up fallback.
    pub sdk_fallback: bool,

    /// Delay before the fallback loads the game, in milliseconds.
    pub sdk_fallback_delay_ms: u64,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            sdk_fallback: true,
            sdk_fallback_delay_ms: 3000,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config: ProxyConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.timeouts.request_secs, 30);
        assert_eq!(config.codec.scheme, EncodingScheme::XorHex);
        assert_eq!(config.codec.key, DEFAULT_KEY.to_vec());
        assert!(config.headers.strip.iter().any(|h| h == "x-frame-options"));
        assert!(config.rewrite.sdk_fallback);
        assert!(!config.observability.metrics_enabled);
    }

    #[test]
    fn partial_sections() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [codec]
            scheme = "base64"

            [rewrite]
            sdk_fallback_delay_ms = 1500

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.codec.scheme, EncodingScheme::Base64);
        assert_eq!(config.codec.key, DEFAULT_KEY.to_vec());
        assert!(config.rewrite.sdk_fallback);
        assert_eq!(config.rewrite.sdk_fallback_delay_ms, 1500);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.observability.log_level, "info");
    }
}
