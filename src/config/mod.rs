//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → codec, header policy and rewrite options built once at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    CodecConfig, HeaderPolicyConfig, ListenerConfig, LogFormat, ObservabilityConfig, ProxyConfig,
    RewriteConfig, TimeoutConfig, UpstreamConfig,
};
pub use validation::{validate_config, ValidationError};
