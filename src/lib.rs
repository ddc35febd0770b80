//! Content-rewriting reverse proxy.
//!
//! Fetches a resource from an arbitrary upstream origin and rewrites markup,
//! stylesheets and scripts so every reference routes back through the proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request  /r/<token>/<path>  or  /r/_/<token>
//!     ──────────────────────┐
//!                           ▼
//!                  ┌────────────────┐     ┌──────────────┐
//!                  │  http::server  │────▶│   routing    │  token → upstream URL
//!                  └───────┬────────┘     └──────┬───────┘
//!                          │                     │ codec
//!                          ▼                     ▼
//!                  ┌────────────────┐     ┌──────────────┐
//!                  │ http::upstream │────▶│   Upstream   │
//!                  └───────┬────────┘     └──────────────┘
//!                          ▼
//!                  ┌────────────────┐     ┌──────────────┐
//!                  │ http::response │────▶│   rewrite    │  html / css / js
//!                  │   + security   │     │ + interceptor│
//!                  └───────┬────────┘     └──────────────┘
//!     Client Response      │
//!     ◀────────────────────┘
//!
//!     Cross-cutting: config · observability · lifecycle
//! ```

// Core
pub mod codec;
pub mod rewrite;
pub mod routing;

// Serving
pub mod http;
pub mod security;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use codec::{EncodingScheme, Origin, OriginCodec};
pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::{resolve, UpstreamTarget};
