//! Proxy path routing.
//!
//! # Data Flow
//! ```text
//! Inbound path + query
//!     → resolver.rs (mount prefix, `_p` channel, mode A/B decode)
//!     → UpstreamTarget (url, origin, token, rest path)
//!     → fetch pipeline
//! ```
//!
//! # Design Decisions
//! - Every failure is a `BadRequest`; nothing is fetched for a rejected path
//! - Only http(s) targets leave this module

pub mod resolver;

pub use resolver::{
    resolve, ResolveError, ResolveMode, UpstreamTarget, FULL_URL_SEGMENT, MOUNT_PREFIX, PATH_PARAM,
};
