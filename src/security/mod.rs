//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Upstream response headers:
//!     → headers.rs (drop deny-listed headers)
//!     → headers.rs (set content type, attach CORS)
//!     → Client response
//! ```
//!
//! # Design Decisions
//! - Anti-embedding headers never reach the client
//! - Error paths attach CORS only, so no upstream value leaks through them

pub mod headers;

pub use headers::{HeaderPolicy, DEFAULT_STRIPPED_HEADERS};
