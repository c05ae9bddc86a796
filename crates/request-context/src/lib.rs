//! Per-request client information for the directory server.
//!
//! A [`RequestContext`] is built once from the inbound headers and then reduced
//! to a client identity with [`client_id`], which is the key the rate limiter
//! buckets requests by. Nothing in this crate fails: missing or malformed
//! values degrade to the [`UNKNOWN`] sentinel.

pub mod context;
pub mod identity;
pub mod ip;

pub use context::RequestContext;
pub use identity::client_id;
pub use ip::{extract_client_ip, is_valid_ip, HeaderLookup, EDGE_FALLBACK_HEADERS, PROXY_HEADERS};

/// Placeholder for a client attribute that could not be determined.
pub const UNKNOWN: &str = "unknown";
