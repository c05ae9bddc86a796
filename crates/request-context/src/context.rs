use crate::ip::{extract_client_ip, HeaderLookup};
use crate::UNKNOWN;

/// Client information captured once per inbound request.
///
/// Every field is always populated; values that could not be read hold
/// `"unknown"`. The context is immutable after construction so every handler
/// in a request sees the same snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Resolved client address.
    pub client_ip: String,

    /// Raw `user-agent` header value.
    pub user_agent: String,

    /// Raw `origin` header value.
    pub origin: String,
}

impl RequestContext {
    /// Build the context from request headers. Never fails.
    pub fn from_headers<H: HeaderLookup + ?Sized>(headers: &H) -> Self {
        Self {
            client_ip: extract_client_ip(headers),
            user_agent: header_or_unknown(headers, "user-agent"),
            origin: header_or_unknown(headers, "origin"),
        }
    }

    pub fn has_client_ip(&self) -> bool {
        !self.client_ip.is_empty() && self.client_ip != UNKNOWN
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self {
            client_ip: UNKNOWN.to_string(),
            user_agent: UNKNOWN.to_string(),
            origin: UNKNOWN.to_string(),
        }
    }
}

fn header_or_unknown<H: HeaderLookup + ?Sized>(headers: &H, name: &str) -> String {
    match headers.header(name) {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => UNKNOWN.to_string(),
    }
}
