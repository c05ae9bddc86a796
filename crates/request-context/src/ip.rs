use http::HeaderMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::UNKNOWN;

/// Proxy headers that may carry the original client address, in priority order.
pub const PROXY_HEADERS: [&str; 8] = [
    "x-forwarded-for",     // most proxies, may hold a comma-separated chain
    "x-real-ip",           // nginx
    "x-client-ip",         // apache
    "cf-connecting-ip",    // cloudflare
    "x-cluster-client-ip", // clustered load balancers
    "x-forwarded",
    "forwarded-for",
    "forwarded",
];

/// Edge-provider headers consulted only after every [`PROXY_HEADERS`] entry failed.
pub const EDGE_FALLBACK_HEADERS: [&str; 1] = ["x-vercel-forwarded-for"];

static IPV4_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)$",
    )
    .expect("IPv4 pattern must compile")
});

// Full eight-group form only; compressed `::` addresses do not match.
static IPV6_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[0-9a-fA-F]{1,4}:){7}[0-9a-fA-F]{1,4}$").expect("IPv6 pattern must compile")
});

/// Case-insensitive, by-name access to request headers.
///
/// Values that are not valid UTF-8 are reported as absent.
pub trait HeaderLookup {
    fn header(&self, name: &str) -> Option<&str>;
}

impl HeaderLookup for HeaderMap {
    fn header(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|v| v.to_str().ok())
    }
}

impl<T: HeaderLookup + ?Sized> HeaderLookup for &T {
    fn header(&self, name: &str) -> Option<&str> {
        (**self).header(name)
    }
}

/// Resolve the client address from proxy headers.
///
/// Headers are tried in [`PROXY_HEADERS`] order, then [`EDGE_FALLBACK_HEADERS`].
/// For each header only the first comma-separated entry is considered. The first
/// entry that validates wins; when none does the result is `"unknown"`.
/// An IPv4 `:port` suffix is dropped, so the returned key never carries a port.
pub fn extract_client_ip<H: HeaderLookup + ?Sized>(headers: &H) -> String {
    let resolved = PROXY_HEADERS
        .iter()
        .chain(EDGE_FALLBACK_HEADERS.iter())
        .filter_map(|name| headers.header(name).map(|value| (*name, value)))
        .find_map(|(name, value)| {
            let ip = normalize_ip(first_entry(value));
            if ip.is_none() {
                tracing::trace!(header = name, value, "ignoring unparseable client address");
            }
            ip
        });

    match resolved {
        Some(ip) => ip.to_string(),
        None => UNKNOWN.to_string(),
    }
}

/// Whether `ip` is a strict IPv4 literal (optionally with a port) or a full
/// eight-group IPv6 literal.
pub fn is_valid_ip(ip: &str) -> bool {
    normalize_ip(ip).is_some()
}

fn first_entry(value: &str) -> &str {
    value.split(',').next().unwrap_or_default().trim()
}

/// Validate a candidate address, returning it without any `:port` suffix.
fn normalize_ip(candidate: &str) -> Option<&str> {
    if candidate.is_empty() {
        return None;
    }

    if IPV6_RE.is_match(candidate) {
        return Some(candidate);
    }

    let host = match candidate.split_once(':') {
        Some((host, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => host,
        _ => candidate,
    };

    IPV4_RE.is_match(host).then_some(host)
}
