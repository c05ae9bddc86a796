//! Cross-origin policy for the RPC endpoints.
//!
//! [`resolve_origin`] decides which value, if any, goes into
//! `Access-Control-Allow-Origin`. A denied origin is not an error: the header is
//! omitted, the response keeps its normal status, and the browser blocks it.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, ORIGIN, VARY,
};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use lincoln_common::AppConfig;

const ALLOW_METHODS: &str = "GET, HEAD, PUT, POST, DELETE, PATCH, OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type, Authorization, X-Requested-With";
const MAX_AGE_SECS: &str = "86400";

const DEVELOPMENT_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://localhost:3001"];
const PRODUCTION_ORIGINS: [&str; 4] = [
    "https://lincoln-better-t.vercel.app",
    "https://lincoln-better-t-web.vercel.app",
    "https://lincoln-better-t-git-main-lincoln-better-t.vercel.app",
    "https://lincoln-better-t-web-git-main-lincoln-better-t.vercel.app",
];

/// Decide the `Access-Control-Allow-Origin` value for a request.
///
/// Requests without an origin (native apps, curl) get `*`. Listed origins are
/// echoed, as is any `http://localhost` origin in development. Everything else
/// is denied with `None`.
pub fn resolve_origin(
    request_origin: Option<&str>,
    allow_list: &[String],
    is_development: bool,
) -> Option<String> {
    let origin = match request_origin {
        None | Some("") => return Some("*".to_string()),
        Some(origin) => origin,
    };

    if allow_list.iter().any(|allowed| allowed == origin) {
        return Some(origin.to_string());
    }

    if is_development && origin.starts_with("http://localhost") {
        return Some(origin.to_string());
    }

    None
}

/// Origin allow-list and the headers it produces.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allowed_origins: Vec<String>,
    is_development: bool,
}

impl CorsPolicy {
    pub fn new(allowed_origins: Vec<String>, is_development: bool) -> Self {
        Self {
            allowed_origins,
            is_development,
        }
    }

    /// Configured origins followed by the built-in origins for the environment.
    pub fn from_config(config: &AppConfig) -> Self {
        let is_development = config.server.environment.is_development();
        let defaults: &[&str] = if is_development {
            &DEVELOPMENT_ORIGINS
        } else {
            &PRODUCTION_ORIGINS
        };

        let mut allowed_origins = config.cors.allowed_origins.clone();
        allowed_origins.extend(defaults.iter().map(|o| o.to_string()));

        Self::new(allowed_origins, is_development)
    }

    pub fn allowed_origins(&self) -> &[String] {
        &self.allowed_origins
    }

    pub fn resolve(&self, request_origin: Option<&str>) -> Option<String> {
        resolve_origin(request_origin, &self.allowed_origins, self.is_development)
    }

    /// Write the CORS headers for `allowed_origin` into `headers`. Nothing is
    /// written for a denied origin.
    pub fn apply(&self, headers: &mut HeaderMap, allowed_origin: Option<&str>, preflight: bool) {
        let Some(origin) = allowed_origin else {
            return;
        };
        let Ok(value) = HeaderValue::from_str(origin) else {
            return;
        };

        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, value);
        if origin != "*" {
            // Credentials are never combined with the wildcard.
            headers.insert(ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
            headers.append(VARY, HeaderValue::from_static("origin"));
        }

        if preflight {
            headers.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOW_METHODS));
            headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOW_HEADERS));
            headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static(MAX_AGE_SECS));
        }
    }
}

/// Middleware answering preflight requests and decorating every other response.
pub async fn apply_cors(
    State(policy): State<Arc<CorsPolicy>>,
    request: Request,
    next: Next,
) -> Response {
    let request_origin = request
        .headers()
        .get(ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let allowed = policy.resolve(request_origin.as_deref());

    if allowed.is_none() {
        tracing::debug!(origin = ?request_origin, "origin not allowed, omitting CORS headers");
    }

    if request.method() == Method::OPTIONS {
        let mut response = StatusCode::NO_CONTENT.into_response();
        policy.apply(response.headers_mut(), allowed.as_deref(), true);
        return response;
    }

    let mut response = next.run(request).await;
    policy.apply(response.headers_mut(), allowed.as_deref(), false);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use lincoln_common::Environment;

    fn list(origins: &[&str]) -> Vec<String> {
        origins.iter().map(|o| o.to_string()).collect()
    }

    #[test]
    fn missing_origin_is_wildcard() {
        assert_eq!(resolve_origin(None, &[], false), Some("*".to_string()));
        assert_eq!(resolve_origin(Some(""), &[], false), Some("*".to_string()));
    }

    #[test]
    fn listed_origin_is_echoed() {
        let allowed = list(&["https://good.example"]);
        assert_eq!(
            resolve_origin(Some("https://good.example"), &allowed, false),
            Some("https://good.example".to_string())
        );
        assert_eq!(resolve_origin(Some("https://evil.example"), &allowed, false), None);
    }

    #[test]
    fn localhost_only_in_development() {
        assert_eq!(
            resolve_origin(Some("http://localhost:3000"), &[], true),
            Some("http://localhost:3000".to_string())
        );
        assert_eq!(resolve_origin(Some("http://localhost:3000"), &[], false), None);
        assert_eq!(resolve_origin(Some("https://localhost:3000"), &[], true), None);
    }

    #[test]
    fn policy_merges_configured_and_default_origins() {
        let mut config = AppConfig::default();
        config.cors.allowed_origins = list(&["https://extra.example"]);

        let production = CorsPolicy::from_config(&config);
        assert_eq!(production.allowed_origins()[0], "https://extra.example");
        assert!(production
            .allowed_origins()
            .contains(&"https://lincoln-better-t.vercel.app".to_string()));
        assert!(!production
            .allowed_origins()
            .contains(&"http://localhost:3000".to_string()));

        config.server.environment = Environment::Development;
        let development = CorsPolicy::from_config(&config);
        assert!(development
            .allowed_origins()
            .contains(&"http://localhost:3001".to_string()));
    }

    #[test]
    fn wildcard_never_sends_credentials() {
        let policy = CorsPolicy::new(vec![], false);
        let mut headers = HeaderMap::new();
        policy.apply(&mut headers, Some("*"), true);

        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert!(headers.get(ACCESS_CONTROL_ALLOW_CREDENTIALS).is_none());
        assert_eq!(headers[ACCESS_CONTROL_MAX_AGE], "86400");
    }

    #[test]
    fn denied_origin_writes_nothing() {
        let policy = CorsPolicy::new(vec![], false);
        let mut headers = HeaderMap::new();
        policy.apply(&mut headers, None, true);
        assert!(headers.is_empty());
    }
}
