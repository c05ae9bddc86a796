//! Plumbing shared by every RPC procedure: request context capture, the
//! per-procedure rate-limit check, input decoding and the JSON error envelope.

use std::future::Future;

use axum::extract::Request;
use axum::http::header::HeaderName;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lincoln_common::{DirectoryError, DirectoryResult};
use lincoln_directory::RecordQuery;
use lincoln_rate_limit::RateLimitDecision;
use lincoln_request_context::RequestContext;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::state::AppState;

const RATE_LIMITED_MESSAGE: &str = "Rate limit exceeded. Please try again later.";

/// Capture the client's [`RequestContext`] once and store it in the request
/// extensions for the handlers.
pub async fn attach_request_context(mut request: Request, next: Next) -> Response {
    let ctx = RequestContext::from_headers(request.headers());
    tracing::trace!(client_ip = %ctx.client_ip, "request context attached");
    request.extensions_mut().insert(ctx);
    next.run(request).await
}

/// Count the call and check it against the procedure's tier.
pub fn enforce_rate_limit(
    state: &AppState,
    ctx: &RequestContext,
    procedure: &str,
) -> Result<RateLimitDecision, RpcError> {
    state
        .metrics
        .requests_total
        .with_label_values(&[procedure])
        .inc();

    let tier = state.config.rate_limit.tier_for(procedure);
    let decision =
        state
            .limiter
            .check_custom_with_context(ctx, tier.max_requests, tier.window_ms);

    if decision.allowed {
        return Ok(decision);
    }

    state
        .metrics
        .requests_rate_limited
        .with_label_values(&[procedure])
        .inc();
    Err(RpcError::rate_limited(decision))
}

/// Run `procedure` behind the rate-limit check and turn its outcome into a
/// response carrying the rate-limit headers.
///
/// `handler` is only polled once the check has admitted the call.
pub async fn dispatch<T, Fut>(
    state: &AppState,
    ctx: &RequestContext,
    procedure: &'static str,
    handler: Fut,
) -> Response
where
    T: Serialize,
    Fut: Future<Output = DirectoryResult<T>>,
{
    let timer = state
        .metrics
        .request_duration
        .with_label_values(&[procedure])
        .start_timer();

    let response = match enforce_rate_limit(state, ctx, procedure) {
        Err(err) => err.into_response(),
        Ok(decision) => match handler.await {
            Ok(body) => RpcResponse::new(decision, body).into_response(),
            Err(err) => RpcError::from(err).with_decision(decision).into_response(),
        },
    };

    timer.observe_duration();
    response
}

/// Query string of a procedure call. RPC clients send GET input as JSON in
/// `data`.
#[derive(Debug, Default, Deserialize)]
pub struct QueryInput {
    pub data: Option<String>,
}

/// The raw input of a call: the body, or `data` from the query string when the
/// body is empty.
pub fn request_input<'a>(query: &'a QueryInput, body: &'a [u8]) -> &'a [u8] {
    match &query.data {
        Some(data) if body.iter().all(u8::is_ascii_whitespace) => data.as_bytes(),
        _ => body,
    }
}

/// Decode the optional list input.
///
/// An empty body or `null` is the default query. A `{"json": ...}` envelope,
/// as sent by RPC client libraries, is unwrapped first.
pub fn parse_input(body: &[u8]) -> DirectoryResult<RecordQuery> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(RecordQuery::default());
    }

    let mut value: Value = serde_json::from_slice(body)
        .map_err(|e| DirectoryError::InvalidInput(format!("malformed JSON input: {e}")))?;

    if let Some(inner) = value.get_mut("json").map(Value::take) {
        value = inner;
    }

    if value.is_null() {
        return Ok(RecordQuery::default());
    }

    serde_json::from_value(value).map_err(|e| DirectoryError::InvalidInput(e.to_string()))
}

/// Fallback for unknown procedures and paths.
pub async fn not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "NOT_FOUND", "Not found", false, Value::Null)
}

/// Successful procedure result plus the decision that admitted it.
pub struct RpcResponse<T> {
    decision: RateLimitDecision,
    body: T,
}

impl<T> RpcResponse<T> {
    pub fn new(decision: RateLimitDecision, body: T) -> Self {
        Self { decision, body }
    }
}

impl<T: Serialize> IntoResponse for RpcResponse<T> {
    fn into_response(self) -> Response {
        let mut response = Json(self.body).into_response();
        insert_rate_limit_headers(response.headers_mut(), &self.decision);
        response
    }
}

/// A procedure failure rendered as the JSON error envelope.
#[derive(Debug)]
pub struct RpcError {
    error: DirectoryError,
    decision: Option<RateLimitDecision>,
}

impl RpcError {
    /// Error for a denied decision; its headers go on the response.
    pub fn rate_limited(decision: RateLimitDecision) -> Self {
        Self {
            error: DirectoryError::RateLimited {
                retry_after: decision.retry_after.unwrap_or(1),
                limit: decision.limit,
                remaining: decision.remaining,
                reset_time: decision.reset_time,
            },
            decision: Some(decision),
        }
    }

    pub fn with_decision(mut self, decision: RateLimitDecision) -> Self {
        self.decision = Some(decision);
        self
    }

    pub fn error(&self) -> &DirectoryError {
        &self.error
    }

    pub fn status(&self) -> StatusCode {
        match &self.error {
            DirectoryError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            DirectoryError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            DirectoryError::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DirectoryError> for RpcError {
    fn from(error: DirectoryError) -> Self {
        Self {
            error,
            decision: None,
        }
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let status = self.status();

        let mut response = match &self.error {
            DirectoryError::RateLimited {
                retry_after,
                limit,
                remaining,
                reset_time,
            } => error_response(
                status,
                "RATE_LIMITED",
                RATE_LIMITED_MESSAGE,
                true,
                json!({
                    "retryAfter": retry_after,
                    "limit": limit,
                    "remaining": remaining,
                    "resetTime": reset_time,
                }),
            ),
            DirectoryError::InvalidInput(message) => {
                error_response(status, "BAD_REQUEST", message, false, Value::Null)
            }
            DirectoryError::Upstream { dataset, .. } => {
                tracing::error!(error = %self.error, "record source failed");
                error_response(
                    status,
                    "INTERNAL_SERVER_ERROR",
                    &format!("Failed to fetch {dataset}"),
                    false,
                    Value::Null,
                )
            }
        };

        if let Some(decision) = &self.decision {
            insert_rate_limit_headers(response.headers_mut(), decision);
        }
        response
    }
}

fn error_response(
    status: StatusCode,
    code: &str,
    message: &str,
    defined: bool,
    data: Value,
) -> Response {
    let mut body = json!({
        "defined": defined,
        "code": code,
        "status": status.as_u16(),
        "message": message,
    });
    if !data.is_null() {
        body["data"] = data;
    }

    (status, Json(body)).into_response()
}

fn insert_rate_limit_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    for (name, value) in decision.headers() {
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert(HeaderName::from_static(name), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn denied() -> RateLimitDecision {
        RateLimitDecision {
            allowed: false,
            remaining: 0,
            reset_time: 1_700_000_030_000,
            retry_after: Some(30),
            limit: 20,
        }
    }

    #[test]
    fn empty_and_null_inputs_are_default() {
        assert_eq!(parse_input(b"").unwrap(), RecordQuery::default());
        assert_eq!(parse_input(b"  \n").unwrap(), RecordQuery::default());
        assert_eq!(parse_input(b"null").unwrap(), RecordQuery::default());
        assert_eq!(parse_input(br#"{"json": null}"#).unwrap(), RecordQuery::default());
    }

    #[test]
    fn envelope_is_unwrapped() {
        let query = parse_input(br#"{"json": {"search": "smith", "limit": 5}}"#).unwrap();
        assert_eq!(query.search.as_deref(), Some("smith"));
        assert_eq!(query.limit, Some(5));

        let bare = parse_input(br#"{"offset": 10}"#).unwrap();
        assert_eq!(bare.offset, Some(10));
    }

    #[test]
    fn query_data_used_only_without_body() {
        let query = QueryInput {
            data: Some(r#"{"json": {"limit": 2}}"#.to_string()),
        };
        assert_eq!(parse_input(request_input(&query, b"")).unwrap().limit, Some(2));
        assert_eq!(
            parse_input(request_input(&query, br#"{"limit": 7}"#)).unwrap().limit,
            Some(7)
        );
        assert_eq!(request_input(&QueryInput::default(), b""), b"");
    }

    #[test]
    fn bad_input_is_invalid_input() {
        let bodies: [&[u8]; 3] = [b"{oops", br#"{"limit": -1}"#, br#"{"page": 2}"#];
        for body in bodies {
            let err = parse_input(body).unwrap_err();
            assert!(matches!(err, DirectoryError::InvalidInput(_)), "{err:?}");
        }
    }

    #[test]
    fn status_mapping() {
        assert_eq!(
            RpcError::rate_limited(denied()).status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            RpcError::from(DirectoryError::InvalidInput("x".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            RpcError::from(DirectoryError::upstream("students", "connection reset")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn rate_limited_response_carries_headers() {
        let response = RpcError::rate_limited(denied()).into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let headers = response.headers();
        assert_eq!(headers["retry-after"], "30");
        assert_eq!(headers["x-ratelimit-limit"], "20");
        assert_eq!(headers["x-ratelimit-remaining"], "0");
        assert_eq!(headers["x-ratelimit-reset"], "1700000030");
    }
}
