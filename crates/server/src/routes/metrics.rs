use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::state::{ServerMetrics, SharedState};

/// GET /metrics
///
/// Not rate limited.
pub async fn get_metrics(State(state): State<SharedState>) -> Response {
    match state.metrics.render() {
        Ok(body) => ([(CONTENT_TYPE, ServerMetrics::CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "metrics encoding failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
