use axum::extract::State;
use axum::response::Response;
use axum::Extension;
use lincoln_common::DirectoryError;
use lincoln_request_context::RequestContext;

use crate::rpc::dispatch;
use crate::state::SharedState;

pub const PROCEDURE: &str = "healthCheck";

/// /rpc/healthCheck
///
/// Liveness probe. Rate limited like every other procedure.
pub async fn health_check(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
) -> Response {
    let handler = async { Ok::<_, DirectoryError>("OK") };
    dispatch(&state, &ctx, PROCEDURE, handler).await
}
