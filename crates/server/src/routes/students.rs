use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::response::Response;
use axum::Extension;
use lincoln_common::DirectoryError;
use lincoln_directory::Dataset;
use lincoln_request_context::RequestContext;

use crate::rpc::{dispatch, parse_input, request_input, QueryInput};
use crate::state::SharedState;

pub const PROCEDURE: &str = "getStudents";

/// /rpc/getStudents
///
/// Optional input `{search?, offset?, limit?}`; returns matching student rows.
pub async fn get_students(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    Query(input): Query<QueryInput>,
    body: Bytes,
) -> Response {
    let handler = async {
        let query = parse_input(request_input(&input, &body))?;
        query.validate(Dataset::Students)?;

        state
            .directory
            .students(&query)
            .await
            .map_err(|e| DirectoryError::upstream(Dataset::Students.name(), e))
    };

    dispatch(&state, &ctx, PROCEDURE, handler).await
}
