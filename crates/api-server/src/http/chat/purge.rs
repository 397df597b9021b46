use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Extension, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use shared::models::SuccessResponse;
use tracing::info;

use super::super::errors::{bad_request_response, store_error_response};
use super::super::{AppState, AuthOwner};
use super::SessionQuery;

pub(crate) async fn purge_chat(
    State(state): State<AppState>,
    Extension(owner): Extension<AuthOwner>,
    query: Result<Query<SessionQuery>, QueryRejection>,
) -> Response {
    let Ok(Query(query)) = query else {
        return bad_request_response("invalid_query", "Query string is malformed");
    };
    let Some(session_id) = query.trimmed_session_id() else {
        return bad_request_response("missing_session_id", "sessionId is required");
    };

    match state.turns.purge_session(session_id).await {
        Ok(deleted) => {
            info!(
                owner_id = %owner.owner_id,
                session_id,
                deleted,
                "chat session purged"
            );
            (StatusCode::OK, Json(SuccessResponse { success: true })).into_response()
        }
        Err(err) => store_error_response(err),
    }
}
