use axum::Json;
use axum::extract::{Query, State};
use axum::extract::rejection::QueryRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use shared::models::ListChatResponse;

use super::super::AppState;
use super::super::errors::{bad_request_response, store_error_response};
use super::{MAX_LISTED_TURNS, SessionQuery};

pub(crate) async fn list_chat(
    State(state): State<AppState>,
    query: Result<Query<SessionQuery>, QueryRejection>,
) -> Response {
    let Ok(Query(query)) = query else {
        return bad_request_response("invalid_query", "Query string is malformed");
    };
    let Some(session_id) = query.trimmed_session_id() else {
        return bad_request_response("missing_session_id", "sessionId is required");
    };

    match state.turns.list_turns(session_id, MAX_LISTED_TURNS).await {
        Ok(messages) => (
            StatusCode::OK,
            Json(ListChatResponse {
                success: true,
                messages,
            }),
        )
            .into_response(),
        Err(err) => store_error_response(err),
    }
}
