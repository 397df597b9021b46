use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use shared::models::OkResponse;
use tracing::warn;

use super::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Readiness {
    ok: bool,
    store: &'static str,
    llm_configured: bool,
}

pub(super) async fn healthz() -> impl IntoResponse {
    Json(OkResponse { ok: true })
}

/// Ready once the turn store answers. A missing provider key is reported but
/// does not fail readiness; chat requests answer 503 on their own.
pub(super) async fn readyz(State(state): State<AppState>) -> Response {
    let llm_configured = state.llm_gateway.is_configured();
    let (status, store) = match state.turns.ping().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(err) => {
            warn!("readiness check failed: {err}");
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        }
    };

    (
        status,
        Json(Readiness {
            ok: status == StatusCode::OK,
            store,
            llm_configured,
        }),
    )
        .into_response()
}
