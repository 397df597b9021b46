use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use shared::chat::{
    CategoryMatch, HISTORY_WINDOW, PriorTurn, assemble_conversation, check_chat_input,
    detect_category_mismatch, prior_turns_from_history,
};
use shared::llm::{LlmGatewayRequest, PORTFOLIO_PERSONA, generate_with_telemetry};
use shared::models::{
    CategoryLabel, ChatTurn, HistoryEntry, NewChatTurn, SendChatRequest, SendChatResponse,
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::super::AppState;
use super::super::errors::{
    assistant_unavailable_response, bad_request_response, input_rejection_response,
    llm_error_response, snapshot_error_response, store_error_response,
};
use super::super::observability::RequestContext;

const UNSAVED_REPLY_WARNING: &str = "The reply was generated but could not be saved to history";

pub(crate) async fn send_chat(
    State(state): State<AppState>,
    Extension(request_context): Extension<RequestContext>,
    payload: Result<Json<SendChatRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            debug!(reason = %rejection.body_text(), "chat request body rejected");
            return bad_request_response("invalid_json", "Request body must be valid JSON");
        }
    };

    let input = match check_chat_input(&req.message, &req.session_id) {
        Ok(input) => input,
        Err(rejection) => {
            warn!(
                request_id = %request_context.request_id,
                code = rejection.code(),
                "chat input rejected"
            );
            return input_rejection_response(&rejection);
        }
    };
    let category = CategoryLabel::from_request(req.category.as_deref());

    if !state.llm_gateway.is_configured() {
        warn!("chat request refused: llm provider credentials are not configured");
        return assistant_unavailable_response();
    }

    let suggested_category = match detect_category_mismatch(&input.message, category) {
        CategoryMatch::NoMismatch => None,
        CategoryMatch::Suggest(detected) => {
            info!(
                request_id = %request_context.request_id,
                selected = category.as_str(),
                detected = detected.as_str(),
                "chat message looks off-topic for the selected category"
            );
            Some(detected)
        }
    };

    let history = match load_prior_turns(
        &state,
        &input.session_id,
        req.conversation_history.as_deref(),
    )
    .await
    {
        Ok(history) => history,
        Err(response) => return response,
    };

    let snapshot = match state.snapshot_cache.get().await {
        Ok(snapshot) => snapshot,
        Err(err) => return snapshot_error_response(err),
    };

    let messages = assemble_conversation(
        &PORTFOLIO_PERSONA,
        &snapshot,
        category,
        &history,
        &input.message,
    );

    let user_message = match state
        .turns
        .append_turn(NewChatTurn {
            session_id: input.session_id.clone(),
            message: input.message.clone(),
            is_user: true,
            category,
        })
        .await
    {
        Ok(turn) => turn,
        Err(err) => return store_error_response(err),
    };

    let request = LlmGatewayRequest::new(messages).with_requester_id(&input.session_id);
    let (result, telemetry) = generate_with_telemetry(state.llm_gateway.as_ref(), request).await;
    telemetry.log(&input.session_id);

    let response = match result {
        Ok(response) => response,
        Err(err) => return llm_error_response(&err),
    };

    let (ai_message, warning) = match state
        .turns
        .append_turn(NewChatTurn {
            session_id: input.session_id.clone(),
            message: response.reply.clone(),
            is_user: false,
            category,
        })
        .await
    {
        Ok(turn) => (turn, None),
        Err(err) => {
            error!(
                request_id = %request_context.request_id,
                "failed to persist assistant turn: {err}"
            );
            let unsaved = ChatTurn {
                id: Uuid::new_v4(),
                session_id: input.session_id.clone(),
                message: response.reply,
                is_user: false,
                category,
                created_at: Utc::now(),
            };
            (unsaved, Some(UNSAVED_REPLY_WARNING.to_string()))
        }
    };

    (
        StatusCode::CREATED,
        Json(SendChatResponse {
            success: true,
            user_message,
            ai_message,
            warning,
            suggested_category,
        }),
    )
        .into_response()
}

/// Client-supplied history wins; otherwise the stored window for the session is used.
async fn load_prior_turns(
    state: &AppState,
    session_id: &str,
    client_history: Option<&[HistoryEntry]>,
) -> Result<Vec<PriorTurn>, Response> {
    if let Some(entries) = client_history {
        return Ok(prior_turns_from_history(entries));
    }

    state
        .turns
        .recent_turns(session_id, HISTORY_WINDOW as i64)
        .await
        .map(|turns| turns.iter().map(PriorTurn::from).collect())
        .map_err(store_error_response)
}
