use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use shared::chat::{InputRejection, SnapshotError};
use shared::llm::LlmGatewayError;
use shared::models::ErrorResponse;
use shared::repos::StoreError;
use tracing::{error, warn};

fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
            code: code.to_string(),
        }),
    )
        .into_response()
}

pub(super) fn bad_request_response(code: &str, message: &str) -> Response {
    error_response(StatusCode::BAD_REQUEST, code, message)
}

pub(super) fn input_rejection_response(rejection: &InputRejection) -> Response {
    bad_request_response(rejection.code(), &rejection.to_string())
}

pub(super) fn unauthorized_response() -> Response {
    error_response(
        StatusCode::UNAUTHORIZED,
        "unauthorized",
        "Missing or invalid bearer token",
    )
}

pub(super) fn too_many_requests_response(retry_after_seconds: u64) -> Response {
    let mut response = error_response(
        StatusCode::TOO_MANY_REQUESTS,
        "rate_limited",
        "Too many requests; retry later",
    );

    if let Ok(retry_after_value) = HeaderValue::from_str(&retry_after_seconds.to_string()) {
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, retry_after_value);
    }

    response
}

pub(super) fn assistant_unavailable_response() -> Response {
    error_response(
        StatusCode::SERVICE_UNAVAILABLE,
        "assistant_unavailable",
        "The assistant is not available right now",
    )
}

pub(super) fn internal_error_response() -> Response {
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_error",
        "Unexpected server error",
    )
}

pub(super) fn store_error_response(err: StoreError) -> Response {
    error!("database operation failed: {err}");
    internal_error_response()
}

pub(super) fn snapshot_error_response(err: SnapshotError) -> Response {
    error!("portfolio snapshot unavailable: {err}");
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "portfolio_unavailable",
        "Portfolio data could not be loaded",
    )
}

pub(super) fn llm_error_response(err: &LlmGatewayError) -> Response {
    match err {
        LlmGatewayError::Unavailable => assistant_unavailable_response(),
        LlmGatewayError::Timeout => error_response(
            StatusCode::GATEWAY_TIMEOUT,
            "assistant_timeout",
            "The assistant took too long to respond",
        ),
        LlmGatewayError::ProviderFailure(detail)
        | LlmGatewayError::InvalidProviderPayload(detail) => {
            warn!(detail = %detail, "llm provider call failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "assistant_error",
                "The assistant could not generate a reply",
            )
        }
    }
}
