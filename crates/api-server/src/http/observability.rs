use std::time::Instant;

use axum::extract::Request;
use axum::http::{HeaderName, HeaderValue, Method};
use axum::middleware::Next;
use axum::response::Response;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

static REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");
const MAX_REQUEST_ID_LEN: usize = 128;

/// Per-request identity, available to handlers as an `Extension`.
#[derive(Clone, Debug)]
pub(super) struct RequestContext {
    pub(super) request_id: String,
}

/// Tags every request with an id, runs the handler inside a span carrying it,
/// echoes the id back and logs one completion line. Query strings are left out
/// of the log so session ids do not end up in access logs.
pub(super) async fn request_observability_middleware(mut req: Request, next: Next) -> Response {
    let request_id = req
        .headers()
        .get(&REQUEST_ID)
        .and_then(|value| value.to_str().ok())
        .and_then(normalize_request_id)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    req.extensions_mut().insert(RequestContext {
        request_id: request_id.clone(),
    });

    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let span = info_span!("http_request", request_id = %request_id, method = %method, path = %path);

    let started_at = Instant::now();
    let mut response = next.run(req).instrument(span.clone()).await;
    let latency_ms = u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX);

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID.clone(), value);
    }

    let _entered = span.enter();
    log_completion(&method, response.status().as_u16(), latency_ms);

    response
}

fn log_completion(method: &Method, status: u16, latency_ms: u64) {
    match status {
        500.. => warn!(status, latency_ms, "request failed on the server side"),
        400..=499 if method == Method::POST => {
            info!(status, latency_ms, "chat request refused")
        }
        _ => info!(status, latency_ms, "request completed"),
    }
}

fn normalize_request_id(raw: &str) -> Option<String> {
    let candidate = raw.trim();
    let acceptable = !candidate.is_empty()
        && candidate.len() <= MAX_REQUEST_ID_LEN
        && candidate
            .bytes()
            .all(|byte| byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.'));

    acceptable.then(|| candidate.to_string())
}
