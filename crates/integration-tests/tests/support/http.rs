#![allow(dead_code)]

use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

pub struct JsonResponse {
    pub status: StatusCode,
    pub retry_after: Option<String>,
    pub body: Value,
}

pub async fn send_json(app: &axum::Router, request: Request<Body>) -> JsonResponse {
    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("request should succeed");
    let status = response.status();
    let retry_after = response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string);
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body should read");
    let body = serde_json::from_slice::<Value>(&body).unwrap_or_else(|_| json!({}));

    JsonResponse {
        status,
        retry_after,
        body,
    }
}

pub fn request(
    method: Method,
    uri: &str,
    auth_header: Option<&str>,
    json_body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth_header) = auth_header {
        builder = builder.header(header::AUTHORIZATION, auth_header);
    }

    match json_body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request should build"),
        None => builder.body(Body::empty()).expect("request should build"),
    }
}

pub fn post_chat(body: Value) -> Request<Body> {
    request(Method::POST, "/chat", None, Some(body))
}

pub fn get_chat(session_id: &str) -> Request<Body> {
    request(
        Method::GET,
        &format!("/chat?sessionId={session_id}"),
        None,
        None,
    )
}

pub fn delete_chat(session_id: &str, token: Option<&str>) -> Request<Body> {
    let auth = token.map(|token| format!("Bearer {token}"));
    request(
        Method::DELETE,
        &format!("/chat?sessionId={session_id}"),
        auth.as_deref(),
        None,
    )
}

pub fn error_code(body: &Value) -> Option<&str> {
    body.get("code").and_then(Value::as_str)
}
