#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot};

#[derive(Debug, Clone)]
pub struct MockReply {
    pub status: StatusCode,
    pub body: Value,
    pub delay: Duration,
}

impl MockReply {
    pub fn text(content: &str) -> Self {
        Self {
            status: StatusCode::OK,
            body: json!({
                "id": "req-mock",
                "model": "mock-model",
                "choices": [{ "message": { "content": content } }],
                "usage": {
                    "prompt_tokens": 100,
                    "completion_tokens": 20,
                    "total_tokens": 120
                }
            }),
            delay: Duration::ZERO,
        }
    }

    pub fn error(status: StatusCode, code: &str) -> Self {
        Self {
            status,
            body: json!({ "error": { "code": code } }),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Clone)]
struct ProviderState {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    requests: Arc<Mutex<Vec<Value>>>,
}

/// Chat-completions endpoint served from `127.0.0.1:0` with scripted replies.
pub struct MockProvider {
    pub url: String,
    state: ProviderState,
    shutdown_tx: Option<oneshot::Sender<()>>,
    server_task: tokio::task::JoinHandle<()>,
}

impl MockProvider {
    pub async fn start(replies: Vec<MockReply>) -> Self {
        let state = ProviderState {
            replies: Arc::new(Mutex::new(VecDeque::from(replies))),
            requests: Arc::new(Mutex::new(Vec::new())),
        };
        let app = Router::new()
            .route("/chat/completions", post(chat_completions))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("listener should bind");
        let local_addr = listener
            .local_addr()
            .expect("listener address should resolve");
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let server_task = tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });

            server.await.expect("mock provider should run");
        });

        Self {
            url: format!("http://{local_addr}/chat/completions"),
            state,
            shutdown_tx: Some(shutdown_tx),
            server_task,
        }
    }

    pub async fn requests(&self) -> Vec<Value> {
        self.state.requests.lock().await.clone()
    }

    pub async fn request_count(&self) -> usize {
        self.state.requests.lock().await.len()
    }
}

impl Drop for MockProvider {
    fn drop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
        self.server_task.abort();
    }
}

async fn chat_completions(
    State(state): State<ProviderState>,
    Json(payload): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.requests.lock().await.push(payload);

    let reply = state
        .replies
        .lock()
        .await
        .pop_front()
        .unwrap_or_else(|| MockReply::text("Happy to tell you more about my work."));

    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }

    (reply.status, Json(reply.body))
}
