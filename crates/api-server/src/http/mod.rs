use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::{Router, middleware};
use shared::chat::SnapshotCache;
use shared::llm::LlmGateway;
use shared::repos::{OwnerDirectory, TurnStore};
use uuid::Uuid;

mod authn;
mod chat;
mod errors;
mod health;
mod observability;
mod rate_limit;

pub use rate_limit::RateLimiter;

#[derive(Clone)]
pub struct AppState {
    pub turns: Arc<dyn TurnStore>,
    pub owners: Arc<dyn OwnerDirectory>,
    pub snapshot_cache: Arc<SnapshotCache>,
    pub llm_gateway: Arc<dyn LlmGateway>,
    pub rate_limiter: RateLimiter,
    pub trusted_proxy_ips: HashSet<IpAddr>,
}

#[derive(Clone, Copy)]
pub(super) struct AuthOwner {
    pub(super) owner_id: Uuid,
}

pub fn build_router(app_state: AppState) -> Router {
    let purge_route = delete(chat::purge_chat).route_layer(middleware::from_fn_with_state(
        app_state.clone(),
        authn::owner_auth_middleware,
    ));

    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .route(
            "/chat",
            post(chat::send_chat)
                .get(chat::list_chat)
                .merge(purge_route),
        )
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            rate_limit::chat_rate_limit_middleware,
        ))
        .layer(middleware::from_fn(
            observability::request_observability_middleware,
        ))
        .with_state(app_state)
}
