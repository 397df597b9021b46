#![allow(dead_code)]

use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use api_server::http::{AppState, RateLimiter, build_router};
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::json;
use sha2::{Digest, Sha256};
use shared::chat::{SnapshotBuilder, SnapshotCache, SystemClock};
use shared::llm::{OpenRouterGateway, OpenRouterGatewayConfig, OpenRouterModelRoute};
use shared::models::{ChatTurn, NewChatTurn};
use shared::repos::{
    MemoryStore, OwnerDirectory, PortfolioRow, PortfolioSource, StoreError, StoreFuture,
    TableQuery, TurnStore,
};
use uuid::Uuid;

use super::mock_provider::{MockProvider, MockReply};

pub const OWNER_TOKEN: &str = "owner-access-token";

pub struct TestApp {
    pub router: axum::Router,
    pub store: MemoryStore,
    pub provider: MockProvider,
}

pub struct RouterParts {
    pub turns: Arc<dyn TurnStore>,
    pub owners: Arc<dyn OwnerDirectory>,
    pub portfolio: Arc<dyn PortfolioSource>,
    pub gateway: OpenRouterGatewayConfig,
}

/// Memory-backed app with a seeded portfolio, an owner token and a scripted provider.
pub async fn spawn_app(replies: Vec<MockReply>) -> TestApp {
    spawn_app_with_timeout(replies, 5_000).await
}

pub async fn spawn_app_with_timeout(replies: Vec<MockReply>, timeout_ms: u64) -> TestApp {
    let provider = MockProvider::start(replies).await;
    let store = MemoryStore::new();
    seed_portfolio(&store);
    grant_owner_token(&store, OWNER_TOKEN);

    let router = build_router_from(RouterParts {
        turns: Arc::new(store.clone()),
        owners: Arc::new(store.clone()),
        portfolio: Arc::new(store.clone()),
        gateway: gateway_config(&provider.url, timeout_ms, Some("test-openrouter-key")),
    });

    TestApp {
        router,
        store,
        provider,
    }
}

pub fn build_router_from(parts: RouterParts) -> axum::Router {
    let snapshot_cache = SnapshotCache::new(
        SnapshotBuilder::new(parts.portfolio),
        Duration::from_secs(300),
        Arc::new(SystemClock),
    );
    let llm_gateway = OpenRouterGateway::new(parts.gateway).expect("gateway should build");

    build_router(AppState {
        turns: parts.turns,
        owners: parts.owners,
        snapshot_cache: Arc::new(snapshot_cache),
        llm_gateway: Arc::new(llm_gateway),
        rate_limiter: RateLimiter::default(),
        trusted_proxy_ips: HashSet::<IpAddr>::new(),
    })
}

pub fn gateway_config(url: &str, timeout_ms: u64, api_key: Option<&str>) -> OpenRouterGatewayConfig {
    OpenRouterGatewayConfig {
        chat_completions_url: url.to_string(),
        api_key: api_key.map(ToString::to_string),
        timeout_ms,
        max_tokens: 256,
        model_route: OpenRouterModelRoute {
            primary_model: "primary-model".to_string(),
            fallback_model: None,
        },
    }
}

pub fn grant_owner_token(store: &MemoryStore, token: &str) -> Uuid {
    let owner_id = Uuid::new_v4();
    store.add_owner_session(
        Sha256::digest(token.as_bytes()).to_vec(),
        owner_id,
        Utc::now() + ChronoDuration::hours(1),
    );
    owner_id
}

pub fn seed_portfolio(store: &MemoryStore) {
    store.put_rows(
        "profile",
        vec![row(json!({
            "full_name": "Jordan Reyes",
            "title": "Backend Engineer",
            "bio": "I build reliable data systems.",
            "updated_at": "2026-01-01T00:00:00Z"
        }))],
    );
    store.put_rows(
        "projects",
        vec![row(json!({
            "title": "Ledger Sync",
            "description": "Event-sourced accounting pipeline",
            "technologies": ["Rust", "Postgres"],
            "created_at": "2025-06-01T00:00:00Z"
        }))],
    );
    store.put_rows(
        "experiences",
        vec![row(json!({
            "company": "Northwind",
            "position": "Staff Engineer",
            "start_date": "2022-03-01",
            "is_current": true
        }))],
    );
}

fn row(value: serde_json::Value) -> PortfolioRow {
    value.as_object().cloned().expect("fixture should be an object")
}

/// Wraps a [`MemoryStore`] and fails every assistant-turn write.
#[derive(Clone)]
pub struct FailingAssistantWrites {
    pub inner: MemoryStore,
}

impl TurnStore for FailingAssistantWrites {
    fn append_turn<'a>(&'a self, turn: NewChatTurn) -> StoreFuture<'a, ChatTurn> {
        if turn.is_user {
            return self.inner.append_turn(turn);
        }
        Box::pin(async { Err(StoreError::Unavailable("write rejected".to_string())) })
    }

    fn list_turns<'a>(&'a self, session_id: &'a str, limit: i64) -> StoreFuture<'a, Vec<ChatTurn>> {
        self.inner.list_turns(session_id, limit)
    }

    fn recent_turns<'a>(
        &'a self,
        session_id: &'a str,
        limit: i64,
    ) -> StoreFuture<'a, Vec<ChatTurn>> {
        self.inner.recent_turns(session_id, limit)
    }

    fn purge_session<'a>(&'a self, session_id: &'a str) -> StoreFuture<'a, u64> {
        self.inner.purge_session(session_id)
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        self.inner.ping()
    }
}

/// Portfolio source whose every read fails.
pub struct OfflinePortfolio;

impl PortfolioSource for OfflinePortfolio {
    fn select_rows<'a>(&'a self, _query: &'a TableQuery) -> StoreFuture<'a, Vec<PortfolioRow>> {
        Box::pin(async { Err(StoreError::Unavailable("portfolio offline".to_string())) })
    }
}
