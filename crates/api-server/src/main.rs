use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use api_server::http::{self, AppState, RateLimiter};
use shared::chat::{SnapshotBuilder, SnapshotCache, SystemClock};
use shared::config::{ApiConfig, load_dotenv};
use shared::llm::{OpenRouterGateway, OpenRouterGatewayConfig};
use shared::repos::Store;
use tracing::{error, info, warn};

const RATE_LIMIT_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() {
    let dotenv_path = load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "api_server=debug,shared=info".to_string()),
        )
        .init();

    if let Some(path) = dotenv_path {
        info!("loaded environment from {}", path.display());
    }

    let config = match ApiConfig::from_env() {
        Ok(cfg) => cfg,
        Err(err) => {
            error!("failed to read config: {err}");
            std::process::exit(1);
        }
    };

    let llm_config = match OpenRouterGatewayConfig::from_env() {
        Ok(cfg) => cfg,
        Err(err) => {
            error!("failed to read llm config: {err}");
            std::process::exit(1);
        }
    };
    if llm_config.api_key.is_none() {
        warn!("OPENROUTER_API_KEY is not set; POST /chat will answer 503");
    }

    let llm_gateway = match OpenRouterGateway::new(llm_config) {
        Ok(gateway) => gateway,
        Err(err) => {
            error!("failed to build llm gateway: {err}");
            std::process::exit(1);
        }
    };

    let store = match Store::connect(&config.database_url, config.database_max_connections).await
    {
        Ok(store) => store,
        Err(err) => {
            error!("failed to connect to postgres: {err}");
            std::process::exit(1);
        }
    };

    let migrator = match sqlx::migrate::Migrator::new(config.migrations_dir.clone()).await {
        Ok(migrator) => migrator,
        Err(err) => {
            error!("failed to load migrations: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = migrator.run(store.pool()).await {
        error!("failed to run migrations: {err}");
        std::process::exit(1);
    }

    let store = Arc::new(store);
    let snapshot_cache = SnapshotCache::new(
        SnapshotBuilder::new(store.clone()),
        Duration::from_secs(config.snapshot_ttl_seconds),
        Arc::new(SystemClock),
    );

    let rate_limiter = RateLimiter::default();
    rate_limiter.spawn_pruner(RATE_LIMIT_PRUNE_INTERVAL);

    let app = http::build_router(AppState {
        turns: store.clone(),
        owners: store,
        snapshot_cache: Arc::new(snapshot_cache),
        llm_gateway: Arc::new(llm_gateway),
        rate_limiter,
        trusted_proxy_ips: config.trusted_proxy_ips,
    });

    let addr: SocketAddr = match config.bind_addr.parse() {
        Ok(addr) => addr,
        Err(err) => {
            error!("invalid API_BIND_ADDR {}: {err}", config.bind_addr);
            std::process::exit(1);
        }
    };

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("failed to bind {addr}: {err}");
            std::process::exit(1);
        }
    };

    info!(
        "api server listening on {}",
        listener.local_addr().unwrap_or(addr)
    );
    if let Err(err) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    {
        error!("server exited with error: {err}");
        std::process::exit(1);
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {err}");
    }
    info!("shutdown signal received");
}
