use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{ChatTurn, NewChatTurn};

mod chat_turns;
mod memory;
mod owner_sessions;
mod portfolio;

pub use memory::MemoryStore;

/// One portfolio record as a column-name to value mapping.
pub type PortfolioRow = Map<String, Value>;

pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("invalid persisted data: {0}")]
    InvalidData(String),
    #[error("invalid table query: {0}")]
    InvalidQuery(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    fn as_sql(self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy {
    pub column: &'static str,
    pub direction: SortDirection,
}

impl OrderBy {
    pub const fn asc(column: &'static str) -> Self {
        Self {
            column,
            direction: SortDirection::Ascending,
        }
    }

    pub const fn desc(column: &'static str) -> Self {
        Self {
            column,
            direction: SortDirection::Descending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableQuery {
    pub table: &'static str,
    pub order_by: Option<OrderBy>,
    pub limit: i64,
}

/// Read-only access to the tables owned by the portfolio CRUD subsystem.
pub trait PortfolioSource: Send + Sync {
    fn select_rows<'a>(&'a self, query: &'a TableQuery) -> StoreFuture<'a, Vec<PortfolioRow>>;
}

/// Session-scoped chat log.
pub trait TurnStore: Send + Sync {
    fn append_turn<'a>(&'a self, turn: NewChatTurn) -> StoreFuture<'a, ChatTurn>;

    /// Turns for `session_id`, oldest first, at most `limit` of them.
    fn list_turns<'a>(&'a self, session_id: &'a str, limit: i64)
    -> StoreFuture<'a, Vec<ChatTurn>>;

    /// The newest `limit` turns for `session_id`, still returned oldest first.
    fn recent_turns<'a>(
        &'a self,
        session_id: &'a str,
        limit: i64,
    ) -> StoreFuture<'a, Vec<ChatTurn>>;

    /// Deletes every turn of the session and returns how many were removed.
    fn purge_session<'a>(&'a self, session_id: &'a str) -> StoreFuture<'a, u64>;

    fn ping(&self) -> StoreFuture<'_, ()>;
}

/// Resolves owner bearer tokens issued by the external auth system.
pub trait OwnerDirectory: Send + Sync {
    fn resolve_owner<'a>(
        &'a self,
        access_token_hash: &'a [u8],
        now: DateTime<Utc>,
    ) -> StoreFuture<'a, Option<Uuid>>;
}

#[derive(Clone)]
pub struct Store {
    pool: PgPool,
}

impl Store {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        let _: i32 = sqlx::query_scalar("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}

pub(crate) fn is_safe_identifier(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= 63
        && value
            .bytes()
            .all(|byte| byte.is_ascii_lowercase() || byte.is_ascii_digit() || byte == b'_')
        && !value.as_bytes()[0].is_ascii_digit()
}
