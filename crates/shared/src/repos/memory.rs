use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::models::{ChatTurn, NewChatTurn};

use super::{
    OrderBy, OwnerDirectory, PortfolioRow, PortfolioSource, SortDirection, StoreFuture,
    TableQuery, TurnStore,
};

/// Process-local implementation of every store collaborator.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    tables: HashMap<&'static str, Vec<PortfolioRow>>,
    turns: Vec<ChatTurn>,
    owner_sessions: HashMap<Vec<u8>, OwnerSession>,
}

struct OwnerSession {
    owner_id: Uuid,
    expires_at: DateTime<Utc>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the contents of `table`.
    pub fn put_rows(&self, table: &'static str, rows: Vec<PortfolioRow>) {
        self.lock().tables.insert(table, rows);
    }

    pub fn add_owner_session(
        &self,
        access_token_hash: Vec<u8>,
        owner_id: Uuid,
        expires_at: DateTime<Utc>,
    ) {
        self.lock().owner_sessions.insert(
            access_token_hash,
            OwnerSession {
                owner_id,
                expires_at,
            },
        );
    }

    pub fn turn_count(&self) -> usize {
        self.lock().turns.len()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PortfolioSource for MemoryStore {
    fn select_rows<'a>(&'a self, query: &'a TableQuery) -> StoreFuture<'a, Vec<PortfolioRow>> {
        Box::pin(async move {
            let mut rows = self
                .lock()
                .tables
                .get(query.table)
                .cloned()
                .unwrap_or_default();

            if let Some(order_by) = query.order_by {
                rows.sort_by(|left, right| compare_rows(left, right, order_by));
            }
            rows.truncate(usize::try_from(query.limit.max(0)).unwrap_or(usize::MAX));

            Ok(rows)
        })
    }
}

impl TurnStore for MemoryStore {
    fn append_turn<'a>(&'a self, turn: NewChatTurn) -> StoreFuture<'a, ChatTurn> {
        Box::pin(async move {
            let mut state = self.lock();
            let now = Utc::now();
            let created_at = state
                .turns
                .last()
                .map(|last| last.created_at.max(now))
                .unwrap_or(now);

            let stored = ChatTurn {
                id: Uuid::new_v4(),
                session_id: turn.session_id,
                message: turn.message,
                is_user: turn.is_user,
                category: turn.category,
                created_at,
            };
            state.turns.push(stored.clone());

            Ok(stored)
        })
    }

    fn list_turns<'a>(
        &'a self,
        session_id: &'a str,
        limit: i64,
    ) -> StoreFuture<'a, Vec<ChatTurn>> {
        Box::pin(async move {
            let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
            Ok(self
                .lock()
                .turns
                .iter()
                .filter(|turn| turn.session_id == session_id)
                .take(limit)
                .cloned()
                .collect())
        })
    }

    fn recent_turns<'a>(
        &'a self,
        session_id: &'a str,
        limit: i64,
    ) -> StoreFuture<'a, Vec<ChatTurn>> {
        Box::pin(async move {
            let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
            let session: Vec<ChatTurn> = self
                .lock()
                .turns
                .iter()
                .filter(|turn| turn.session_id == session_id)
                .cloned()
                .collect();
            let skip = session.len().saturating_sub(limit);
            Ok(session.into_iter().skip(skip).collect())
        })
    }

    fn purge_session<'a>(&'a self, session_id: &'a str) -> StoreFuture<'a, u64> {
        Box::pin(async move {
            let mut state = self.lock();
            let before = state.turns.len();
            state.turns.retain(|turn| turn.session_id != session_id);
            Ok((before - state.turns.len()) as u64)
        })
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async { Ok(()) })
    }
}

impl OwnerDirectory for MemoryStore {
    fn resolve_owner<'a>(
        &'a self,
        access_token_hash: &'a [u8],
        now: DateTime<Utc>,
    ) -> StoreFuture<'a, Option<Uuid>> {
        Box::pin(async move {
            Ok(self
                .lock()
                .owner_sessions
                .get(access_token_hash)
                .filter(|session| session.expires_at > now)
                .map(|session| session.owner_id))
        })
    }
}

fn compare_rows(left: &PortfolioRow, right: &PortfolioRow, order_by: OrderBy) -> Ordering {
    let left = left.get(order_by.column).filter(|value| !value.is_null());
    let right = right.get(order_by.column).filter(|value| !value.is_null());

    match (left, right) {
        (Some(left), Some(right)) => {
            let ordering = compare_values(left, right);
            match order_by.direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare_values(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Number(left), Value::Number(right)) => left
            .as_f64()
            .partial_cmp(&right.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(left), Value::String(right)) => left.cmp(right),
        (Value::Bool(left), Value::Bool(right)) => left.cmp(right),
        _ => left.to_string().cmp(&right.to_string()),
    }
}
