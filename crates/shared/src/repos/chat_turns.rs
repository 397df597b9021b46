use sqlx::Row;
use sqlx::postgres::PgRow;

use crate::models::{CategoryLabel, ChatTurn, NewChatTurn};

use super::{Store, StoreError, StoreFuture, TurnStore};

impl Store {
    pub async fn insert_chat_turn(&self, turn: &NewChatTurn) -> Result<ChatTurn, StoreError> {
        let row = sqlx::query(
            "INSERT INTO chat_messages (session_id, message, is_user, category)
             VALUES ($1, $2, $3, $4)
             RETURNING id, session_id, message, is_user, category, created_at",
        )
        .bind(&turn.session_id)
        .bind(&turn.message)
        .bind(turn.is_user)
        .bind(turn.category.as_str())
        .fetch_one(&self.pool)
        .await?;

        chat_turn_from_row(&row)
    }

    pub async fn list_chat_turns(
        &self,
        session_id: &str,
        limit: i64,
    ) -> Result<Vec<ChatTurn>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, session_id, message, is_user, category, created_at
             FROM chat_messages
             WHERE session_id = $1
             ORDER BY created_at ASC, seq ASC
             LIMIT $2",
        )
        .bind(session_id)
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(chat_turn_from_row).collect()
    }

    /// Last `limit` turns of the session, returned oldest first.
    pub async fn list_recent_chat_turns(
        &self,
        session_id: &str,
        limit: i64,
    ) -> Result<Vec<ChatTurn>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, session_id, message, is_user, category, created_at
             FROM (
                 SELECT seq, id, session_id, message, is_user, category, created_at
                 FROM chat_messages
                 WHERE session_id = $1
                 ORDER BY created_at DESC, seq DESC
                 LIMIT $2
             ) recent
             ORDER BY created_at ASC, seq ASC",
        )
        .bind(session_id)
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(chat_turn_from_row).collect()
    }

    pub async fn delete_chat_session(&self, session_id: &str) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM chat_messages WHERE session_id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

impl TurnStore for Store {
    fn append_turn<'a>(&'a self, turn: NewChatTurn) -> StoreFuture<'a, ChatTurn> {
        Box::pin(async move { self.insert_chat_turn(&turn).await })
    }

    fn list_turns<'a>(
        &'a self,
        session_id: &'a str,
        limit: i64,
    ) -> StoreFuture<'a, Vec<ChatTurn>> {
        Box::pin(self.list_chat_turns(session_id, limit))
    }

    fn recent_turns<'a>(
        &'a self,
        session_id: &'a str,
        limit: i64,
    ) -> StoreFuture<'a, Vec<ChatTurn>> {
        Box::pin(self.list_recent_chat_turns(session_id, limit))
    }

    fn purge_session<'a>(&'a self, session_id: &'a str) -> StoreFuture<'a, u64> {
        Box::pin(self.delete_chat_session(session_id))
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(Store::ping(self))
    }
}

fn chat_turn_from_row(row: &PgRow) -> Result<ChatTurn, StoreError> {
    let category_raw: String = row.try_get("category")?;
    let category = CategoryLabel::parse(&category_raw).ok_or_else(|| {
        StoreError::InvalidData(format!("unknown chat category persisted: {category_raw}"))
    })?;

    Ok(ChatTurn {
        id: row.try_get("id")?,
        session_id: row.try_get("session_id")?,
        message: row.try_get("message")?,
        is_user: row.try_get("is_user")?,
        category,
        created_at: row.try_get("created_at")?,
    })
}
