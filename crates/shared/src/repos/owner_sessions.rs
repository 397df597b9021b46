use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{OwnerDirectory, Store, StoreError, StoreFuture};

impl Store {
    pub async fn resolve_owner_session(
        &self,
        access_token_hash: &[u8],
        now: DateTime<Utc>,
    ) -> Result<Option<Uuid>, StoreError> {
        let owner_id = sqlx::query_scalar(
            "SELECT owner_id
             FROM owner_sessions
             WHERE access_token_hash = $1
               AND revoked_at IS NULL
               AND expires_at > $2",
        )
        .bind(access_token_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(owner_id)
    }

    pub async fn create_owner_session(
        &self,
        owner_id: Uuid,
        access_token_hash: &[u8],
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO owner_sessions (owner_id, access_token_hash, expires_at)
             VALUES ($1, $2, $3)",
        )
        .bind(owner_id)
        .bind(access_token_hash)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

impl OwnerDirectory for Store {
    fn resolve_owner<'a>(
        &'a self,
        access_token_hash: &'a [u8],
        now: DateTime<Utc>,
    ) -> StoreFuture<'a, Option<Uuid>> {
        Box::pin(self.resolve_owner_session(access_token_hash, now))
    }
}
