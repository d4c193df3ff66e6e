//! Refresh token ledger.
//!
//! Persists issued refresh tokens as SHA-256 digests and owns their terminal
//! revocation state. `revoke` is a single conditional UPDATE: the database,
//! not application code, arbitrates between a logout and an in-flight
//! rotation racing on the same token.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::auth::stores::{RevocationLedger, StoreError, hash_token};
use crate::core::db::models::RefreshTokenRecord;

/// Postgres-backed revocation ledger.
#[derive(Clone)]
pub struct PgRevocationLedger {
    pool: PgPool,
}

impl PgRevocationLedger {
    /// Create a new revocation ledger
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RevocationLedger for PgRevocationLedger {
    async fn persist(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        token_value: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let token_hash = hash_token(token_value);

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (user_id, session_id, token_hash, expires_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(user_id)
        .bind(session_id)
        .bind(&token_hash)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find(&self, token_value: &str) -> Result<Option<RefreshTokenRecord>, StoreError> {
        let token_hash = hash_token(token_value);

        let record = sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            SELECT id, user_id, session_id, token_hash, expires_at, revoked_at, created_at
            FROM refresh_tokens
            WHERE token_hash = $1
            "#,
        )
        .bind(&token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn revoke(&self, token_value: &str) -> Result<bool, StoreError> {
        let token_hash = hash_token(token_value);

        // revoked_at is written once; the IS NULL guard makes concurrent
        // revokes resolve to exactly one winner
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = NOW()
            WHERE token_hash = $1 AND revoked_at IS NULL
            "#,
        )
        .bind(&token_hash)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
