//! Session repository.
//!
//! Sessions are written at login and logout and otherwise left alone; no
//! request is authorized by a session lookup. Rows are never deleted, the
//! table is the login audit trail.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::auth::stores::{SessionStore, StoreError};
use crate::core::db::models::Session;

/// Postgres-backed session store.
#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    /// Create a new session store
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a session by ID (audit tooling)
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Session>, StoreError> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            SELECT id, user_id, ip_address, user_agent, is_active,
                   login_at, logout_at, last_seen_at
            FROM sessions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn create(
        &self,
        user_id: Uuid,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<Uuid, StoreError> {
        let (session_id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO sessions (user_id, ip_address, user_agent, last_seen_at)
            VALUES ($1, $2, $3, NOW())
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(ip_address)
        .bind(user_agent)
        .fetch_one(&self.pool)
        .await?;

        Ok(session_id)
    }

    async fn deactivate(&self, session_id: Uuid) -> Result<(), StoreError> {
        // Conditional on is_active so logout_at is written once; repeating the
        // call is a no-op
        sqlx::query(
            r#"
            UPDATE sessions
            SET is_active = FALSE, logout_at = NOW()
            WHERE id = $1 AND is_active
            "#,
        )
        .bind(session_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn record_activity(&self, session_id: Uuid) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE sessions
            SET last_seen_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(session_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
