//! Credential verification against the users table.
//!
//! The auth core only consumes `CredentialStore::verify`; user registration
//! and profile management live in the user subsystem, not here.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::core::auth::stores::{CredentialStore, StoreError, VerifiedUser};
use crate::core::db::models::Credential;

/// Postgres-backed credential store with bcrypt password verification.
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    /// Create a new credential store
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Verify a password against a bcrypt hash
    pub fn verify_password(password: &str, hash: &str) -> Result<bool, StoreError> {
        bcrypt::verify(password, hash).map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Credential>, StoreError> {
        let credential = sqlx::query_as::<_, Credential>(
            r#"
            SELECT id, email, password_hash, is_active, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(credential)
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn verify(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<VerifiedUser>, StoreError> {
        let Some(credential) = self.find_by_email(email).await? else {
            return Ok(None);
        };

        if !Self::verify_password(password, &credential.password_hash)? {
            return Ok(None);
        }

        Ok(Some(VerifiedUser {
            user_id: credential.id,
            is_active: credential.is_active,
        }))
    }
}
