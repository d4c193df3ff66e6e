//! Capability interfaces the auth core is composed from.
//!
//! Three narrow, one-directional seams: `CredentialStore` (email+password
//! verification), `SessionStore` (login session lifecycle), and
//! `RevocationLedger` (refresh token persistence and terminal revocation).
//! The gate and the auth service hold `Arc<dyn …>` handles constructed once
//! at startup; the implementations never reference each other.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::core::db::models::RefreshTokenRecord;

/// Infrastructure failure talking to a persistent store.
///
/// Always treated as fail-closed by callers: a request is rejected as
/// unauthenticated, never silently admitted.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// Outcome of a credential check: who logged in and whether the account is
/// still usable.
#[derive(Debug, Clone, Copy)]
pub struct VerifiedUser {
    pub user_id: Uuid,
    pub is_active: bool,
}

/// Hash a token value with SHA-256 for storage and lookup.
///
/// Raw refresh tokens never touch the database; every ledger operation works
/// on this digest.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Email + password verification, owned by the user subsystem.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Check credentials; `None` when the email is unknown or the password is
    /// wrong. The caller decides what to do with an inactive account.
    async fn verify(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<VerifiedUser>, StoreError>;
}

/// Persistent record of login sessions.
///
/// Written at login and logout and otherwise left alone; no session is ever
/// looked up to authorize a request, the session identity arrives validated
/// inside a token.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert an active session row, returning its id.
    async fn create(
        &self,
        user_id: Uuid,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<Uuid, StoreError>;

    /// Mark the session inactive and record the logout time. Idempotent.
    async fn deactivate(&self, session_id: Uuid) -> Result<(), StoreError>;

    /// Update the session's last-seen timestamp. Advisory; callers log a
    /// failure instead of propagating it.
    async fn record_activity(&self, session_id: Uuid) -> Result<(), StoreError>;
}

/// Persistent record of issued refresh tokens; the source of truth for
/// whether a refresh token is still usable.
#[async_trait]
pub trait RevocationLedger: Send + Sync {
    /// Store a new refresh token record.
    async fn persist(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        token_value: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Look up the record for a token value.
    async fn find(&self, token_value: &str) -> Result<Option<RefreshTokenRecord>, StoreError>;

    /// Set `revoked_at = now()` only where it is still unset; returns whether
    /// a row actually changed. Revocation is terminal: this conditional write
    /// is the atomicity boundary between a logout and an in-flight rotation
    /// using the same token.
    async fn revoke(&self, token_value: &str) -> Result<bool, StoreError>;

    /// Classify a token's ledger state for audit logging. Never echoed to
    /// clients.
    async fn diagnose(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        token_value: &str,
    ) -> Result<TokenDiagnosis, StoreError> {
        let record = self.find(token_value).await?;
        Ok(TokenDiagnosis::classify(
            record.as_ref(),
            user_id,
            session_id,
        ))
    }
}

/// Ledger-side state of a refresh token, for audit logs only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenDiagnosis {
    NotFound,
    Revoked,
    ExpiredInDb,
    Mismatch,
    Active,
}

impl TokenDiagnosis {
    /// Classify a looked-up record against the identity that presented it.
    ///
    /// Revoked dominates every other state a stored row can be in: once
    /// `revoked_at` is set, validations of that token value report `revoked`
    /// permanently.
    pub fn classify(
        record: Option<&RefreshTokenRecord>,
        user_id: Uuid,
        session_id: Uuid,
    ) -> Self {
        let Some(record) = record else {
            return TokenDiagnosis::NotFound;
        };

        if record.revoked_at.is_some() {
            return TokenDiagnosis::Revoked;
        }

        if record.expires_at <= Utc::now() {
            return TokenDiagnosis::ExpiredInDb;
        }

        if record.user_id != user_id || record.session_id != session_id {
            return TokenDiagnosis::Mismatch;
        }

        TokenDiagnosis::Active
    }

    /// Whether this state admits a rotation.
    pub fn is_active(&self) -> bool {
        matches!(self, TokenDiagnosis::Active)
    }
}

impl std::fmt::Display for TokenDiagnosis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TokenDiagnosis::NotFound => "not_found",
            TokenDiagnosis::Revoked => "revoked",
            TokenDiagnosis::ExpiredInDb => "expired_in_db",
            TokenDiagnosis::Mismatch => "mismatch",
            TokenDiagnosis::Active => "active",
        };
        write!(f, "{s}")
    }
}
