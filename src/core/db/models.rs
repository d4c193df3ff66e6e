//! Database models for the auth core.
//!
//! Entity structs mapping to the PostgreSQL tables created by `migrations/`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ============================================================================
// Credential Model
// ============================================================================

/// Credential row backing email+password verification.
///
/// Only what the auth core needs; user profile data lives elsewhere.
#[derive(Debug, Clone, FromRow)]
pub struct Credential {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Session Model
// ============================================================================

/// Login session entity. Created on login, deactivated on logout, never
/// deleted (audit trail).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub is_active: bool,
    pub login_at: DateTime<Utc>,
    pub logout_at: Option<DateTime<Utc>>,
    pub last_seen_at: Option<DateTime<Utc>>,
}

// ============================================================================
// Refresh Token Model
// ============================================================================

/// Ledger row for an issued refresh token.
///
/// `token_hash` is the SHA-256 hex digest of the token value. `revoked_at` is
/// set exactly once and never cleared.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RefreshTokenRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl RefreshTokenRecord {
    /// Whether revocation has been applied.
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    /// Whether the token's natural lifetime has elapsed.
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    /// Usable for rotation: present, unrevoked, unexpired.
    pub fn is_usable(&self) -> bool {
        !self.is_revoked() && !self.is_expired()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn base_record() -> RefreshTokenRecord {
        RefreshTokenRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            token_hash: "ab".repeat(32),
            expires_at: Utc::now() + Duration::days(7),
            revoked_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_fresh_record_is_usable() {
        let rec = base_record();
        assert!(!rec.is_revoked());
        assert!(!rec.is_expired());
        assert!(rec.is_usable());
    }

    #[test]
    fn test_revoked_record_is_not_usable() {
        let rec = RefreshTokenRecord {
            revoked_at: Some(Utc::now()),
            ..base_record()
        };
        assert!(rec.is_revoked());
        assert!(!rec.is_usable());
    }

    #[test]
    fn test_expired_record_is_not_usable() {
        let rec = RefreshTokenRecord {
            expires_at: Utc::now() - Duration::seconds(1),
            ..base_record()
        };
        assert!(rec.is_expired());
        assert!(!rec.is_usable());
    }
}
