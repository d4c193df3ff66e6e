//! Login and logout orchestration.
//!
//! Coordinates the credential store, the session store, the revocation
//! ledger, and the token issuer. Everything request-time (validation,
//! rotation) lives in the gate; this service only runs at the session
//! boundaries.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::core::auth::jwt::{JwtError, JwtService, TokenKind, TokenPair};
use crate::core::auth::stores::{CredentialStore, RevocationLedger, SessionStore, StoreError};

/// Authentication service error types
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::SignatureInvalid | JwtError::Expired | JwtError::WrongKind => {
                AuthError::InvalidToken
            }
            _ => AuthError::Internal(err.to_string()),
        }
    }
}

/// Login request data
#[derive(Debug, Clone, serde::Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request metadata recorded on the session row
#[derive(Debug, Clone, Default)]
pub struct ClientMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Successful login: who logged in, the session, and the minted pair
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub tokens: TokenPair,
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    credentials: Arc<dyn CredentialStore>,
    sessions: Arc<dyn SessionStore>,
    ledger: Arc<dyn RevocationLedger>,
    jwt: JwtService,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        sessions: Arc<dyn SessionStore>,
        ledger: Arc<dyn RevocationLedger>,
        jwt: JwtService,
    ) -> Self {
        Self {
            credentials,
            sessions,
            ledger,
            jwt,
        }
    }

    /// Log a user in: verify credentials, open a session, mint a token pair
    /// bound to it, and persist the refresh token in the ledger.
    ///
    /// Unknown email, wrong password, and a deactivated account are
    /// indistinguishable from the outside.
    pub async fn login(
        &self,
        request: LoginRequest,
        client: ClientMeta,
    ) -> Result<LoginOutcome, AuthError> {
        let verified = self
            .credentials
            .verify(&request.email, &request.password)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verified.is_active {
            tracing::warn!(user_id = %verified.user_id, "login attempt on inactive account");
            return Err(AuthError::InvalidCredentials);
        }

        let session_id = self
            .sessions
            .create(
                verified.user_id,
                client.ip_address.as_deref(),
                client.user_agent.as_deref(),
            )
            .await?;

        let tokens = self.jwt.mint_pair(verified.user_id, session_id)?;

        let refresh_expires_at = DateTime::<Utc>::from_timestamp(tokens.refresh_expires_at, 0)
            .ok_or_else(|| AuthError::Internal("refresh expiry out of range".to_string()))?;

        self.ledger
            .persist(
                verified.user_id,
                session_id,
                &tokens.refresh_token,
                refresh_expires_at,
            )
            .await?;

        tracing::info!(user_id = %verified.user_id, %session_id, "user logged in");

        Ok(LoginOutcome {
            user_id: verified.user_id,
            session_id,
            tokens,
        })
    }

    /// Log out the session a refresh token belongs to: revoke the token in
    /// the ledger and deactivate the session. Idempotent.
    ///
    /// The claims are read ignoring expiry: a refresh token past its TTL must
    /// still be able to close its own session.
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        let claims = self.jwt.verify_ignoring_expiry(refresh_token)?;

        if claims.token_type != TokenKind::Refresh {
            return Err(AuthError::InvalidToken);
        }

        let session_id = claims.session_id()?;

        let revoked = self.ledger.revoke(refresh_token).await?;
        if !revoked {
            tracing::debug!(%session_id, "refresh token already revoked or unknown");
        }

        self.sessions.deactivate(session_id).await?;

        tracing::info!(%session_id, "session logged out");

        Ok(())
    }
}
