//! The request-time authentication gate.
//!
//! Validates the access/refresh token pair presented by an inbound request
//! and decides: reject, admit, or admit with a silently rotated access token.
//! Per request this performs at most one in-process cryptographic
//! verification and at most one round trip to the revocation ledger; the
//! session store is only touched with an advisory last-seen update after a
//! rotation.
//!
//! The refresh token is never rotated here. Renewing it on every silent
//! rotation would let two concurrent requests, both holding the same stale
//! access token, invalidate each other's refresh token; it only dies at
//! logout or its natural expiry.

use std::sync::Arc;

use axum::{
    Json,
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Serialize;
use uuid::Uuid;

use crate::core::auth::jwt::{JwtError, JwtService, TokenKind};
use crate::core::auth::stores::{RevocationLedger, SessionStore, TokenDiagnosis};

/// Cookie carrying the access token
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Cookie carrying the refresh token
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

/// Response header carrying a freshly rotated access token, for clients that
/// read the header instead of the cookie
pub const NEW_ACCESS_TOKEN_HEADER: &str = "x-new-access-token";

/// Identity attached to an admitted request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub user_id: Uuid,
    pub session_id: Uuid,
}

/// Outcome of a successful gate pass
#[derive(Debug, Clone)]
pub struct Admission {
    pub identity: Identity,
    /// Freshly minted access token when the presented one had expired
    pub rotated: Option<String>,
}

/// Outward failure code, serialized into the rejection body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionCode {
    AuthRequired,
    InvalidToken,
    TokenExpired,
    TokenMismatch,
    RefreshTokenInvalid,
}

/// Terminal rejection of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rejection {
    pub code: RejectionCode,
    /// Whether the response should clear both token cookies
    pub clear_cookies: bool,
}

impl Rejection {
    pub fn auth_required() -> Self {
        Self {
            code: RejectionCode::AuthRequired,
            clear_cookies: false,
        }
    }

    pub fn invalid_token() -> Self {
        Self {
            code: RejectionCode::InvalidToken,
            clear_cookies: false,
        }
    }

    pub fn token_expired() -> Self {
        Self {
            code: RejectionCode::TokenExpired,
            clear_cookies: false,
        }
    }

    /// Session binding violation; treated as possible token theft
    pub fn token_mismatch() -> Self {
        Self {
            code: RejectionCode::TokenMismatch,
            clear_cookies: true,
        }
    }

    /// Refresh token dead; the client has to log in again
    pub fn refresh_invalid() -> Self {
        Self {
            code: RejectionCode::RefreshTokenInvalid,
            clear_cookies: true,
        }
    }

    /// 405 forces a full re-login; 401 means retryable after login
    pub fn status(&self) -> StatusCode {
        match self.code {
            RejectionCode::RefreshTokenInvalid => StatusCode::METHOD_NOT_ALLOWED,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    fn message(&self) -> &'static str {
        match self.code {
            RejectionCode::AuthRequired => "Authentication required",
            RejectionCode::InvalidToken => "Invalid token",
            RejectionCode::TokenExpired => "Token expired",
            RejectionCode::TokenMismatch => "Token pair mismatch",
            RejectionCode::RefreshTokenInvalid => "Refresh token invalid",
        }
    }
}

/// Rejection body sent to the client. Never carries ledger diagnostics.
#[derive(Debug, Serialize)]
struct RejectionBody {
    error: &'static str,
    code: RejectionCode,
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let body = RejectionBody {
            error: self.message(),
            code: self.code,
        };

        let mut response = (self.status(), Json(body)).into_response();

        if self.clear_cookies {
            for name in [ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE] {
                if let Ok(value) = HeaderValue::from_str(&removal_cookie(name).to_string()) {
                    response.headers_mut().append(header::SET_COOKIE, value);
                }
            }
        }

        response
    }
}

/// A cookie that deletes the named token cookie on the client
pub fn removal_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, ""))
        .path("/")
        .http_only(true)
        .max_age(time::Duration::ZERO)
        .build()
}

/// The gate itself: token issuer plus the two store handles it consults.
///
/// Constructed once at startup and cloned into the router; holds no mutable
/// state of its own.
#[derive(Clone)]
pub struct AuthGate {
    jwt: JwtService,
    ledger: Arc<dyn RevocationLedger>,
    sessions: Arc<dyn SessionStore>,
    cookie_secure: bool,
}

impl AuthGate {
    /// Create a new gate
    pub fn new(
        jwt: JwtService,
        ledger: Arc<dyn RevocationLedger>,
        sessions: Arc<dyn SessionStore>,
        cookie_secure: bool,
    ) -> Self {
        Self {
            jwt,
            ledger,
            sessions,
            cookie_secure,
        }
    }

    /// Cookie for a (possibly rotated) access token
    pub fn access_cookie(&self, token: &str) -> Cookie<'static> {
        Cookie::build((ACCESS_TOKEN_COOKIE, token.to_string()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.cookie_secure)
            .max_age(time::Duration::minutes(
                self.jwt.access_token_expiration_minutes(),
            ))
            .build()
    }

    /// Cookie for a refresh token, Max-Age matching its TTL
    pub fn refresh_cookie(&self, token: &str) -> Cookie<'static> {
        Cookie::build((REFRESH_TOKEN_COOKIE, token.to_string()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.cookie_secure)
            .max_age(time::Duration::days(
                self.jwt.refresh_token_expiration_days(),
            ))
            .build()
    }

    /// Decide what to do with the token pair presented by a request.
    ///
    /// A request with no access token performs zero store calls. A refresh
    /// token alone is not enough: the pairing check needs the access token's
    /// session claim, so the gate refuses rather than weaken that binding.
    pub async fn authenticate(
        &self,
        access: Option<&str>,
        refresh: Option<&str>,
    ) -> Result<Admission, Rejection> {
        let Some(access) = access else {
            return Err(Rejection::auth_required());
        };

        match self.jwt.verify_kind(access, TokenKind::Access) {
            Ok(claims) => {
                let identity = Identity {
                    user_id: claims.user_id().map_err(|_| Rejection::invalid_token())?,
                    session_id: claims.session_id().map_err(|_| Rejection::invalid_token())?,
                };
                Ok(Admission {
                    identity,
                    rotated: None,
                })
            }
            // Only expiry is recoverable; a bad signature or a refresh token
            // smuggled into the access slot never reaches the refresh path
            Err(JwtError::Expired) => self.rotate(access, refresh).await,
            Err(_) => Err(Rejection::invalid_token()),
        }
    }

    /// The silent-rotation arm: access token expired, try the refresh token.
    async fn rotate(&self, access: &str, refresh: Option<&str>) -> Result<Admission, Rejection> {
        let Some(refresh) = refresh else {
            return Err(Rejection::token_expired());
        };

        // The expired access token's claims carry the session the pair must
        // agree on; signature, issuer, and kind are still enforced
        let access_claims = self
            .jwt
            .verify_ignoring_expiry(access)
            .map_err(|_| Rejection::invalid_token())?;

        if access_claims.token_type != TokenKind::Access {
            return Err(Rejection::invalid_token());
        }

        let refresh_claims = match self.jwt.verify_kind(refresh, TokenKind::Refresh) {
            Ok(claims) => claims,
            Err(err) => {
                tracing::warn!(error = %err, "refresh token failed verification");
                return Err(Rejection::refresh_invalid());
            }
        };

        if access_claims.sid != refresh_claims.sid {
            tracing::warn!(
                access_session = %access_claims.sid,
                refresh_session = %refresh_claims.sid,
                "token pair carries different sessions"
            );
            return Err(Rejection::token_mismatch());
        }

        let user_id = refresh_claims
            .user_id()
            .map_err(|_| Rejection::refresh_invalid())?;
        let session_id = refresh_claims
            .session_id()
            .map_err(|_| Rejection::refresh_invalid())?;

        // Single ledger round trip; an unreachable store fails closed
        let record = match self.ledger.find(refresh).await {
            Ok(record) => record,
            Err(err) => {
                tracing::error!(error = %err, "revocation ledger unavailable, failing closed");
                return Err(Rejection::auth_required());
            }
        };

        let diagnosis = TokenDiagnosis::classify(record.as_ref(), user_id, session_id);
        if !diagnosis.is_active() {
            tracing::warn!(
                %user_id,
                %session_id,
                diagnosis = %diagnosis,
                "refresh token rejected by ledger"
            );
            return Err(Rejection::refresh_invalid());
        }

        let (token, _) = self
            .jwt
            .mint(TokenKind::Access, user_id, session_id)
            .map_err(|err| {
                tracing::error!(error = %err, "failed to mint rotated access token");
                Rejection::auth_required()
            })?;

        // Advisory activity-window write; a failure never undoes the admission
        if let Err(err) = self.sessions.record_activity(session_id).await {
            tracing::warn!(error = %err, %session_id, "failed to record session activity");
        }

        tracing::debug!(%user_id, %session_id, "access token silently rotated");

        Ok(Admission {
            identity: Identity {
                user_id,
                session_id,
            },
            rotated: Some(token),
        })
    }
}

/// Extract the access token from an Authorization: Bearer header
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let auth_header = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = auth_header.strip_prefix("Bearer ")?.trim();

    if token.is_empty() {
        return None;
    }

    Some(token.to_string())
}

/// Middleware guarding downstream handlers.
///
/// Access token comes from the Authorization header (preferred) or the
/// `access_token` cookie; the refresh token only ever travels in its cookie.
/// On admission the request gains an [`Identity`] extension; on rotation the
/// response gains a refreshed cookie and the `X-New-Access-Token` header.
pub async fn require_auth(
    State(gate): State<AuthGate>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let access = bearer_token(request.headers())
        .or_else(|| jar.get(ACCESS_TOKEN_COOKIE).map(|c| c.value().to_string()));
    let refresh = jar.get(REFRESH_TOKEN_COOKIE).map(|c| c.value().to_string());

    match gate.authenticate(access.as_deref(), refresh.as_deref()).await {
        Ok(admission) => {
            request.extensions_mut().insert(admission.identity);

            let mut response = next.run(request).await;

            if let Some(token) = admission.rotated {
                let cookie = gate.access_cookie(&token);
                if let Ok(value) = HeaderValue::from_str(&cookie.to_string()) {
                    response.headers_mut().append(header::SET_COOKIE, value);
                }
                if let Ok(value) = HeaderValue::from_str(&token) {
                    response
                        .headers_mut()
                        .insert(HeaderName::from_static(NEW_ACCESS_TOKEN_HEADER), value);
                }
            }

            response
        }
        Err(rejection) => rejection.into_response(),
    }
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = Rejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .copied()
            .ok_or_else(Rejection::auth_required)
    }
}
