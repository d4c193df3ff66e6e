//! Auth API endpoints
//!
//! REST surface for the session lifecycle:
//! - POST /api/auth/login - Verify credentials and issue a token pair
//! - POST /api/auth/logout - Revoke the refresh token and close the session
//! - GET /api/auth/me - Identity of the authenticated request (gate-guarded)
//!
//! Every other route in the product mounts behind the same [`require_auth`]
//! middleware; `/me` stands in for them here.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;
use uuid::Uuid;

use crate::core::auth::gate::{
    ACCESS_TOKEN_COOKIE, AuthGate, Identity, REFRESH_TOKEN_COOKIE, removal_cookie, require_auth,
};
use crate::core::auth::jwt::TokenPair;
use crate::core::auth::service::{AuthError, AuthService, ClientMeta, LoginRequest};

/// Shared state for the auth API
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub gate: AuthGate,
}

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
}

impl ApiError {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }
}

/// Convert AuthError to API response
impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "INVALID_TOKEN"),
            AuthError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        // Internal detail stays in the log, not in the response
        let message = match &self {
            AuthError::Internal(detail) => {
                tracing::error!(detail = %detail, "auth operation failed");
                "Internal error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ApiError::new(message, code))).into_response()
    }
}

/// Response for a successful login
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub tokens: TokenPair,
}

/// Response for logout
#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub message: String,
}

/// Create the auth API router
pub fn auth_api_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/auth/me", get(me_handler))
        .layer(middleware::from_fn_with_state(
            state.gate.clone(),
            require_auth,
        ));

    Router::new()
        .route("/api/auth/login", post(login_handler))
        .route("/api/auth/logout", post(logout_handler))
        .merge(protected)
        .with_state(Arc::new(state))
}

/// Client metadata recorded on the session row
fn client_meta(headers: &HeaderMap) -> ClientMeta {
    let ip_address = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string());

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    ClientMeta {
        ip_address,
        user_agent,
    }
}

/// POST /api/auth/login
/// Verify credentials and hand out an access/refresh pair
async fn login_handler(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), AuthError> {
    tracing::info!("Login attempt for email: {}", request.email);

    let client = client_meta(&headers);
    let outcome = state.auth.login(request, client).await?;

    let jar = jar
        .add(state.gate.access_cookie(&outcome.tokens.access_token))
        .add(state.gate.refresh_cookie(&outcome.tokens.refresh_token));

    Ok((
        jar,
        Json(LoginResponse {
            user_id: outcome.user_id,
            tokens: outcome.tokens,
        }),
    ))
}

/// POST /api/auth/logout
/// Revoke the refresh token, deactivate its session, clear both cookies
async fn logout_handler(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<LogoutResponse>), AuthError> {
    if let Some(cookie) = jar.get(REFRESH_TOKEN_COOKIE) {
        match state.auth.logout(cookie.value()).await {
            Ok(()) => {}
            // A dead or garbled token still gets its cookies cleared
            Err(AuthError::InvalidToken) => {
                tracing::debug!("logout presented an invalid refresh token");
            }
            Err(err) => return Err(err),
        }
    }

    let jar = jar
        .add(removal_cookie(ACCESS_TOKEN_COOKIE))
        .add(removal_cookie(REFRESH_TOKEN_COOKIE));

    Ok((
        jar,
        Json(LogoutResponse {
            message: "Logged out successfully".to_string(),
        }),
    ))
}

/// GET /api/auth/me
/// Identity attached by the gate; the template for downstream handlers
async fn me_handler(identity: Identity) -> Json<Identity> {
    Json(identity)
}
