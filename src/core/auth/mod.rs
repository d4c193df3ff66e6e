//! Authentication core
//!
//! The dual-token session mechanism:
//! - JWT minting and verification (access + refresh pairs)
//! - The request-time gate: admit, reject, or silently rotate
//! - Login/logout orchestration over the credential, session, and
//!   revocation stores
//! - REST API endpoints for the session lifecycle

pub mod api;
pub mod gate;
pub mod jwt;
pub mod service;
pub mod stores;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{AppState, auth_api_router};
pub use gate::{Admission, AuthGate, Identity, Rejection, RejectionCode, require_auth};
pub use jwt::{Claims, JwtConfig, JwtError, JwtService, TokenKind, TokenPair};
pub use service::{AuthError, AuthService, ClientMeta, LoginRequest};
pub use stores::{
    CredentialStore, RevocationLedger, SessionStore, StoreError, TokenDiagnosis, VerifiedUser,
};
