//! Application configuration from environment variables.
//!
//! Load configuration using `Config::from_env()` after calling
//! `dotenvy::dotenv()`. Missing required values (`JWT_SECRET`,
//! `DATABASE_URL`) are startup errors; nothing here is re-read per request.

use crate::core::auth::jwt::{JwtConfig, JwtError};
use crate::core::db::pool::{DbConfig, DbError};

/// Default bind address for the HTTP server
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Jwt(#[from] JwtError),

    #[error(transparent)]
    Db(#[from] DbError),
}

/// Application configuration loaded from environment variables.
#[derive(Clone)]
pub struct Config {
    /// Address the HTTP server binds to (BIND_ADDR)
    pub bind_addr: String,
    /// Whether token cookies carry the Secure attribute (COOKIE_SECURE);
    /// defaults to on, switch off only for plain-HTTP local development
    pub cookie_secure: bool,
    /// Database pool configuration (DATABASE_URL)
    pub db: DbConfig,
    /// Token signing configuration (JWT_SECRET and friends)
    pub jwt: JwtConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_addr =
            std::env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());

        let cookie_secure = std::env::var("COOKIE_SECURE")
            .map(|v| !matches!(v.as_str(), "false" | "0" | "no"))
            .unwrap_or(true);

        Ok(Self {
            bind_addr,
            cookie_secure,
            db: DbConfig::from_env()?,
            jwt: JwtConfig::from_env()?,
        })
    }
}
