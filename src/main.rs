use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use lexdraft::core::auth::{
    AppState, AuthGate, AuthService, JwtService, RevocationLedger, SessionStore, auth_api_router,
};
use lexdraft::core::config::Config;
use lexdraft::core::db::{create_pool_with_migrations, repositories};

#[tokio::main]
async fn main() {
    // Load .env file (if exists)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Required configuration is loaded exactly once; a missing JWT_SECRET or
    // DATABASE_URL stops the process here
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "invalid configuration");
            std::process::exit(1);
        }
    };

    let pool = match create_pool_with_migrations(&config.db).await {
        Ok(pool) => pool,
        Err(err) => {
            tracing::error!(error = %err, "failed to set up database");
            std::process::exit(1);
        }
    };

    let jwt = JwtService::new(config.jwt.clone());
    let credentials = Arc::new(repositories::PgCredentialStore::new(pool.clone()));
    let sessions: Arc<dyn SessionStore> = Arc::new(repositories::PgSessionStore::new(pool.clone()));
    let ledger: Arc<dyn RevocationLedger> =
        Arc::new(repositories::PgRevocationLedger::new(pool.clone()));

    let gate = AuthGate::new(
        jwt.clone(),
        ledger.clone(),
        sessions.clone(),
        config.cookie_secure,
    );
    let auth = AuthService::new(credentials, sessions, ledger, jwt);

    // The web UI talks to this API cross-origin with cookies; origins are
    // mirrored, tighten the allowlist at the reverse proxy
    let app = auth_api_router(AppState { auth, gate })
        .layer(CorsLayer::very_permissive())
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("failed to bind server address");

    tracing::info!("listening on http://{}", config.bind_addr);

    axum::serve(listener, app.into_make_service())
        .await
        .expect("server error");
}
