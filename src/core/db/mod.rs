//! Database layer: connection pool, entity models, repositories.

pub mod models;
pub mod pool;
pub mod repositories;

pub use pool::{DbConfig, DbError, create_pool, create_pool_with_migrations, health_check};
