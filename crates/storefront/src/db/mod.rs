//! Database operations for storefront `PostgreSQL`.
//!
//! # Database: `saltfern_storefront`
//!
//! The backend owns all commerce data; this database stores session state
//! only:
//!
//! ## Tables
//!
//! - `sessions` - Tower-sessions storage (guest cart/wishlist records and
//!   customer tokens live inside session records)
//!
//! # Migrations
//!
//! The sessions table is created on startup via
//! `tower_sessions_sqlx_store::PostgresStore::migrate`.

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
