//! Database operations for the order service `PostgreSQL`.
//!
//! # Tables
//!
//! - `users` - shipping profile slice of the user directory
//! - `products` - read-only catalog lookup (title, image, pricing)
//! - `carts` / `cart_items` - one open cart per user, consumed at checkout
//! - `orders` / `order_items` - the aggregate this service owns
//!
//! # Migrations
//!
//! Migrations live in `crates/api/migrations/` and are embedded into the
//! binary; they run at startup before the listener binds.
//!
//! # Transactions
//!
//! Repositories never open transactions themselves. Methods that must be
//! atomic with other writes take a `&mut PgConnection`, and the service
//! layer owns the `begin`/`commit` bracket.

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

pub mod carts;
pub mod orders;
pub mod users;

pub use carts::CartRepository;
pub use orders::OrderRepository;
pub use users::UserRepository;

/// Errors returned by repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
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
