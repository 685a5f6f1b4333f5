//! HTTP route handlers.

use axum::Router;

use crate::state::AppState;

pub mod transactions;

/// Build the full application router (without middleware layers).
pub fn routes() -> Router<AppState> {
    Router::new().nest("/v1/transactions", transactions::routes())
}
