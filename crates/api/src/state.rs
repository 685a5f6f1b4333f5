//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ApiConfig;
use crate::midtrans::{GatewayError, MidtransClient};
use crate::services::OrderService;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: PgPool,
    midtrans: MidtransClient,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the gateway client fails to build.
    pub fn new(config: ApiConfig, pool: PgPool) -> Result<Self, GatewayError> {
        let midtrans = MidtransClient::new(&config.midtrans, &config.frontend_base_url)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                midtrans,
            }),
        })
    }

    /// Get a reference to the service configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the Midtrans Snap client.
    #[must_use]
    pub fn midtrans(&self) -> &MidtransClient {
        &self.inner.midtrans
    }

    /// Build the order lifecycle service over this state.
    #[must_use]
    pub fn orders(&self) -> OrderService {
        OrderService::new(self.clone())
    }
}
