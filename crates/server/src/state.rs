//! Shared application state.

use std::sync::Arc;

use chrono::Duration;
use sqlx::SqlitePool;

use crate::config::ServerConfig;
use crate::services::auth::TokenService;

/// Application state shared across all request handlers.
///
/// Cheap to clone; all fields live behind one `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: SqlitePool,
    tokens: TokenService,
}

impl AppState {
    /// Build the shared state from config and an established pool.
    #[must_use]
    pub fn new(config: ServerConfig, pool: SqlitePool) -> Self {
        let tokens = TokenService::new(&config.token_secret);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                tokens,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.inner.pool
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.inner.tokens
    }

    /// Lifetime of tokens issued by the login endpoint.
    #[must_use]
    pub fn login_token_ttl(&self) -> Duration {
        Duration::minutes(self.inner.config.token_ttl_minutes)
    }
}
