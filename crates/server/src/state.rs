//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as TokenTtl;
use secrecy::ExposeSecret;
use sqlx::SqlitePool;

use crate::config::ServerConfig;
use crate::middleware::RateLimiter;
use crate::services::TokenService;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Owns the single [`RateLimiter`] instance
/// the request path runs through and the [`TokenService`] holding the
/// signing secret.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: SqlitePool,
    tokens: TokenService,
    rate_limiter: RateLimiter,
}

impl AppState {
    /// Create a new application state from configuration and a database
    /// pool.
    #[must_use]
    pub fn new(config: ServerConfig, pool: SqlitePool) -> Self {
        let tokens = TokenService::new(
            config.token_secret.expose_secret().as_bytes(),
            TokenTtl::minutes(config.token_ttl_minutes),
        );
        let rate_limiter = RateLimiter::new(
            config.rate_limit,
            Duration::from_secs(config.rate_window_secs),
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                tokens,
                rate_limiter,
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.inner.pool
    }

    /// Get a reference to the token service.
    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.inner.tokens
    }

    /// Get a reference to the request rate limiter.
    #[must_use]
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.inner.rate_limiter
    }
}
