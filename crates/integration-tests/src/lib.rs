//! Integration tests for Parcelflow.
//!
//! Each test spawns the real router on an ephemeral port, backed by an
//! in-memory `SQLite` database with migrations applied, and drives it over
//! HTTP with `reqwest`.
//!
//! # Test Files
//!
//! - `tests/auth_flow.rs` - Registration, login, token resolution
//! - `tests/shipments_api.rs` - Shipment lifecycle and authorization
//! - `tests/rate_limit.rs` - Admission control at the HTTP boundary

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::missing_panics_doc)]

use std::net::SocketAddr;

use secrecy::SecretString;
use sqlx::sqlite::SqlitePoolOptions;

use parcelflow_server::config::ServerConfig;
use parcelflow_server::state::AppState;
use parcelflow_server::{db, routes};

/// A server instance bound to an ephemeral port for one test.
pub struct TestServer {
    pub base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Spawn a server with a rate limit high enough to never interfere.
    pub async fn spawn() -> Self {
        Self::spawn_with_rate_limit(10_000, 60).await
    }

    /// Spawn a server with an explicit rate limit, for admission tests.
    pub async fn spawn_with_rate_limit(rate_limit: usize, rate_window_secs: u64) -> Self {
        // A single connection keeps every query on the same in-memory
        // database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("failed to open in-memory database");
        db::MIGRATOR
            .run(&pool)
            .await
            .expect("failed to run migrations");

        let config = ServerConfig {
            database_url: SecretString::from("sqlite::memory:"),
            host: "127.0.0.1".parse().expect("valid address"),
            port: 0,
            token_secret: SecretString::from("integration-signing-key-0123456789abcdef"),
            token_ttl_minutes: 30,
            rate_limit,
            rate_window_secs,
        };

        let state = AppState::new(config, pool);
        let app = routes::app(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().expect("listener has an address");
        let base_url = format!("http://{addr}");

        let handle = tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("server error");
        });

        Self { base_url, handle }
    }

    /// Absolute URL for a path on this server.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Register a user and return its ID.
pub async fn register_user(
    client: &reqwest::Client,
    server: &TestServer,
    username: &str,
    password: &str,
    role: &str,
) -> i64 {
    let res = client
        .post(server.url("/users/"))
        .json(&serde_json::json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": password,
            "role": role,
        }))
        .send()
        .await
        .expect("register request failed");
    assert_eq!(res.status(), reqwest::StatusCode::CREATED);

    let body: serde_json::Value = res.json().await.expect("register response not json");
    body["id"].as_i64().expect("register response has id")
}

/// Log a user in and return the bearer token.
pub async fn login(
    client: &reqwest::Client,
    server: &TestServer,
    username: &str,
    password: &str,
) -> String {
    let res = client
        .post(server.url("/token"))
        .form(&[("username", username), ("password", password)])
        .send()
        .await
        .expect("login request failed");
    assert_eq!(res.status(), reqwest::StatusCode::OK);

    let body: serde_json::Value = res.json().await.expect("login response not json");
    assert_eq!(body["token_type"], "bearer");
    body["access_token"]
        .as_str()
        .expect("login response has access_token")
        .to_owned()
}
