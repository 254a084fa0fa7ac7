//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                           - Liveness check
//! GET    /health/ready                     - Readiness check (pings the database)
//!
//! # Auth
//! POST   /token                            - Exchange credentials for a bearer token
//!
//! # Users
//! POST   /users/                           - Register an account
//! GET    /users/me                         - Current account (requires token)
//!
//! # Shipments
//! POST   /shipments/                       - Create a shipment
//! GET    /shipments/                       - List shipments (filters: status, priority, search, owner)
//! GET    /shipments/track/{tracking_number} - Public tracking lookup (no token)
//! GET    /shipments/{id}                   - Fetch one shipment
//! PATCH  /shipments/{id}                   - Update fields and/or status
//! DELETE /shipments/{id}                   - Delete a shipment
//! GET    /shipments/{id}/tracking          - Read the tracking ledger
//! POST   /shipments/{id}/tracking          - Append a tracking entry
//!
//! # Notifications
//! GET    /notifications/                   - Own notifications (filter: unread_only)
//! POST   /notifications/                   - Create a notification (staff)
//! PATCH  /notifications/{id}/read          - Mark one read (recipient only)
//!
//! # Administration
//! GET    /admin/users/                     - List accounts (admin)
//! PATCH  /admin/users/{id}/role            - Change an account's role (admin)
//! PATCH  /admin/users/{id}/status          - Toggle activation (admin)
//!
//! # Analytics
//! GET    /analytics/dashboard              - Operational dashboard (admin/manager)
//! ```
//!
//! All routes sit behind the rate limiter; everything except `/token`,
//! `POST /users/`, the public tracking lookup, and the health checks
//! requires a bearer token.

pub mod admin;
pub mod analytics;
pub mod auth;
pub mod notifications;
pub mod shipments;
pub mod users;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{
    Router,
    routing::{get, patch, post},
};
use tower_http::trace::TraceLayer;

use crate::middleware::rate_limit;
use crate::state::AppState;

/// Create the user routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/", post(users::register))
        .route("/users/me", get(users::me))
}

/// Create the shipment routes router.
pub fn shipment_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/shipments/",
            post(shipments::create).get(shipments::list),
        )
        .route(
            "/shipments/track/{tracking_number}",
            get(shipments::track),
        )
        .route(
            "/shipments/{id}",
            get(shipments::get_one)
                .patch(shipments::update_one)
                .delete(shipments::delete_one),
        )
        .route(
            "/shipments/{id}/tracking",
            get(shipments::tracking_list).post(shipments::tracking_append),
        )
}

/// Create the notification routes router.
pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/notifications/",
            get(notifications::list).post(notifications::create),
        )
        .route("/notifications/{id}/read", patch(notifications::mark_read))
}

/// Create the administration routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/users/", get(admin::list_users))
        .route("/admin/users/{id}/role", patch(admin::set_role))
        .route("/admin/users/{id}/status", patch(admin::toggle_status))
}

/// Create the analytics routes router.
pub fn analytics_routes() -> Router<AppState> {
    Router::new().route("/analytics/dashboard", get(analytics::dashboard))
}

/// Build the full application router.
///
/// The rate limiter is the outermost layer: every request - authenticated
/// or not, matched or not - is admitted through it before anything else.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .route("/token", post(auth::issue_token))
        .merge(user_routes())
        .merge(shipment_routes())
        .merge(notification_routes())
        .merge(admin_routes())
        .merge(analytics_routes())
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit::enforce,
        ))
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies database connectivity before returning OK.
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}
