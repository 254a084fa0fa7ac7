//! User route handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;

use parcelflow_core::UserRole;

use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::UserProfile;
use crate::services::AuthService;
use crate::services::auth::Registration;
use crate::state::AppState;

/// Registration request body.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub full_name: Option<String>,
    /// Defaults to `customer` when omitted.
    pub role: Option<UserRole>,
}

/// Register a new account.
///
/// The response projection never includes the password hash.
///
/// # Errors
///
/// Returns `AppError::Validation` on missing or malformed fields and
/// `AppError::Conflict` on a duplicate username or email.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserProfile>)> {
    if req.username.is_empty() || req.email.is_empty() || req.password.is_empty() {
        return Err(AppError::Validation(
            "username, email, and password are required".to_owned(),
        ));
    }

    let auth = AuthService::new(state.pool(), state.tokens());
    let user = auth
        .register(Registration {
            username: &req.username,
            email: &req.email,
            password: &req.password,
            full_name: req.full_name.as_deref(),
            role: req.role.unwrap_or(UserRole::Customer),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Return the calling account's projection.
pub async fn me(RequireAuth(user): RequireAuth) -> Json<UserProfile> {
    Json(user.into())
}
