//! User administration route handlers (admin only).
//!
//! Accounts are never hard-deleted; deactivation via the status toggle is
//! the only removal, and it takes effect on the next token resolution.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use parcelflow_core::{UserId, UserRole};

use crate::db::UserRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::UserProfile;
use crate::services::policy::{Action, authorize};
use crate::state::AppState;

/// Largest page size a caller may request.
const MAX_PAGE_SIZE: i64 = 500;
/// Page size when the caller doesn't ask for one.
const DEFAULT_PAGE_SIZE: i64 = 100;

/// Query parameters for listing accounts.
#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub role: Option<UserRole>,
    #[serde(default)]
    pub skip: i64,
    pub limit: Option<i64>,
}

/// Body for changing an account's role.
#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: UserRole,
}

/// List accounts, optionally filtered by role.
///
/// # Errors
///
/// Returns `AppError::Forbidden` for non-admin callers.
pub async fn list_users(
    RequireAuth(actor): RequireAuth,
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
) -> Result<Json<Vec<UserProfile>>> {
    authorize(actor.role, Action::UserAdmin, None, actor.id)?;

    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    let users = UserRepository::new(state.pool())
        .list(query.role, limit, query.skip.max(0))
        .await?;

    Ok(Json(users.into_iter().map(UserProfile::from).collect()))
}

/// Change an account's role.
///
/// # Errors
///
/// Returns `AppError::Forbidden` for non-admin callers and
/// `AppError::NotFound` for unknown accounts.
pub async fn set_role(
    RequireAuth(actor): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<SetRoleRequest>,
) -> Result<Json<UserProfile>> {
    authorize(actor.role, Action::UserAdmin, None, actor.id)?;

    let user = UserRepository::new(state.pool())
        .set_role(UserId::new(id), req.role)
        .await?;

    tracing::info!(username = %user.username, role = %user.role, "user role changed");
    Ok(Json(user.into()))
}

/// Toggle an account between active and deactivated.
///
/// # Errors
///
/// Returns `AppError::Forbidden` for non-admin callers and
/// `AppError::NotFound` for unknown accounts.
pub async fn toggle_status(
    RequireAuth(actor): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<UserProfile>> {
    authorize(actor.role, Action::UserAdmin, None, actor.id)?;

    let repo = UserRepository::new(state.pool());
    let id = UserId::new(id);

    let user = repo.get_by_id(id).await?.ok_or(AppError::NotFound)?;
    let user = repo.set_active(id, !user.is_active).await?;

    tracing::info!(
        username = %user.username,
        is_active = user.is_active,
        "user activation toggled"
    );
    Ok(Json(user.into()))
}
