//! Notification route handlers.
//!
//! Creation is staff-gated by policy; reading and marking-read are scoped
//! to the recipient. A notification addressed to someone else is reported
//! as missing, not forbidden.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::Deserialize;

use parcelflow_core::{NotificationId, UserId};

use crate::db::notifications::NewNotification;
use crate::db::{NotificationRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::Notification;
use crate::services::policy::{Action, authorize};
use crate::state::AppState;

/// Largest page size a caller may request.
const MAX_PAGE_SIZE: i64 = 200;
/// Page size when the caller doesn't ask for one.
const DEFAULT_PAGE_SIZE: i64 = 50;

/// Query parameters for listing notifications.
#[derive(Debug, Deserialize)]
pub struct NotificationListQuery {
    #[serde(default)]
    pub unread_only: bool,
    #[serde(default)]
    pub skip: i64,
    pub limit: Option<i64>,
}

/// Body for creating a notification.
#[derive(Debug, Deserialize)]
pub struct CreateNotificationRequest {
    pub user_id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
}

/// List the calling user's notifications, newest first.
///
/// # Errors
///
/// Returns `AppError::Internal` on store failures.
pub async fn list(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Query(query): Query<NotificationListQuery>,
) -> Result<Json<Vec<Notification>>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    let notifications = NotificationRepository::new(state.pool())
        .list_for_user(user.id, query.unread_only, limit, query.skip.max(0))
        .await?;

    Ok(Json(notifications))
}

/// Create a notification for a user (staff only).
///
/// # Errors
///
/// Returns `AppError::Forbidden` for customers, `AppError::Validation` on
/// empty fields, `AppError::NotFound` for an unknown recipient.
pub async fn create(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Json(req): Json<CreateNotificationRequest>,
) -> Result<(StatusCode, Json<Notification>)> {
    authorize(user.role, Action::NotificationCreate, None, user.id)?;

    if req.title.is_empty() || req.message.is_empty() {
        return Err(AppError::Validation(
            "title and message are required".to_owned(),
        ));
    }

    let recipient_id = UserId::new(req.user_id);
    UserRepository::new(state.pool())
        .get_by_id(recipient_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let notification = NotificationRepository::new(state.pool())
        .create(&NewNotification {
            user_id: recipient_id,
            title: &req.title,
            message: &req.message,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(notification)))
}

/// Mark one of the calling user's notifications as read.
///
/// # Errors
///
/// Returns `AppError::NotFound` for missing notifications and for
/// notifications addressed to someone else.
pub async fn mark_read(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Notification>> {
    let repo = NotificationRepository::new(state.pool());
    let id = NotificationId::new(id);

    let notification = repo.get(id).await?.ok_or(AppError::NotFound)?;
    if notification.user_id != user.id {
        return Err(AppError::NotFound);
    }

    let notification = repo.mark_read(id, Utc::now()).await?;
    Ok(Json(notification))
}
