//! Notification repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use parcelflow_core::{NotificationId, NotificationStatus, UserId};

use super::RepositoryError;
use crate::models::Notification;

/// Fields required to create a notification.
#[derive(Debug)]
pub struct NewNotification<'a> {
    pub user_id: UserId,
    pub title: &'a str,
    pub message: &'a str,
}

/// Repository for notification database operations.
pub struct NotificationRepository<'a> {
    pool: &'a SqlitePool,
}

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, title, message, status, created_at, sent_at, read_at";

/// Raw `notifications` row before domain validation.
#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: i64,
    user_id: i64,
    title: String,
    message: String,
    status: String,
    created_at: DateTime<Utc>,
    sent_at: Option<DateTime<Utc>>,
    read_at: Option<DateTime<Utc>>,
}

impl NotificationRow {
    fn into_notification(self) -> Result<Notification, RepositoryError> {
        let status: NotificationStatus =
            self.status.parse().map_err(RepositoryError::DataCorruption)?;

        Ok(Notification {
            id: NotificationId::new(self.id),
            user_id: UserId::new(self.user_id),
            title: self.title,
            message: self.message,
            status,
            created_at: self.created_at,
            sent_at: self.sent_at,
            read_at: self.read_at,
        })
    }
}

impl<'a> NotificationRepository<'a> {
    /// Create a new notification repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a notification in `pending` state.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails (including a
    /// missing recipient, surfaced as a foreign-key error).
    pub async fn create(
        &self,
        new: &NewNotification<'_>,
    ) -> Result<Notification, RepositoryError> {
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO notifications (user_id, title, message, status, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(new.user_id.as_i64())
        .bind(new.title)
        .bind(new.message)
        .bind(NotificationStatus::Pending.to_string())
        .bind(now)
        .execute(self.pool)
        .await?;

        let id = NotificationId::new(result.last_insert_rowid());
        self.get(id).await?.ok_or_else(|| {
            RepositoryError::DataCorruption("notification row missing after insert".to_owned())
        })
    }

    /// Get a notification by its ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored value is invalid.
    pub async fn get(&self, id: NotificationId) -> Result<Option<Notification>, RepositoryError> {
        let row: Option<NotificationRow> = sqlx::query_as(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?"
        ))
        .bind(id.as_i64())
        .fetch_optional(self.pool)
        .await?;

        row.map(NotificationRow::into_notification).transpose()
    }

    /// List a user's notifications, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored value is invalid.
    pub async fn list_for_user(
        &self,
        user_id: UserId,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE user_id = "
        ));
        builder.push_bind(user_id.as_i64());

        if unread_only {
            builder.push(" AND read_at IS NULL");
        }

        builder
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows: Vec<NotificationRow> = builder.build_query_as().fetch_all(self.pool).await?;
        rows.into_iter()
            .map(NotificationRow::into_notification)
            .collect()
    }

    /// Set the read timestamp on a notification.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the notification doesn't exist.
    pub async fn mark_read(
        &self,
        id: NotificationId,
        at: DateTime<Utc>,
    ) -> Result<Notification, RepositoryError> {
        let result = sqlx::query("UPDATE notifications SET read_at = ? WHERE id = ?")
            .bind(at)
            .bind(id.as_i64())
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }
}
