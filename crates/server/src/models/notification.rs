//! Notification domain types.
//!
//! Only notification *state* is tracked here; delivery transport is outside
//! this service.

use chrono::{DateTime, Utc};
use serde::Serialize;

use parcelflow_core::{NotificationId, NotificationStatus, UserId};

/// A notification addressed to a user.
///
/// Mutated only to set the sent/read timestamps.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    /// Unique notification ID.
    pub id: NotificationId,
    /// Recipient account.
    pub user_id: UserId,
    /// Short title.
    pub title: String,
    /// Message body.
    pub message: String,
    /// Delivery state.
    pub status: NotificationStatus,
    /// When the notification was created.
    pub created_at: DateTime<Utc>,
    /// When the notification was handed to a delivery transport.
    pub sent_at: Option<DateTime<Utc>>,
    /// When the recipient marked it read.
    pub read_at: Option<DateTime<Utc>>,
}
