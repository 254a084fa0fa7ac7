//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use parcelflow_core::{Email, UserId, UserRole, Username};

/// A user account (domain type).
///
/// The password hash is deliberately not part of this type; repositories
/// return it separately on the credential-check path only.
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Login name, unique across active accounts.
    pub username: Username,
    /// Email address, unique across active accounts.
    pub email: Email,
    /// Optional display name.
    pub full_name: Option<String>,
    /// Authorization role.
    pub role: UserRole,
    /// Deactivated accounts keep their records but cannot authenticate.
    pub is_active: bool,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// When the account last logged in.
    pub last_login: Option<DateTime<Utc>>,
}

/// The caller-visible projection of a [`User`].
///
/// Never includes the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: Username,
    pub email: Email,
    pub full_name: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}
