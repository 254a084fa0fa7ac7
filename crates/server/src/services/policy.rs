//! Role-based authorization decisions.
//!
//! [`authorize`] is a total function over `(role, action, ownership)`: every
//! combination has an explicit outcome and the match is exhaustive, so adding
//! a role or an action forces this module to be revisited.
//!
//! Denials carry no detail. Callers receive the same [`AccessDenied`] value
//! whatever the reason, and handlers decide whether to surface it as 403 or
//! as 404 (when the resource itself should stay invisible to the caller).

use thiserror::Error;

use parcelflow_core::{UserId, UserRole};

/// An action subject to authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Create a shipment.
    ShipmentCreate,
    /// Read a shipment or list shipments.
    ShipmentRead,
    /// Change shipment fields or status.
    ShipmentUpdate,
    /// Delete a shipment.
    ShipmentDelete,
    /// Read a shipment's tracking ledger.
    TrackingRead,
    /// Append a tracking entry.
    TrackingAppend,
    /// Create a notification for any user.
    NotificationCreate,
    /// Read operational dashboards.
    AnalyticsRead,
    /// Administer user accounts (roles, activation).
    UserAdmin,
}

/// The single, undetailed denial outcome.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("access denied")]
pub struct AccessDenied;

/// Decide whether `actor` with `role` may perform `action` on a resource
/// owned by `owner` (`None` for unowned resources or collection-level
/// actions).
///
/// # Errors
///
/// Returns [`AccessDenied`] when the action is not permitted.
pub fn authorize(
    role: UserRole,
    action: Action,
    owner: Option<UserId>,
    actor: UserId,
) -> Result<(), AccessDenied> {
    match role {
        UserRole::Admin => Ok(()),

        UserRole::Manager => match action {
            Action::UserAdmin => Err(AccessDenied),
            Action::ShipmentCreate
            | Action::ShipmentRead
            | Action::ShipmentUpdate
            | Action::ShipmentDelete
            | Action::TrackingRead
            | Action::TrackingAppend
            | Action::NotificationCreate
            | Action::AnalyticsRead => Ok(()),
        },

        UserRole::Employee => match action {
            Action::ShipmentRead
            | Action::TrackingRead
            | Action::TrackingAppend
            | Action::NotificationCreate => Ok(()),
            Action::ShipmentCreate
            | Action::ShipmentUpdate
            | Action::ShipmentDelete
            | Action::AnalyticsRead
            | Action::UserAdmin => Err(AccessDenied),
        },

        UserRole::Customer => match action {
            // Customers may create shipments for themselves, or leave the
            // owner unset and have it assigned at creation.
            Action::ShipmentCreate => match owner {
                None => Ok(()),
                Some(owner) if owner == actor => Ok(()),
                Some(_) => Err(AccessDenied),
            },
            // Customers see only their own shipments and ledgers.
            Action::ShipmentRead | Action::TrackingRead => match owner {
                Some(owner) if owner == actor => Ok(()),
                _ => Err(AccessDenied),
            },
            Action::ShipmentUpdate
            | Action::ShipmentDelete
            | Action::TrackingAppend
            | Action::NotificationCreate
            | Action::AnalyticsRead
            | Action::UserAdmin => Err(AccessDenied),
        },
    }
}
