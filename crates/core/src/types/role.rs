//! User roles for authorization.

use serde::{Deserialize, Serialize};

/// Role assigned to a user account.
///
/// Roles are a closed set so authorization decisions can be written as
/// exhaustive matches. Stored as snake_case text in the record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Full access to everything, including user administration.
    Admin,
    /// Full access to shipment, tracking, and notification operations.
    Manager,
    /// Operational staff: reads shipments, appends tracking updates.
    Employee,
    /// End customer: creates and reads their own shipments.
    Customer,
}

impl UserRole {
    /// Whether this role is held by staff (non-customer) accounts.
    #[must_use]
    pub const fn is_staff(self) -> bool {
        !matches!(self, Self::Customer)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Manager => write!(f, "manager"),
            Self::Employee => write!(f, "employee"),
            Self::Customer => write!(f, "customer"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "manager" => Ok(Self::Manager),
            "employee" => Ok(Self::Employee),
            "customer" => Ok(Self::Customer),
            _ => Err(format!("invalid user role: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_from_str_roundtrip() {
        for role in [
            UserRole::Admin,
            UserRole::Manager,
            UserRole::Employee,
            UserRole::Customer,
        ] {
            let parsed: UserRole = role.to_string().parse().unwrap();
            assert_eq!(parsed, role);
        }
    }

    #[test]
    fn test_from_str_rejects_unknown() {
        assert!("root".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_is_staff() {
        assert!(UserRole::Admin.is_staff());
        assert!(UserRole::Employee.is_staff());
        assert!(!UserRole::Customer.is_staff());
    }

    #[test]
    fn test_serde_snake_case() {
        assert_eq!(
            serde_json::to_string(&UserRole::Employee).unwrap(),
            "\"employee\""
        );
    }
}
