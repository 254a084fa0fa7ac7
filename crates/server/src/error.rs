//! Unified error handling.
//!
//! Route handlers return `Result<T, AppError>`. Each variant maps to one
//! HTTP status; server faults are logged with context while the response
//! body stays generic. Credential and authorization failures carry no
//! detail about what exactly failed.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use parcelflow_core::ShipmentStatus;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::policy::AccessDenied;
use crate::services::shipments::ShipmentError;

/// Application-level error type for the HTTP surface.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or missing input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Bad credentials or an invalid/expired token.
    #[error("authentication failed")]
    Auth,

    /// Authenticated but not authorized.
    #[error("access denied")]
    Forbidden,

    /// Resource not found (or outside the caller's visibility).
    #[error("not found")]
    NotFound,

    /// Duplicate unique key.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Lifecycle state-machine violation.
    #[error("no transitions allowed from terminal status '{0}'")]
    InvalidTransition(ShipmentStatus),

    /// Rejected by the rate limiter.
    #[error("rate limit exceeded")]
    RateExceeded,

    /// Unexpected persistence or crypto failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidTransition(_) => StatusCode::BAD_REQUEST,
            Self::Auth => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::RateExceeded => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Auth => "authentication_failed",
            Self::Forbidden => "access_denied",
            Self::NotFound => "not_found",
            Self::Conflict(_) => "conflict",
            Self::InvalidTransition(_) => "invalid_transition",
            Self::RateExceeded => "rate_limited",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Caller-facing message. Internal detail never leaves the server.
    fn message(&self) -> String {
        match self {
            Self::Internal(_) => "Internal server error".to_owned(),
            Self::Auth => "Could not validate credentials".to_owned(),
            Self::Forbidden => "Access denied".to_owned(),
            Self::NotFound => "Not found".to_owned(),
            Self::RateExceeded => "Too many requests. Please try again later.".to_owned(),
            Self::Validation(msg) | Self::Conflict(msg) => msg.clone(),
            Self::InvalidTransition(_) => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Self::Internal(detail) = &self {
            tracing::error!(detail, "request failed with internal error");
        }

        (
            self.status(),
            axum::Json(json!({
                "error": self.code(),
                "message": self.message(),
            })),
        )
            .into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound,
            RepositoryError::Conflict(msg) => Self::Conflict(msg),
            RepositoryError::Database(e) => Self::Internal(e.to_string()),
            RepositoryError::DataCorruption(msg) => Self::Internal(msg),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials | AuthError::InvalidToken => Self::Auth,
            AuthError::UserAlreadyExists => {
                Self::Conflict("username or email already registered".to_owned())
            }
            AuthError::WeakPassword(msg) => Self::Validation(msg),
            AuthError::InvalidUsername(e) => Self::Validation(e.to_string()),
            AuthError::InvalidEmail(e) => Self::Validation(e.to_string()),
            AuthError::Credential => Self::Internal("credential processing failed".to_owned()),
            AuthError::Repository(e) => e.into(),
        }
    }
}

impl From<AccessDenied> for AppError {
    fn from(_: AccessDenied) -> Self {
        Self::Forbidden
    }
}

impl From<ShipmentError> for AppError {
    fn from(err: ShipmentError) -> Self {
        match err {
            ShipmentError::NotFound => Self::NotFound,
            ShipmentError::Denied(_) => Self::Forbidden,
            ShipmentError::InvalidTransition(status) => Self::InvalidTransition(status),
            ShipmentError::DuplicateTrackingNumber => {
                Self::Conflict("tracking number already exists".to_owned())
            }
            ShipmentError::InvalidTrackingNumber(e) => Self::Validation(e.to_string()),
            ShipmentError::Validation(msg) => Self::Validation(msg),
            ShipmentError::Repository(e) => e.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            status_of(AppError::Validation("bad".to_owned())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_of(AppError::Auth), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(AppError::Forbidden), StatusCode::FORBIDDEN);
        assert_eq!(status_of(AppError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(AppError::Conflict("dup".to_owned())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(AppError::InvalidTransition(ShipmentStatus::Delivered)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AppError::RateExceeded),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            status_of(AppError::Internal("boom".to_owned())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_detail_is_not_exposed() {
        let err = AppError::Internal("connection string with password".to_owned());
        assert_eq!(err.message(), "Internal server error");
    }

    #[test]
    fn test_auth_failures_collapse() {
        let from_credentials = AppError::from(AuthError::InvalidCredentials);
        let from_token = AppError::from(AuthError::InvalidToken);
        assert_eq!(from_credentials.message(), from_token.message());
        assert_eq!(from_credentials.status(), from_token.status());
    }
}
