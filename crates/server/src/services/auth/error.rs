//! Authentication error types.

use thiserror::Error;

use parcelflow_core::{EmailError, UsernameError};

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
///
/// `InvalidCredentials` deliberately covers every login failure - unknown
/// username, wrong password - so callers cannot tell which one occurred.
/// `InvalidToken` likewise covers every resolution failure, including a
/// deactivated or deleted account behind a structurally valid token.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Login failed. Which part failed is not disclosed.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Token resolution failed. Which check failed is not disclosed.
    #[error("invalid or expired token")]
    InvalidToken,

    /// The username or email is already registered.
    #[error("user already exists")]
    UserAlreadyExists,

    /// The password doesn't meet requirements.
    #[error("weak password: {0}")]
    WeakPassword(String),

    /// The username failed validation.
    #[error("invalid username: {0}")]
    InvalidUsername(#[from] UsernameError),

    /// The email failed validation.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Hashing or signing failed. Treated as a server fault.
    #[error("credential processing failed")]
    Credential,

    /// Underlying repository failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
