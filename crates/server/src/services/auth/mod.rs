//! Authentication service.
//!
//! Composes credential verification and token issuance into login, and
//! token validation plus an account re-fetch into caller resolution. This
//! is the only service that reads identity records from the store.

mod error;

pub use error::AuthError;

use chrono::Utc;
use sqlx::SqlitePool;

use parcelflow_core::{Email, UserRole, Username};

use crate::db::users::NewUser;
use crate::db::{RepositoryError, UserRepository};
use crate::models::User;
use crate::services::password::{hash_password, verify_password};
use crate::services::tokens::TokenService;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Registration input, unvalidated.
#[derive(Debug)]
pub struct Registration<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub full_name: Option<&'a str>,
    pub role: UserRole,
}

/// Authentication service.
///
/// Handles user registration, login, and bearer-token resolution.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    tokens: &'a TokenService,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool, tokens: &'a TokenService) -> Self {
        Self {
            users: UserRepository::new(pool),
            tokens,
        }
    }

    /// Register a new user account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidUsername` / `AuthError::InvalidEmail` on
    /// malformed identifiers, `AuthError::WeakPassword` if the password is
    /// too short, and `AuthError::UserAlreadyExists` on a duplicate
    /// username or email.
    pub async fn register(&self, registration: Registration<'_>) -> Result<User, AuthError> {
        let username = Username::parse(registration.username)?;
        let email = Email::parse(registration.email)?;
        validate_password(registration.password)?;

        let password_hash =
            hash_password(registration.password).map_err(|_| AuthError::Credential)?;

        let user = self
            .users
            .create(&NewUser {
                username: &username,
                email: &email,
                password_hash: &password_hash,
                full_name: registration.full_name,
                role: registration.role,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(username = %user.username, role = %user.role, "user registered");
        Ok(user)
    }

    /// Log in with username and password, returning the account and a fresh
    /// bearer token.
    ///
    /// Records the login time on success.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` whether the username is
    /// unknown or the password is wrong; the two are indistinguishable.
    pub async fn login(&self, username: &str, password: &str) -> Result<(User, String), AuthError> {
        let Ok(username) = Username::parse(username) else {
            return Err(AuthError::InvalidCredentials);
        };

        let (user, password_hash) = self
            .users
            .get_with_password_hash(&username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password, &password_hash) {
            tracing::warn!(username = %username, "login failed");
            return Err(AuthError::InvalidCredentials);
        }

        self.users.touch_last_login(user.id, Utc::now()).await?;

        let token = self
            .tokens
            .issue(&user.username, user.role)
            .map_err(|_| AuthError::Credential)?;

        tracing::info!(username = %user.username, "login successful");
        Ok((user, token))
    }

    /// Resolve a bearer token to the live account behind it.
    ///
    /// The account is re-fetched from the store so deactivation (or
    /// deletion) since issuance takes effect immediately, even though the
    /// token itself is still structurally valid.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` on any failure.
    pub async fn resolve(&self, token: &str) -> Result<User, AuthError> {
        let claims = self
            .tokens
            .validate(token)
            .map_err(|_| AuthError::InvalidToken)?;

        let username = Username::parse(&claims.sub).map_err(|_| AuthError::InvalidToken)?;

        let user = self
            .users
            .get_by_username(&username)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        if !user.is_active {
            tracing::warn!(username = %user.username, "token presented for inactive account");
            return Err(AuthError::InvalidToken);
        }

        Ok(user)
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_password_too_short() {
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
    }

    #[test]
    fn test_validate_password_ok() {
        assert!(validate_password("pw123456").is_ok());
    }
}
