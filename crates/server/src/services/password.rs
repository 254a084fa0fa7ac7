//! One-way credential hashing and verification.
//!
//! Hashes use Argon2id with the library's fixed default parameters, salted
//! per credential. Verification is deliberately infallible: a malformed
//! digest and a wrong password both come back as `false`, so callers cannot
//! distinguish the two cases.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use thiserror::Error;

/// Failure to produce a password hash.
///
/// This only occurs on exhaustion of the underlying randomness or resources
/// and is treated as a server fault.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("password hashing failed")]
pub struct PasswordHashError;

/// Hash a password for storage using Argon2id.
///
/// # Errors
///
/// Returns [`PasswordHashError`] if the hash cannot be produced.
pub fn hash_password(password: &str) -> Result<String, PasswordHashError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| PasswordHashError)
}

/// Verify a password against a stored digest.
///
/// Returns `false` for a wrong password, a malformed digest, or any internal
/// fault; never errors.
#[must_use]
pub fn verify_password(password: &str, digest: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(digest) else {
        return false;
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
