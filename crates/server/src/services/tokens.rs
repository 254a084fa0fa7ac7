//! Signed, time-bounded bearer tokens.
//!
//! Tokens are HS256 JWTs carrying the subject username, role, and an
//! absolute expiry. Validity is purely a function of signature and expiry:
//! there is no server-side session record and no revocation list, so
//! compromise mitigation rests on the short lifetime alone.
//!
//! Expiry is checked here against an explicit clock (zero leeway) rather
//! than by the JWT library, so the boundary is exact and deterministic.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use parcelflow_core::{UserRole, Username};

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject: the username.
    pub sub: String,
    /// Role granted at issuance.
    pub role: UserRole,
    /// Issued-at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

/// Token issuance/validation errors.
///
/// Bad signature, malformed payload, missing claims, and past expiry all
/// collapse into [`TokenError::Invalid`]; callers learn nothing more.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    /// The token failed signature, structure, or expiry checks.
    #[error("invalid token")]
    Invalid,

    /// The token could not be signed. Treated as a server fault.
    #[error("token signing failed")]
    Signing,
}

/// Issues and validates access tokens against a server-held secret.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    validation: Validation,
}

impl TokenService {
    /// Create a token service from the signing secret and token lifetime.
    #[must_use]
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is enforced below with an explicit clock and zero leeway.
        validation.validate_exp = false;
        validation.set_required_spec_claims::<&str>(&[]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
            validation,
        }
    }

    /// The configured token lifetime.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `username` with `role`, expiring after the
    /// configured lifetime.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Signing`] if the token cannot be signed.
    pub fn issue(&self, username: &Username, role: UserRole) -> Result<String, TokenError> {
        self.issue_at(username, role, Utc::now())
    }

    /// Issue a token as of an explicit instant.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Signing`] if the token cannot be signed.
    pub fn issue_at(
        &self,
        username: &Username,
        role: UserRole,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = AccessClaims {
            sub: username.as_str().to_owned(),
            role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|_| TokenError::Signing)
    }

    /// Validate a token against the current clock.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Invalid`] on a bad signature, malformed
    /// payload, missing subject, or expiry at or before now.
    pub fn validate(&self, token: &str) -> Result<AccessClaims, TokenError> {
        self.validate_at(token, Utc::now())
    }

    /// Validate a token as of an explicit instant.
    ///
    /// A token is valid strictly before `iat + ttl`: at the expiry instant
    /// itself it is already invalid.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Invalid`] on any failure.
    pub fn validate_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<AccessClaims, TokenError> {
        let data = jsonwebtoken::decode::<AccessClaims>(token, &self.decoding, &self.validation)
            .map_err(|_| TokenError::Invalid)?;

        let claims = data.claims;
        if claims.sub.is_empty() {
            return Err(TokenError::Invalid);
        }
        if now.timestamp() >= claims.exp {
            return Err(TokenError::Invalid);
        }

        Ok(claims)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(b"test-signing-secret", Duration::minutes(30))
    }

    fn alice() -> Username {
        Username::parse("alice").unwrap()
    }

    #[test]
    fn test_issue_validate_roundtrip() {
        let tokens = service();
        let token = tokens.issue(&alice(), UserRole::Customer).unwrap();

        let claims = tokens.validate(&token).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.role, UserRole::Customer);
    }

    #[test]
    fn test_valid_until_expiry_boundary() {
        let tokens = service();
        let issued = Utc::now();
        let token = tokens
            .issue_at(&alice(), UserRole::Manager, issued)
            .unwrap();

        // Valid one second before expiry.
        let just_before = issued + Duration::minutes(30) - Duration::seconds(1);
        assert!(tokens.validate_at(&token, just_before).is_ok());

        // Invalid at exactly the expiry instant.
        let at_expiry = issued + Duration::minutes(30);
        assert_eq!(
            tokens.validate_at(&token, at_expiry),
            Err(TokenError::Invalid)
        );

        // And after it.
        let after = at_expiry + Duration::seconds(1);
        assert_eq!(tokens.validate_at(&token, after), Err(TokenError::Invalid));
    }

    #[test]
    fn test_tampered_token_rejected() {
        let tokens = service();
        let token = tokens.issue(&alice(), UserRole::Customer).unwrap();

        // Flip the last signature character.
        let mut tampered = token.clone();
        let last = tampered.pop().unwrap();
        tampered.push(if last == 'A' { 'B' } else { 'A' });

        assert_eq!(tokens.validate(&tampered), Err(TokenError::Invalid));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = service().issue(&alice(), UserRole::Customer).unwrap();

        let other = TokenService::new(b"another-signing-secret", Duration::minutes(30));
        assert_eq!(other.validate(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn test_garbage_rejected() {
        let tokens = service();
        assert_eq!(tokens.validate(""), Err(TokenError::Invalid));
        assert_eq!(tokens.validate("not.a.jwt"), Err(TokenError::Invalid));
        assert_eq!(
            tokens.validate("eyJhbGciOiJIUzI1NiJ9.e30."),
            Err(TokenError::Invalid)
        );
    }
}
