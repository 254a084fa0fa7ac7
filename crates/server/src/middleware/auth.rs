//! Authentication extractor.
//!
//! Handlers that need a caller take [`RequireAuth`] as an argument; the
//! extractor pulls the bearer token from the `Authorization` header and
//! resolves it to a live account. There is no session store: the token is
//! the only credential, and the account is re-fetched on every request.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, request::Parts},
};

use crate::error::AppError;
use crate::models::User;
use crate::services::AuthService;
use crate::state::AppState;

/// Extractor that requires a valid bearer token.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.username)
/// }
/// ```
pub struct RequireAuth(pub User);

impl<S> FromRequestParts<S> for RequireAuth
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);

        let token = bearer_token(&parts.headers)?;

        let user = AuthService::new(state.pool(), state.tokens())
            .resolve(token)
            .await?;

        Ok(Self(user))
    }
}

/// Pull the token out of an `Authorization: Bearer ...` header.
fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(AppError::Auth)?;

    let header = header.to_str().map_err(|_| AppError::Auth)?;

    let token = header.strip_prefix("Bearer ").ok_or(AppError::Auth)?.trim();
    if token.is_empty() {
        return Err(AppError::Auth);
    }

    Ok(token)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_str(value).unwrap(),
        );
        headers
    }

    #[test]
    fn test_bearer_token_extracted() {
        let headers = headers_with("Bearer abc.def.ghi");
        assert_eq!(bearer_token(&headers).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn test_missing_header_rejected() {
        assert!(bearer_token(&HeaderMap::new()).is_err());
    }

    #[test]
    fn test_wrong_scheme_rejected() {
        let headers = headers_with("Basic dXNlcjpwdw==");
        assert!(bearer_token(&headers).is_err());
    }

    #[test]
    fn test_empty_token_rejected() {
        let headers = headers_with("Bearer ");
        assert!(bearer_token(&headers).is_err());
    }
}
