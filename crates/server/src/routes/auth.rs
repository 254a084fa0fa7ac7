//! Token issuance route handler.

use axum::{Form, Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::services::AuthService;
use crate::state::AppState;

/// Credential form posted to `/token` (form-encoded).
#[derive(Debug, Deserialize)]
pub struct TokenForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Successful token response.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

/// Exchange a username and password for a bearer token.
///
/// Empty fields are a validation error; any credential failure is a single
/// undifferentiated 401.
///
/// # Errors
///
/// Returns `AppError::Validation` on empty fields and `AppError::Auth` on
/// credential failure.
pub async fn issue_token(
    State(state): State<AppState>,
    Form(form): Form<TokenForm>,
) -> Result<Json<TokenResponse>> {
    if form.username.is_empty() || form.password.is_empty() {
        return Err(AppError::Validation(
            "username and password are required".to_owned(),
        ));
    }

    let auth = AuthService::new(state.pool(), state.tokens());
    let (_user, token) = auth.login(&form.username, &form.password).await?;

    Ok(Json(TokenResponse {
        access_token: token,
        token_type: "bearer",
    }))
}
