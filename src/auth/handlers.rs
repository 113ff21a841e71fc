//! Login and logout handlers

use crate::api::handlers::AppState;
use crate::api::extract::JsonBody;
use crate::auth::middleware::AuthUser;
use crate::auth::models::{AuthTokenResponse, LoginRequest};
use crate::auth::password::verify_password;
use crate::auth::tokens::SCOPE_AUTHENTICATION;
use crate::core::error::{AppError, Result};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

fn invalid_credentials() -> AppError {
    AppError::AuthenticationError("invalid credentials".to_string())
}

/// Handler for POST /tokens/authentication - exchange credentials for a bearer token
pub async fn create_authentication_token(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse> {
    if req.username.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::ValidationError(
            "username and password are required".to_string(),
        ));
    }

    let user = state
        .users
        .get_user_by_username(&req.username)
        .await?
        .ok_or_else(invalid_credentials)?;

    if !verify_password(&req.password, &user.password_hash)? {
        tracing::warn!(username = %req.username, "Invalid password");
        return Err(invalid_credentials());
    }

    let token = state
        .tokens
        .create_new_token(user.id, state.security.token_ttl(), SCOPE_AUTHENTICATION)
        .await?;

    tracing::info!(user_id = user.id, "Login successful");

    Ok((
        StatusCode::CREATED,
        Json(AuthTokenResponse { auth_token: token }),
    ))
}

/// Handler for DELETE /tokens/authentication - revoke every session of the caller
pub async fn delete_authentication_tokens(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<StatusCode> {
    let revoked = state
        .tokens
        .delete_all_for_user(SCOPE_AUTHENTICATION, user.id)
        .await?;

    tracing::info!(user_id = user.id, revoked, "Logged out");
    Ok(StatusCode::NO_CONTENT)
}
