use super::AppState;
use crate::api::extract::JsonBody;
use crate::api::models::{
    validate_email, validate_username, RegisterUserRequest, UpdateMeRequest, UsernameQuery,
};
use crate::auth::middleware::{AdminUser, AuthUser};
use crate::auth::password::hash_password;
use crate::core::config::BootstrapConfig;
use crate::core::error::{AppError, Result};
use crate::db::models::{NewUser, Role, User};
use axum::{
    extract::{Query, State},
    Json,
};

async fn register(state: &AppState, req: RegisterUserRequest, role: Role) -> Result<User> {
    req.validate()?;

    let password_hash = hash_password(&req.password, state.security.bcrypt_cost)?;
    let user = state
        .users
        .create_user(NewUser {
            username: req.username,
            email: req.email,
            password_hash,
            role,
        })
        .await?;

    tracing::info!(user_id = user.id, role = %user.role, "Account registered");
    Ok(user)
}

/// Handler for POST /users - open registration
pub async fn register_user(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RegisterUserRequest>,
) -> Result<Json<User>> {
    Ok(Json(register(&state, req, Role::User).await?))
}

/// Handler for POST /admins - an admin registers another admin
pub async fn register_admin(
    State(state): State<AppState>,
    admin: AdminUser,
    JsonBody(req): JsonBody<RegisterUserRequest>,
) -> Result<Json<User>> {
    tracing::debug!(by = admin.id, "Registering admin");
    Ok(Json(register(&state, req, Role::Admin).await?))
}

/// Seed the configured admin account when no admin exists yet.
///
/// The configured credentials go through the same validation as a
/// registration request. Returns the created admin, if any.
pub async fn ensure_bootstrap_admin(
    state: &AppState,
    bootstrap: &BootstrapConfig,
) -> Result<Option<User>> {
    let Some((username, email, password)) = bootstrap.admin() else {
        return Ok(None);
    };

    let req = RegisterUserRequest {
        username: username.to_string(),
        email: email.to_string(),
        password: password.to_string(),
    };
    req.validate()
        .map_err(|e| AppError::ConfigError(format!("invalid bootstrap admin: {}", e)))?;

    if state.users.count_admins().await? > 0 {
        tracing::debug!("Admin account present, skipping bootstrap");
        return Ok(None);
    }

    tracing::info!("No admin found, creating bootstrap admin...");
    register(state, req, Role::Admin).await.map(Some)
}

/// Handler for GET /users?username=
pub async fn get_user_by_username(
    State(state): State<AppState>,
    Query(query): Query<UsernameQuery>,
) -> Result<Json<User>> {
    let username = query.username.unwrap_or_default();
    if username.is_empty() {
        return Err(AppError::InvalidRequest("invalid username".to_string()));
    }

    state
        .users
        .get_user_by_username(&username)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("user not found".to_string()))
}

/// Handler for GET /me
pub async fn get_me(AuthUser(user): AuthUser) -> Json<User> {
    Json(user)
}

/// Handler for PATCH /me - change the caller's username and/or email
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    JsonBody(req): JsonBody<UpdateMeRequest>,
) -> Result<Json<User>> {
    if req.username.is_none() && req.email.is_none() {
        return Err(AppError::ValidationError("no fields to update".to_string()));
    }

    let username = req.username.unwrap_or(user.username);
    let email = req.email.unwrap_or(user.email);
    validate_username(&username)?;
    validate_email(&email)?;

    let updated = state.users.update_user(user.id, username, email).await?;
    Ok(Json(updated))
}
