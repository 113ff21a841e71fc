//! Authentication middleware and role guards

use crate::api::handlers::AppState;
use crate::auth::tokens::SCOPE_AUTHENTICATION;
use crate::core::error::{AppError, Result};
use crate::db::models::User;
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::ops::Deref;

/// Who is making the request, as resolved by [`authenticate`]
#[derive(Clone, Debug)]
pub enum CurrentUser {
    Anonymous,
    User(User),
}

impl CurrentUser {
    pub fn user(&self) -> Option<&User> {
        match self {
            CurrentUser::Anonymous => None,
            CurrentUser::User(user) => Some(user),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, CurrentUser::Anonymous)
    }

    pub fn is_admin(&self) -> bool {
        self.user().map(User::is_admin).unwrap_or(false)
    }
}

fn current_user(extensions: &axum::http::Extensions) -> CurrentUser {
    extensions
        .get::<CurrentUser>()
        .cloned()
        .unwrap_or(CurrentUser::Anonymous)
}

fn not_logged_in() -> AppError {
    AppError::AuthenticationError("you must be logged in".to_string())
}

fn not_admin() -> AppError {
    AppError::PermissionDenied("admin privileges required".to_string())
}

/// Extract the token from an `Authorization: Bearer <token>` value
fn bearer_token(value: &str) -> Option<&str> {
    let mut parts = value.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Some(token),
        _ => None,
    }
}

/// Resolve the bearer token into a [`CurrentUser`] request extension.
///
/// No header means an anonymous caller; a malformed header or an unknown or
/// expired token is rejected with 401.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let current = match request.headers().get(header::AUTHORIZATION) {
        None => CurrentUser::Anonymous,
        Some(value) => {
            let token = value
                .to_str()
                .ok()
                .and_then(bearer_token)
                .ok_or_else(|| {
                    AppError::AuthenticationError("invalid authorization header".to_string())
                })?;

            let user = state
                .users
                .get_user_for_token(SCOPE_AUTHENTICATION, token)
                .await?
                .ok_or_else(|| AppError::AuthenticationError("invalid token".to_string()))?;

            tracing::debug!(user_id = user.id, "Request authenticated");
            CurrentUser::User(user)
        }
    };

    request.extensions_mut().insert(current);

    let mut response = next.run(request).await;
    response
        .headers_mut()
        .append(header::VARY, HeaderValue::from_static("Authorization"));
    Ok(response)
}

/// Route guard: reject anonymous callers with 401
pub async fn require_user(request: Request, next: Next) -> Result<Response> {
    if current_user(request.extensions()).is_anonymous() {
        return Err(not_logged_in());
    }
    Ok(next.run(request).await)
}

/// Route guard: reject everyone but admins with 403, anonymous callers included
pub async fn require_admin(request: Request, next: Next) -> Result<Response> {
    if !current_user(request.extensions()).is_admin() {
        return Err(not_admin());
    }
    Ok(next.run(request).await)
}

/// Handler extractor for a logged-in user
#[derive(Clone, Debug)]
pub struct AuthUser(pub User);

impl Deref for AuthUser {
    type Target = User;

    fn deref(&self) -> &User {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        match current_user(&parts.extensions) {
            CurrentUser::User(user) => Ok(AuthUser(user)),
            CurrentUser::Anonymous => Err(not_logged_in()),
        }
    }
}

/// Handler extractor for an administrator
#[derive(Clone, Debug)]
pub struct AdminUser(pub User);

impl Deref for AdminUser {
    type Target = User;

    fn deref(&self) -> &User {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        match current_user(&parts.extensions) {
            CurrentUser::User(user) if user.is_admin() => Ok(AdminUser(user)),
            _ => Err(not_admin()),
        }
    }
}
