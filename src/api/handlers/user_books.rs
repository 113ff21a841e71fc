use super::AppState;
use crate::api::extract::{parse_id, parse_page, JsonBody};
use crate::api::models::{AddUserBookQuery, UpdateUserBookRequest, UserBooksQuery, UserBooksResponse};
use crate::auth::middleware::AuthUser;
use crate::core::error::{AppError, Result};
use crate::db::models::{ReadingStatus, User, UserBook};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

/// Resolve `:user_id` to the account whose list is being touched. Callers may
/// only reach their own list unless they are admins.
async fn target_user(state: &AppState, caller: &User, raw: &str) -> Result<i64> {
    let user_id = parse_id(raw, "invalid user id")?;
    if user_id == caller.id {
        return Ok(user_id);
    }
    if !caller.is_admin() {
        return Err(AppError::PermissionDenied(
            "you can only access your own reading list".to_string(),
        ));
    }
    if state.users.get_user_by_id(user_id).await?.is_none() {
        return Err(AppError::NotFound("user not found".to_string()));
    }
    Ok(user_id)
}

fn parse_status(raw: Option<&str>) -> Result<Option<ReadingStatus>> {
    raw.filter(|s| !s.is_empty())
        .map(str::parse::<ReadingStatus>)
        .transpose()
        .map_err(|_| AppError::ValidationError("invalid status value".to_string()))
}

/// Handler for GET /users/:user_id/books?status=&page=&limit=
pub async fn list_user_books(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(user_id): Path<String>,
    Query(query): Query<UserBooksQuery>,
) -> Result<Json<UserBooksResponse>> {
    let user_id = target_user(&state, &caller, &user_id).await?;
    let status = parse_status(query.status.as_deref())?;
    let page = parse_page(query.page.as_deref(), query.limit.as_deref())?;

    let user_books = state
        .user_books
        .get_user_books_by_user_id(user_id, status, page)
        .await?;

    Ok(Json(UserBooksResponse {
        user_books,
        page: page.page,
        limit: page.limit,
    }))
}

/// Handler for POST /users/:user_id/books?book_id=&status=
pub async fn add_user_book(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(user_id): Path<String>,
    Query(query): Query<AddUserBookQuery>,
) -> Result<Json<UserBook>> {
    let user_id = target_user(&state, &caller, &user_id).await?;

    let book_id = match query.book_id.as_deref().map(str::trim) {
        None | Some("") => {
            return Err(AppError::InvalidRequest(
                "invalid or missing book id".to_string(),
            ))
        }
        Some(raw) => parse_id(raw, "invalid type book id")?,
    };
    let status = parse_status(query.status.as_deref())?.unwrap_or_default();

    let user_book = state
        .user_books
        .add_user_book(user_id, book_id, status)
        .await?;

    tracing::info!(user_id, book_id, status = %status, "Book added to reading list");
    Ok(Json(user_book))
}

/// Handler for PATCH /user-books/:id - only the caller's own entries
pub async fn update_user_book(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateUserBookRequest>,
) -> Result<Json<UserBook>> {
    let id = parse_id(&id, "invalid id")?;
    let update = req.into_update()?;

    let user_book = state
        .user_books
        .update_user_book(caller.id, id, update)
        .await?;
    Ok(Json(user_book))
}

/// Handler for DELETE /user-books/:id
pub async fn delete_user_book(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let id = parse_id(&id, "invalid id")?;
    state.user_books.delete_user_book(caller.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
