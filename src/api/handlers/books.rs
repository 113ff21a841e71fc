use super::AppState;
use crate::api::extract::{parse_id, JsonBody};
use crate::api::models::{BooksPage, PageQuery};
use crate::auth::middleware::AdminUser;
use crate::core::error::{AppError, Result};
use crate::db::models::{Book, NewBook};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::collections::HashSet;

fn book_id(raw: &str) -> Result<i64> {
    parse_id(raw, "invalid book id")
}

fn validate_book(book: &NewBook) -> Result<()> {
    let required = [
        ("title", &book.title),
        ("isbn_13", &book.isbn_13),
        ("publisher", &book.publisher),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(AppError::ValidationError(format!("{} is required", field)));
        }
    }
    if book.authors.iter().any(|a| a.trim().is_empty()) {
        return Err(AppError::ValidationError(
            "author names cannot be empty".to_string(),
        ));
    }
    if book.chapters.iter().any(|c| c.number < 1) {
        return Err(AppError::ValidationError(
            "chapter numbers must be positive".to_string(),
        ));
    }
    let mut numbers = HashSet::with_capacity(book.chapters.len());
    if !book.chapters.iter().all(|c| numbers.insert(c.number)) {
        return Err(AppError::ValidationError(
            "chapter numbers must be unique".to_string(),
        ));
    }
    Ok(())
}

/// Handler for GET /books - one page of the catalogue
pub async fn list_books(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<BooksPage>> {
    let page = query.to_page()?;
    let (books, total) = state.books.get_all_books(page).await?;
    Ok(Json(BooksPage::new(books, page, total)))
}

/// Handler for GET /books/:id
pub async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Book>> {
    let id = book_id(&id)?;
    state
        .books
        .get_book_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("book not found".to_string()))
}

/// Handler for POST /books - admin only
pub async fn create_book(
    State(state): State<AppState>,
    admin: AdminUser,
    JsonBody(req): JsonBody<NewBook>,
) -> Result<Json<Book>> {
    validate_book(&req)?;
    let book = state.books.add_book(req).await?;
    tracing::info!(book_id = book.id, by = admin.id, "Book added");
    Ok(Json(book))
}

/// Handler for PUT /books/:id - admin only, replaces the whole record
pub async fn update_book(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<NewBook>,
) -> Result<Json<Book>> {
    let id = book_id(&id)?;
    validate_book(&req)?;
    let book = state.books.update_book(id, req).await?;
    tracing::info!(book_id = book.id, by = admin.id, "Book updated");
    Ok(Json(book))
}

/// Handler for DELETE /books/:id - admin only
pub async fn delete_book(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let id = book_id(&id)?;
    state.books.delete_book_by_id(id).await?;
    tracing::info!(book_id = id, by = admin.id, "Book deleted");
    Ok(StatusCode::NO_CONTENT)
}
