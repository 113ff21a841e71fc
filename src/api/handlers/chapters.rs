use super::AppState;
use crate::api::extract::parse_id;
use crate::core::error::{AppError, Result};
use crate::db::models::Chapter;
use axum::{
    extract::{Path, State},
    Json,
};

pub(crate) fn chapter_id(raw: &str) -> Result<i64> {
    parse_id(raw, "invalid chapter id")
}

pub(crate) fn chapter_not_found() -> AppError {
    AppError::NotFound("chapter not found".to_string())
}

/// Handler for GET /chapters/:chapter_id
pub async fn get_chapter(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Chapter>> {
    let id = chapter_id(&id)?;
    state
        .chapters
        .get_chapter_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(chapter_not_found)
}
