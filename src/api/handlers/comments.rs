use super::chapters::{chapter_id, chapter_not_found};
use super::AppState;
use crate::api::extract::{parse_id, JsonBody};
use crate::api::models::{CommentRequest, CommentsPage, PageQuery};
use crate::auth::middleware::AuthUser;
use crate::core::error::{AppError, Result};
use crate::db::models::Comment;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

fn comment_body(req: CommentRequest) -> Result<String> {
    if req.body.trim().is_empty() {
        return Err(AppError::ValidationError(
            "comment body is required".to_string(),
        ));
    }
    Ok(req.body)
}

/// Load a comment addressed as `/chapters/:chapter_id/comments/:id`
async fn load_comment(state: &AppState, chapter_raw: &str, id_raw: &str) -> Result<Comment> {
    let chapter = chapter_id(chapter_raw)?;
    let id = parse_id(id_raw, "invalid comment id")?;

    let comment = state
        .comments
        .get_comment_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("comment not found".to_string()))?;

    if comment.chapter_id != chapter {
        return Err(AppError::InvalidRequest(
            "comment does not belong to this chapter".to_string(),
        ));
    }
    Ok(comment)
}

/// Handler for GET /chapters/:chapter_id/comments - newest first
pub async fn list_comments(
    State(state): State<AppState>,
    Path(chapter): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<CommentsPage>> {
    let chapter = chapter_id(&chapter)?;
    let page = query.to_page()?;

    if state.chapters.get_chapter_by_id(chapter).await?.is_none() {
        return Err(chapter_not_found());
    }

    let (comments, total) = state
        .comments
        .get_comments_by_chapter_id(chapter, page)
        .await?;
    Ok(Json(CommentsPage::new(comments, page, total)))
}

/// Handler for POST /chapters/:chapter_id/comments
pub async fn add_comment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(chapter): Path<String>,
    JsonBody(req): JsonBody<CommentRequest>,
) -> Result<Json<Comment>> {
    let chapter = chapter_id(&chapter)?;
    let body = comment_body(req)?;

    let comment = state.comments.add_comment(chapter, user.id, body).await?;
    tracing::debug!(comment_id = comment.id, chapter_id = chapter, "Comment added");
    Ok(Json(comment))
}

/// Handler for GET /chapters/:chapter_id/comments/:id
pub async fn get_comment(
    State(state): State<AppState>,
    Path((chapter, id)): Path<(String, String)>,
) -> Result<Json<Comment>> {
    Ok(Json(load_comment(&state, &chapter, &id).await?))
}

/// Handler for PUT /chapters/:chapter_id/comments/:id - author only
pub async fn update_comment(
    State(state): State<AppState>,
    user: AuthUser,
    Path((chapter, id)): Path<(String, String)>,
    JsonBody(req): JsonBody<CommentRequest>,
) -> Result<Json<Comment>> {
    let comment = load_comment(&state, &chapter, &id).await?;
    if comment.user_id != user.id {
        return Err(AppError::PermissionDenied(
            "you can only edit your own comments".to_string(),
        ));
    }

    let body = comment_body(req)?;
    Ok(Json(state.comments.update_comment(comment.id, body).await?))
}

/// Handler for DELETE /chapters/:chapter_id/comments/:id - author or admin
pub async fn delete_comment(
    State(state): State<AppState>,
    user: AuthUser,
    Path((chapter, id)): Path<(String, String)>,
) -> Result<StatusCode> {
    let comment = load_comment(&state, &chapter, &id).await?;
    if comment.user_id != user.id && !user.is_admin() {
        return Err(AppError::PermissionDenied(
            "you can only delete your own comments".to_string(),
        ));
    }

    state.comments.delete_comment_by_id(comment.id).await?;
    tracing::info!(comment_id = comment.id, by = user.id, "Comment deleted");
    Ok(StatusCode::NO_CONTENT)
}
