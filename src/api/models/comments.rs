use crate::db::models::{Comment, Page};
use serde::{Deserialize, Serialize};

/// Body for creating or editing a comment
#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    #[serde(default)]
    pub body: String,
}

/// Response for GET /chapters/:chapter_id/comments
#[derive(Debug, Serialize)]
pub struct CommentsPage {
    pub comments: Vec<Comment>,
    pub page: u32,
    pub limit: u32,
    pub total_items: i64,
    pub total_pages: i64,
}

impl CommentsPage {
    pub fn new(comments: Vec<Comment>, page: Page, total_items: i64) -> Self {
        Self {
            comments,
            page: page.page,
            limit: page.limit,
            total_items,
            total_pages: page.total_pages(total_items),
        }
    }
}
