use super::users::user_from_row;
use super::{constraint_violation, CommentStore, Violation};
use crate::core::error::{AppError, Result};
use crate::db::manager::DatabaseManager;
use crate::db::models::{Comment, Page};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::Arc;

const COMMENT_SELECT: &str = "SELECT c.id, c.body, c.user_id, c.chapter_id, c.created_at, c.updated_at, \
            u.id, u.username, u.email, u.password_hash, u.role, u.created_at \
     FROM comments c \
     INNER JOIN users u ON u.id = c.user_id";

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        body: row.get(1)?,
        user_id: row.get(2)?,
        chapter_id: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
        user: Some(user_from_row(row, 6)?),
    })
}

fn fetch_comment(conn: &Connection, id: i64) -> rusqlite::Result<Option<Comment>> {
    conn.query_row(
        &format!("{} WHERE c.id = ?1", COMMENT_SELECT),
        [id],
        comment_from_row,
    )
    .optional()
}

fn comment_not_found() -> AppError {
    AppError::NotFound("comment not found".to_string())
}

/// SQLite-backed [`CommentStore`]
pub struct CommentRepository {
    db: Arc<DatabaseManager>,
}

impl CommentRepository {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CommentStore for CommentRepository {
    async fn add_comment(&self, chapter_id: i64, user_id: i64, body: String) -> Result<Comment> {
        self.db
            .execute(move |conn| {
                let now = Utc::now();
                let id: i64 = conn
                    .query_row(
                        "INSERT INTO comments (body, user_id, chapter_id, created_at, updated_at) \
                         VALUES (?1, ?2, ?3, ?4, ?4) RETURNING id",
                        params![body, user_id, chapter_id, now],
                        |row| row.get(0),
                    )
                    .map_err(|e| {
                        if constraint_violation(&e) == Some(Violation::ForeignKey) {
                            AppError::NotFound("chapter not found".to_string())
                        } else {
                            AppError::DatabaseError(e)
                        }
                    })?;
                fetch_comment(conn, id)?.ok_or_else(comment_not_found)
            })
            .await
    }

    async fn get_comment_by_id(&self, id: i64) -> Result<Option<Comment>> {
        self.db
            .execute(move |conn| Ok(fetch_comment(conn, id)?))
            .await
    }

    async fn update_comment(&self, id: i64, body: String) -> Result<Comment> {
        self.db
            .execute(move |conn| {
                let updated = conn.execute(
                    "UPDATE comments SET body = ?1, updated_at = ?2 WHERE id = ?3",
                    params![body, Utc::now(), id],
                )?;
                if updated == 0 {
                    return Err(comment_not_found());
                }
                fetch_comment(conn, id)?.ok_or_else(comment_not_found)
            })
            .await
    }

    async fn delete_comment_by_id(&self, id: i64) -> Result<()> {
        self.db
            .execute(move |conn| {
                let deleted = conn.execute("DELETE FROM comments WHERE id = ?1", [id])?;
                if deleted == 0 {
                    return Err(comment_not_found());
                }
                Ok(())
            })
            .await
    }

    async fn get_comments_by_chapter_id(
        &self,
        chapter_id: i64,
        page: Page,
    ) -> Result<(Vec<Comment>, i64)> {
        self.db
            .execute(move |conn| {
                let total: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM comments WHERE chapter_id = ?1",
                    [chapter_id],
                    |row| row.get(0),
                )?;

                let mut stmt = conn.prepare(&format!(
                    "{} WHERE c.chapter_id = ?1 \
                     ORDER BY c.created_at DESC, c.id DESC LIMIT ?2 OFFSET ?3",
                    COMMENT_SELECT
                ))?;
                let comments = stmt
                    .query_map(params![chapter_id, page.limit, page.offset()], comment_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;

                Ok((comments, total))
            })
            .await
    }
}
