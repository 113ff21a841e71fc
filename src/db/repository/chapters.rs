use super::ChapterStore;
use crate::core::error::Result;
use crate::db::manager::DatabaseManager;
use crate::db::models::Chapter;
use async_trait::async_trait;
use rusqlite::OptionalExtension;
use std::sync::Arc;

/// SQLite-backed [`ChapterStore`]
pub struct ChapterRepository {
    db: Arc<DatabaseManager>,
}

impl ChapterRepository {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ChapterStore for ChapterRepository {
    async fn get_chapter_by_id(&self, id: i64) -> Result<Option<Chapter>> {
        self.db
            .execute(move |conn| {
                Ok(conn
                    .query_row(
                        "SELECT id, book_id, number, title FROM chapters WHERE id = ?1",
                        [id],
                        |row| {
                            Ok(Chapter {
                                id: row.get(0)?,
                                book_id: row.get(1)?,
                                number: row.get(2)?,
                                title: row.get(3)?,
                            })
                        },
                    )
                    .optional()?)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures;
    use super::*;

    #[tokio::test]
    async fn test_get_chapter_by_id() {
        let db = fixtures::db();
        let book = fixtures::book(&db, "9780441478125").await;
        let repo = ChapterRepository::new(db);

        let chapter = repo
            .get_chapter_by_id(book.chapters[1].id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(chapter, book.chapters[1]);
        assert!(repo.get_chapter_by_id(9999).await.unwrap().is_none());
    }
}
