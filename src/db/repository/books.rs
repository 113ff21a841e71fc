use super::{constraint_violation, BookStore, Violation};
use crate::core::error::{AppError, Result};
use crate::db::manager::DatabaseManager;
use crate::db::models::{Book, BookImages, Chapter, NewBook, Page};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;
use std::sync::Arc;

/// Load a book with its authors, images and chapters (ordered by number)
pub(crate) fn load_book(conn: &Connection, id: i64) -> rusqlite::Result<Option<Book>> {
    let book = conn
        .query_row(
            "SELECT b.id, b.title, p.name, b.published_date, b.description, b.page_count, \
                    b.isbn_13, b.isbn_10, \
                    i.thumbnail_url, i.small_url, i.medium_url, i.large_url \
             FROM books b \
             INNER JOIN publishers p ON p.id = b.publisher_id \
             LEFT JOIN book_images i ON i.book_id = b.id \
             WHERE b.id = ?1",
            [id],
            |row| {
                Ok(Book {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    authors: Vec::new(),
                    publisher: row.get(2)?,
                    published_date: row.get(3)?,
                    description: row.get(4)?,
                    page_count: row.get(5)?,
                    isbn_13: row.get(6)?,
                    isbn_10: row.get(7)?,
                    book_images: BookImages {
                        thumbnail_url: row.get(8)?,
                        small_url: row.get(9)?,
                        medium_url: row.get(10)?,
                        large_url: row.get(11)?,
                    },
                    chapters: Vec::new(),
                })
            },
        )
        .optional()?;

    let Some(mut book) = book else {
        return Ok(None);
    };

    let mut stmt = conn.prepare_cached(
        "SELECT a.name FROM book_authors ba \
         INNER JOIN authors a ON a.id = ba.author_id \
         WHERE ba.book_id = ?1 ORDER BY ba.position",
    )?;
    book.authors = stmt
        .query_map([id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;

    let mut stmt = conn.prepare_cached(
        "SELECT id, book_id, number, title FROM chapters WHERE book_id = ?1 ORDER BY number",
    )?;
    book.chapters = stmt
        .query_map([id], |row| {
            Ok(Chapter {
                id: row.get(0)?,
                book_id: row.get(1)?,
                number: row.get(2)?,
                title: row.get(3)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(Some(book))
}

fn upsert_named(conn: &Connection, table: &str, name: &str) -> rusqlite::Result<i64> {
    // DO UPDATE (not DO NOTHING) so RETURNING also yields the existing row
    conn.query_row(
        &format!(
            "INSERT INTO {table} (name) VALUES (?1) \
             ON CONFLICT(name) DO UPDATE SET name = excluded.name RETURNING id"
        ),
        [name],
        |row| row.get(0),
    )
}

fn link_authors(conn: &Connection, book_id: i64, authors: &[String]) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM book_authors WHERE book_id = ?1", [book_id])?;
    for (position, name) in authors.iter().enumerate() {
        let author_id = upsert_named(conn, "authors", name)?;
        conn.execute(
            "INSERT OR IGNORE INTO book_authors (book_id, author_id, position) VALUES (?1, ?2, ?3)",
            params![book_id, author_id, position as i64],
        )?;
    }
    Ok(())
}

fn save_images(conn: &Connection, book_id: i64, images: &BookImages) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO book_images (book_id, thumbnail_url, small_url, medium_url, large_url) \
         VALUES (?1, ?2, ?3, ?4, ?5) \
         ON CONFLICT(book_id) DO UPDATE SET \
            thumbnail_url = excluded.thumbnail_url, \
            small_url = excluded.small_url, \
            medium_url = excluded.medium_url, \
            large_url = excluded.large_url",
        params![
            book_id,
            images.thumbnail_url,
            images.small_url,
            images.medium_url,
            images.large_url
        ],
    )?;
    Ok(())
}

fn map_book_conflict(err: rusqlite::Error) -> AppError {
    let mapped = match constraint_violation(&err) {
        Some(Violation::Unique(msg)) if msg.contains("books.isbn_13") => Some(AppError::Conflict(
            "book with this ISBN already exists".to_string(),
        )),
        Some(Violation::Unique(msg)) if msg.contains("chapters.") => Some(
            AppError::ValidationError("chapter numbers must be unique".to_string()),
        ),
        _ => None,
    };
    mapped.unwrap_or(AppError::DatabaseError(err))
}

/// SQLite-backed [`BookStore`]
pub struct BookRepository {
    db: Arc<DatabaseManager>,
}

impl BookRepository {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl BookStore for BookRepository {
    async fn add_book(&self, book: NewBook) -> Result<Book> {
        let book_id = self
            .db
            .transaction(move |tx| {
                let publisher_id = upsert_named(tx, "publishers", &book.publisher)?;

                let book_id: i64 = tx
                    .query_row(
                        "INSERT INTO books \
                            (title, publisher_id, published_date, description, page_count, isbn_13, isbn_10) \
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) RETURNING id",
                        params![
                            book.title,
                            publisher_id,
                            book.published_date,
                            book.description,
                            book.page_count,
                            book.isbn_13,
                            book.isbn_10
                        ],
                        |row| row.get(0),
                    )
                    .map_err(map_book_conflict)?;

                link_authors(tx, book_id, &book.authors)?;
                save_images(tx, book_id, &book.book_images)?;

                let mut stmt = tx.prepare_cached(
                    "INSERT INTO chapters (book_id, number, title) VALUES (?1, ?2, ?3)",
                )?;
                for chapter in &book.chapters {
                    stmt.execute(params![book_id, chapter.number, chapter.title])
                        .map_err(map_book_conflict)?;
                }

                Ok(book_id)
            })
            .await?;

        tracing::info!(book_id, "Book added");

        self.get_book_by_id(book_id)
            .await?
            .ok_or_else(|| AppError::InternalError(format!("book {} vanished after insert", book_id)))
    }

    async fn get_book_by_id(&self, id: i64) -> Result<Option<Book>> {
        self.db
            .execute(move |conn| Ok(load_book(conn, id)?))
            .await
    }

    async fn update_book(&self, id: i64, book: NewBook) -> Result<Book> {
        self.db
            .transaction(move |tx| {
                let publisher_id = upsert_named(tx, "publishers", &book.publisher)?;

                let updated = tx
                    .execute(
                        "UPDATE books SET title = ?1, publisher_id = ?2, published_date = ?3, \
                            description = ?4, page_count = ?5, isbn_13 = ?6, isbn_10 = ?7 \
                         WHERE id = ?8",
                        params![
                            book.title,
                            publisher_id,
                            book.published_date,
                            book.description,
                            book.page_count,
                            book.isbn_13,
                            book.isbn_10,
                            id
                        ],
                    )
                    .map_err(map_book_conflict)?;
                if updated == 0 {
                    return Err(AppError::NotFound("book not found".to_string()));
                }

                link_authors(tx, id, &book.authors)?;
                save_images(tx, id, &book.book_images)?;

                // Chapters are matched by number: keep ids of surviving chapters
                let wanted: HashSet<i64> = book.chapters.iter().map(|c| c.number).collect();
                let existing: Vec<i64> = tx
                    .prepare("SELECT number FROM chapters WHERE book_id = ?1")?
                    .query_map([id], |row| row.get(0))?
                    .collect::<rusqlite::Result<_>>()?;
                for number in existing.into_iter().filter(|n| !wanted.contains(n)) {
                    tx.execute(
                        "DELETE FROM chapters WHERE book_id = ?1 AND number = ?2",
                        params![id, number],
                    )?;
                }
                for chapter in &book.chapters {
                    tx.execute(
                        "INSERT INTO chapters (book_id, number, title) VALUES (?1, ?2, ?3) \
                         ON CONFLICT(book_id, number) DO UPDATE SET title = excluded.title",
                        params![id, chapter.number, chapter.title],
                    )?;
                }

                load_book(tx, id)?
                    .ok_or_else(|| AppError::NotFound("book not found".to_string()))
            })
            .await
    }

    async fn delete_book_by_id(&self, id: i64) -> Result<()> {
        self.db
            .execute(move |conn| {
                let deleted = conn.execute("DELETE FROM books WHERE id = ?1", [id])?;
                if deleted == 0 {
                    return Err(AppError::NotFound("book not found".to_string()));
                }
                Ok(())
            })
            .await
    }

    async fn get_all_books(&self, page: Page) -> Result<(Vec<Book>, i64)> {
        self.db
            .execute(move |conn| {
                let total: i64 = conn.query_row("SELECT COUNT(*) FROM books", [], |row| row.get(0))?;

                let ids: Vec<i64> = conn
                    .prepare("SELECT id FROM books ORDER BY id LIMIT ?1 OFFSET ?2")?
                    .query_map(params![page.limit, page.offset()], |row| row.get(0))?
                    .collect::<rusqlite::Result<_>>()?;

                let mut books = Vec::with_capacity(ids.len());
                for id in ids {
                    if let Some(book) = load_book(conn, id)? {
                        books.push(book);
                    }
                }
                Ok((books, total))
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures;
    use super::*;
    use crate::db::models::NewChapter;

    #[tokio::test]
    async fn test_add_book_persists_everything() {
        let repo = BookRepository::new(fixtures::db());
        let mut new_book = fixtures::new_book("9780441478125");
        new_book.authors.push("Second Author".to_string());

        let book = repo.add_book(new_book).await.unwrap();
        assert_eq!(book.publisher, "Ace Books");
        assert_eq!(book.authors, vec!["Ursula K. Le Guin", "Second Author"]);
        assert_eq!(
            book.book_images.thumbnail_url.as_deref(),
            Some("https://img.example.com/t.jpg")
        );
        assert_eq!(book.chapters.len(), 2);
        assert_eq!(book.chapters[0].number, 1);
        assert_eq!(book.chapters[1].book_id, book.id);
    }

    #[tokio::test]
    async fn test_shared_publisher_and_author_rows() {
        let db = fixtures::db();
        let repo = BookRepository::new(db.clone());
        repo.add_book(fixtures::new_book("9780000000001")).await.unwrap();
        repo.add_book(fixtures::new_book("9780000000002")).await.unwrap();

        let (publishers, authors): (i64, i64) = db
            .execute(|conn| {
                Ok(conn.query_row(
                    "SELECT (SELECT COUNT(*) FROM publishers), (SELECT COUNT(*) FROM authors)",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )?)
            })
            .await
            .unwrap();
        assert_eq!((publishers, authors), (1, 1));
    }

    #[tokio::test]
    async fn test_duplicate_isbn_rolls_back() {
        let db = fixtures::db();
        let repo = BookRepository::new(db.clone());
        repo.add_book(fixtures::new_book("9780441478125")).await.unwrap();

        let mut dup = fixtures::new_book("9780441478125");
        dup.publisher = "Another House".to_string();
        let err = repo.add_book(dup).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref m) if m == "book with this ISBN already exists"));

        // the publisher upsert ran inside the failed transaction
        let publishers: i64 = db
            .execute(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM publishers", [], |row| row.get(0))?)
            })
            .await
            .unwrap();
        assert_eq!(publishers, 1);
    }

    #[tokio::test]
    async fn test_duplicate_chapter_number_rolls_back() {
        let repo = BookRepository::new(fixtures::db());
        let mut book = fixtures::new_book("9780441478125");
        book.chapters.push(NewChapter {
            number: 1,
            title: "Again".to_string(),
        });

        let err = repo.add_book(book).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
        let (books, total) = repo.get_all_books(Page::default()).await.unwrap();
        assert!(books.is_empty());
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn test_update_book_reconciles_chapters() {
        let repo = BookRepository::new(fixtures::db());
        let original = repo
            .add_book(fixtures::new_book("9780441478125"))
            .await
            .unwrap();
        let first_chapter_id = original.chapters[0].id;

        let mut changes = fixtures::new_book("9780441478125");
        changes.title = "The Left Hand of Darkness (50th Anniversary)".to_string();
        changes.authors = vec!["U. K. Le Guin".to_string()];
        changes.book_images.large_url = Some("https://img.example.com/l.jpg".to_string());
        changes.chapters = vec![
            NewChapter {
                number: 1,
                title: "A Parade".to_string(),
            },
            NewChapter {
                number: 3,
                title: "The Mad King".to_string(),
            },
        ];

        let updated = repo.update_book(original.id, changes).await.unwrap();
        assert_eq!(updated.title, "The Left Hand of Darkness (50th Anniversary)");
        assert_eq!(updated.authors, vec!["U. K. Le Guin"]);
        assert_eq!(
            updated.book_images.large_url.as_deref(),
            Some("https://img.example.com/l.jpg")
        );
        let numbers: Vec<i64> = updated.chapters.iter().map(|c| c.number).collect();
        assert_eq!(numbers, vec![1, 3]);
        assert_eq!(updated.chapters[0].id, first_chapter_id);
        assert_eq!(updated.chapters[0].title, "A Parade");
    }

    #[tokio::test]
    async fn test_update_missing_book() {
        let repo = BookRepository::new(fixtures::db());
        let err = repo
            .update_book(42, fixtures::new_book("9780441478125"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_to_taken_isbn() {
        let repo = BookRepository::new(fixtures::db());
        repo.add_book(fixtures::new_book("9780000000001")).await.unwrap();
        let second = repo.add_book(fixtures::new_book("9780000000002")).await.unwrap();

        let err = repo
            .update_book(second.id, fixtures::new_book("9780000000001"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_delete_book() {
        let repo = BookRepository::new(fixtures::db());
        let book = repo
            .add_book(fixtures::new_book("9780441478125"))
            .await
            .unwrap();

        repo.delete_book_by_id(book.id).await.unwrap();
        assert!(repo.get_book_by_id(book.id).await.unwrap().is_none());

        let err = repo.delete_book_by_id(book.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_get_all_books_pages() {
        let repo = BookRepository::new(fixtures::db());
        for i in 0..5 {
            repo.add_book(fixtures::new_book(&format!("978000000000{}", i)))
                .await
                .unwrap();
        }

        let (books, total) = repo.get_all_books(Page::new(2, 2)).await.unwrap();
        assert_eq!(total, 5);
        let isbns: Vec<&str> = books.iter().map(|b| b.isbn_13.as_str()).collect();
        assert_eq!(isbns, vec!["9780000000002", "9780000000003"]);

        let (books, _) = repo.get_all_books(Page::new(4, 2)).await.unwrap();
        assert!(books.is_empty());
    }
}
