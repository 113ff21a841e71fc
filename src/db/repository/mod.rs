//! Store traits and their SQLite implementations
//!
//! Handlers only see the traits (`Arc<dyn UserStore>` and friends), so tests
//! can swap in mocks and the storage engine stays behind this module.

mod books;
mod chapters;
mod comments;
mod tokens;
mod user_books;
mod users;

pub use books::BookRepository;
pub use chapters::ChapterRepository;
pub use comments::CommentRepository;
pub use tokens::TokenRepository;
pub use user_books::{build_user_book_update, SqlParam, UpdateStatement, UserBookRepository};
pub use users::UserRepository;

use crate::core::error::Result;
use crate::db::models::{
    BasicUserBook, Book, Chapter, Comment, NewBook, NewUser, Page, ReadingStatus, Token, User,
    UserBook, UserBookUpdate,
};
use async_trait::async_trait;
use rusqlite::ffi;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(&self, user: NewUser) -> Result<User>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>>;
    /// Replace username and email of an existing account
    async fn update_user(&self, id: i64, username: String, email: String) -> Result<User>;
    /// Resolve a plaintext bearer token of the given scope to its unexpired owner
    async fn get_user_for_token(&self, scope: &str, plaintext: &str) -> Result<Option<User>>;
    async fn count_admins(&self) -> Result<i64>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Generate, persist and return a fresh token
    async fn create_new_token(
        &self,
        user_id: i64,
        ttl: chrono::Duration,
        scope: &str,
    ) -> Result<Token>;
    async fn insert(&self, token: Token) -> Result<()>;
    async fn delete_all_for_user(&self, scope: &str, user_id: i64) -> Result<u64>;
    async fn delete_expired(&self) -> Result<u64>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookStore: Send + Sync {
    async fn add_book(&self, book: NewBook) -> Result<Book>;
    async fn get_book_by_id(&self, id: i64) -> Result<Option<Book>>;
    async fn update_book(&self, id: i64, book: NewBook) -> Result<Book>;
    async fn delete_book_by_id(&self, id: i64) -> Result<()>;
    /// One page of books ordered by id, plus the total number of books
    async fn get_all_books(&self, page: Page) -> Result<(Vec<Book>, i64)>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChapterStore: Send + Sync {
    async fn get_chapter_by_id(&self, id: i64) -> Result<Option<Chapter>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn add_comment(&self, chapter_id: i64, user_id: i64, body: String) -> Result<Comment>;
    async fn get_comment_by_id(&self, id: i64) -> Result<Option<Comment>>;
    async fn update_comment(&self, id: i64, body: String) -> Result<Comment>;
    async fn delete_comment_by_id(&self, id: i64) -> Result<()>;
    async fn get_comments_by_chapter_id(
        &self,
        chapter_id: i64,
        page: Page,
    ) -> Result<(Vec<Comment>, i64)>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserBookStore: Send + Sync {
    async fn get_user_books_by_user_id(
        &self,
        user_id: i64,
        status: Option<ReadingStatus>,
        page: Page,
    ) -> Result<Vec<BasicUserBook>>;
    async fn add_user_book(
        &self,
        user_id: i64,
        book_id: i64,
        status: ReadingStatus,
    ) -> Result<UserBook>;
    async fn update_user_book(
        &self,
        user_id: i64,
        id: i64,
        update: UserBookUpdate,
    ) -> Result<UserBook>;
    async fn delete_user_book(&self, user_id: i64, id: i64) -> Result<()>;
}

/// Constraint a failed statement ran into
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Violation<'a> {
    /// Carries SQLite's message, e.g. `UNIQUE constraint failed: users.email`
    Unique(&'a str),
    ForeignKey,
    Check,
}

pub(crate) fn constraint_violation(err: &rusqlite::Error) -> Option<Violation<'_>> {
    match err {
        rusqlite::Error::SqliteFailure(e, msg) => match e.extended_code {
            ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                Some(Violation::Unique(msg.as_deref().unwrap_or_default()))
            }
            ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Some(Violation::ForeignKey),
            ffi::SQLITE_CONSTRAINT_CHECK => Some(Violation::Check),
            _ => None,
        },
        _ => None,
    }
}
