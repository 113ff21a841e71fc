pub mod books;
pub mod chapters;
pub mod comments;
pub mod system;
pub mod user_books;
pub mod users;

pub use books::*;
pub use chapters::*;
pub use comments::*;
pub use system::*;
pub use user_books::*;
pub use users::*;

use crate::core::config::SecurityConfig;
use crate::db::manager::DatabaseManager;
use crate::db::repository::{
    BookRepository, BookStore, ChapterRepository, ChapterStore, CommentRepository, CommentStore,
    TokenRepository, TokenStore, UserBookRepository, UserBookStore, UserRepository, UserStore,
};
use std::sync::Arc;

/// Shared application state for handlers
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub tokens: Arc<dyn TokenStore>,
    pub books: Arc<dyn BookStore>,
    pub chapters: Arc<dyn ChapterStore>,
    pub comments: Arc<dyn CommentStore>,
    pub user_books: Arc<dyn UserBookStore>,
    pub security: Arc<SecurityConfig>,
}

impl AppState {
    /// Wire every store to the SQLite implementation backed by `db`
    pub fn new(db: Arc<DatabaseManager>, security: SecurityConfig) -> Self {
        Self {
            users: Arc::new(UserRepository::new(db.clone())),
            tokens: Arc::new(TokenRepository::new(db.clone())),
            books: Arc::new(BookRepository::new(db.clone())),
            chapters: Arc::new(ChapterRepository::new(db.clone())),
            comments: Arc::new(CommentRepository::new(db.clone())),
            user_books: Arc::new(UserBookRepository::new(db)),
            security: Arc::new(security),
        }
    }
}
