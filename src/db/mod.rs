//! Database module
//!
//! This module provides database management functionality including:
//! - Database connection pool management
//! - Store traits and their SQLite implementations
//! - Database migrations
//! - Data models

pub mod manager;
pub mod migrations;
pub mod models;
pub mod repository;

pub use manager::DatabaseManager;
pub use models::{Book, Chapter, Comment, User, UserBook};
pub use repository::{
    BookRepository, BookStore, ChapterRepository, ChapterStore, CommentRepository, CommentStore,
    TokenRepository, TokenStore, UserBookRepository, UserBookStore, UserRepository, UserStore,
};
