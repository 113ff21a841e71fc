use crate::db::models::{Book, Page};
use serde::Serialize;

/// Response for GET /books
#[derive(Debug, Serialize)]
pub struct BooksPage {
    pub books: Vec<Book>,
    pub page: u32,
    pub limit: u32,
    pub total_items: i64,
    pub total_pages: i64,
}

impl BooksPage {
    pub fn new(books: Vec<Book>, page: Page, total_items: i64) -> Self {
        Self {
            books,
            page: page.page,
            limit: page.limit,
            total_items,
            total_pages: page.total_pages(total_items),
        }
    }
}
