use super::common::deserialize_explicit_null;
use crate::core::error::{AppError, Result};
use crate::db::models::{BasicUserBook, ReadingStatus, UserBookUpdate};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// `?status=&page=&limit=` query of GET /users/:user_id/books
#[derive(Debug, Default, Deserialize)]
pub struct UserBooksQuery {
    pub status: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// `?book_id=&status=` query of POST /users/:user_id/books
#[derive(Debug, Default, Deserialize)]
pub struct AddUserBookQuery {
    pub book_id: Option<String>,
    pub status: Option<String>,
}

/// Response for GET /users/:user_id/books
#[derive(Debug, Serialize)]
pub struct UserBooksResponse {
    pub user_books: Vec<BasicUserBook>,
    pub page: u32,
    pub limit: u32,
}

/// Body for PATCH /user-books/:id
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserBookRequest {
    pub status: Option<String>,
    #[serde(default, deserialize_with = "deserialize_explicit_null")]
    pub completed_at: Option<Option<NaiveDate>>,
    pub pages_read: Option<i64>,
    pub percentage_read: Option<f64>,
}

impl UpdateUserBookRequest {
    /// Validate the raw fields and turn them into a store update
    pub fn into_update(self) -> Result<UserBookUpdate> {
        let status = self
            .status
            .map(|s| s.parse::<ReadingStatus>())
            .transpose()
            .map_err(|_| AppError::ValidationError("invalid status".to_string()))?;

        if matches!(self.pages_read, Some(p) if p < 0) {
            return Err(AppError::ValidationError(
                "pages_read must be >= 0".to_string(),
            ));
        }
        if matches!(self.percentage_read, Some(p) if !(0.0..=100.0).contains(&p)) {
            return Err(AppError::ValidationError(
                "percentage_read must be between 0 and 100".to_string(),
            ));
        }

        let update = UserBookUpdate {
            status,
            completed_at: self.completed_at,
            pages_read: self.pages_read,
            percentage_read: self.percentage_read,
        };
        if update.is_empty() {
            return Err(AppError::ValidationError("no fields to update".to_string()));
        }
        Ok(update)
    }
}
