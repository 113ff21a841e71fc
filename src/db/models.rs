//! Database models
//!
//! Rows as they come out of the stores, plus the input shapes the stores
//! accept. Serialized forms are what the API returns.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

/// Where a book sits on a reader's shelf
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadingStatus {
    Wishlist,
    Reading,
    Completed,
}

impl ReadingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadingStatus::Wishlist => "wishlist",
            ReadingStatus::Reading => "reading",
            ReadingStatus::Completed => "completed",
        }
    }
}

impl Default for ReadingStatus {
    fn default() -> Self {
        ReadingStatus::Wishlist
    }
}

/// Generates Display, FromStr and the SQLite text mapping for a string enum
macro_rules! text_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($ty::$variant),)+
                    other => Err(format!("unknown {}: {}", stringify!($ty), other)),
                }
            }
        }

        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: String| FromSqlError::Other(e.into()))
            }
        }
    };
}

text_enum!(Role { User => "user", Admin => "admin" });
text_enum!(ReadingStatus {
    Wishlist => "wishlist",
    Reading => "reading",
    Completed => "completed",
});

/// User account
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Input for creating a user; the password is already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// Bearer credential. Only `token` and `expiry` go over the wire.
#[derive(Debug, Clone, Serialize)]
pub struct Token {
    #[serde(rename = "token")]
    pub plaintext: String,
    #[serde(skip_serializing)]
    pub hash: Vec<u8>,
    #[serde(skip_serializing)]
    pub user_id: i64,
    pub expiry: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub scope: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookImages {
    pub thumbnail_url: Option<String>,
    pub small_url: Option<String>,
    pub medium_url: Option<String>,
    pub large_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chapter {
    pub id: i64,
    pub book_id: i64,
    pub number: i64,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub authors: Vec<String>,
    pub publisher: String,
    pub published_date: NaiveDate,
    pub description: Option<String>,
    pub page_count: Option<i64>,
    pub isbn_13: String,
    pub isbn_10: Option<String>,
    pub book_images: BookImages,
    pub chapters: Vec<Chapter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewChapter {
    pub number: i64,
    pub title: String,
}

/// Full book description used for both creating and replacing a book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBook {
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    pub publisher: String,
    pub published_date: NaiveDate,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub page_count: Option<i64>,
    pub isbn_13: String,
    #[serde(default)]
    pub isbn_10: Option<String>,
    #[serde(default)]
    pub book_images: BookImages,
    #[serde(default)]
    pub chapters: Vec<NewChapter>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comment {
    pub id: i64,
    pub body: String,
    pub user_id: i64,
    pub chapter_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user's shelf entry for one book
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserBook {
    pub id: i64,
    pub user_id: i64,
    pub book_id: i64,
    pub status: ReadingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages_read: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage_read: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_updated_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub book: Option<Book>,
}

/// Shelf listing entry with the book embedded
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasicUserBook {
    pub id: i64,
    pub user_id: i64,
    pub status: ReadingStatus,
    pub updated_at: DateTime<Utc>,
    pub book: Book,
}

/// Partial update of a shelf entry. `None` fields are left untouched.
///
/// `completed_at` is tri-state: `None` leaves it alone, `Some(None)` clears
/// it and `Some(Some(date))` sets it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserBookUpdate {
    pub status: Option<ReadingStatus>,
    pub completed_at: Option<Option<NaiveDate>>,
    pub pages_read: Option<i64>,
    pub percentage_read: Option<f64>,
}

impl UserBookUpdate {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.completed_at.is_none()
            && self.pages_read.is_none()
            && self.percentage_read.is_none()
    }
}

/// Page request shared by the paginated stores
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub limit: u32,
}

impl Page {
    pub const DEFAULT_LIMIT: u32 = 20;
    pub const MAX_LIMIT: u32 = 100;

    pub fn new(page: u32, limit: u32) -> Self {
        Self { page, limit }
    }

    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1) as i64) * self.limit as i64
    }

    /// Number of pages needed to show `total` items
    pub fn total_pages(&self, total: i64) -> i64 {
        if self.limit == 0 || total <= 0 {
            return 0;
        }
        (total + self.limit as i64 - 1) / self.limit as i64
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            page: 1,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing() {
        let result: Result<ReadingStatus, _> = serde_json::from_str(r#""shelved""#);
        assert!(result.is_err());
        assert!(UserBookUpdate::default().is_empty());
        assert_eq!("reading".parse::<ReadingStatus>(), Ok(ReadingStatus::Reading));
        assert!("Reading".parse::<ReadingStatus>().is_err());
    }

    #[test]
    fn test_user_serialization_hides_password() {
        let user = User {
            id: 1,
            username: "ada".into(),
            email: "ada@example.com".into(),
            password_hash: "$2b$04$secret".into(),
            role: Role::Admin,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "admin");
    }

    #[test]
    fn test_token_wire_shape() {
        let token = Token {
            plaintext: "abc".into(),
            hash: vec![1, 2, 3],
            user_id: 7,
            expiry: Utc::now(),
            scope: "authentication".into(),
        };
        let json = serde_json::to_value(&token).unwrap();
        let keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys.len(), 2);
        assert_eq!(json["token"], "abc");
        assert!(json.get("expiry").is_some());
    }

    #[test]
    fn test_user_book_omits_unset_progress() {
        let mut entry = UserBook {
            id: 3,
            user_id: 1,
            book_id: 2,
            status: ReadingStatus::Wishlist,
            started_at: None,
            completed_at: None,
            pages_read: None,
            percentage_read: None,
            progress_updated_at: None,
            updated_at: Utc::now(),
            book: None,
        };
        let json = serde_json::to_value(&entry).unwrap();
        for key in [
            "started_at",
            "completed_at",
            "pages_read",
            "percentage_read",
            "progress_updated_at",
            "book",
        ] {
            assert!(json.get(key).is_none(), "{} should be omitted", key);
        }
        assert_eq!(json["status"], "wishlist");

        entry.pages_read = Some(40);
        entry.started_at = NaiveDate::from_ymd_opt(2024, 5, 1);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["pages_read"], 40);
        assert_eq!(json["started_at"], "2024-05-01");
        assert!(json.get("completed_at").is_none());
    }

    #[test]
    fn test_page_math() {
        let page = Page::new(3, 20);
        assert_eq!(page.offset(), 40);
        assert_eq!(page.total_pages(0), 0);
        assert_eq!(page.total_pages(20), 1);
        assert_eq!(page.total_pages(41), 3);
    }

    #[test]
    fn test_new_book_defaults() {
        let book: NewBook = serde_json::from_str(
            r#"{"title":"Dune","publisher":"Chilton","published_date":"1965-08-01","isbn_13":"9780441013593"}"#,
        )
        .unwrap();
        assert!(book.authors.is_empty());
        assert!(book.chapters.is_empty());
        assert_eq!(book.book_images, BookImages::default());
    }
}
