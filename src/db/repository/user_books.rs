use super::books::load_book;
use super::{constraint_violation, UserBookStore, Violation};
use crate::core::error::{AppError, Result};
use crate::db::manager::DatabaseManager;
use crate::db::models::{
    BasicUserBook, Page, ReadingStatus, UserBook, UserBookUpdate,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::ToSqlOutput;
use rusqlite::{params, params_from_iter, OptionalExtension, Row, ToSql};
use std::sync::Arc;

const USER_BOOK_COLUMNS: &str = "id, user_id, book_id, status, started_at, completed_at, \
     pages_read, percentage_read, progress_updated_at, updated_at";

fn user_book_from_row(row: &Row<'_>) -> rusqlite::Result<UserBook> {
    Ok(UserBook {
        id: row.get(0)?,
        user_id: row.get(1)?,
        book_id: row.get(2)?,
        status: row.get(3)?,
        started_at: row.get(4)?,
        completed_at: row.get(5)?,
        pages_read: row.get(6)?,
        percentage_read: row.get(7)?,
        progress_updated_at: row.get(8)?,
        updated_at: row.get(9)?,
        book: None,
    })
}

/// A bound value of a generated statement
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Status(ReadingStatus),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
    Integer(i64),
    Real(f64),
}

impl ToSql for SqlParam {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            SqlParam::Status(status) => status.to_sql(),
            SqlParam::Date(date) => date.to_sql(),
            SqlParam::Timestamp(ts) => ts.to_sql(),
            SqlParam::Integer(value) => value.to_sql(),
            SqlParam::Real(value) => value.to_sql(),
        }
    }
}

/// SQL text plus positional parameters (`?1` is `params[0]`)
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

#[derive(Default)]
struct SetClause {
    assignments: Vec<String>,
    params: Vec<SqlParam>,
}

impl SetClause {
    /// Bind `value` and return its placeholder
    fn bind(&mut self, value: SqlParam) -> String {
        self.params.push(value);
        format!("?{}", self.params.len())
    }

    fn assign(&mut self, column: &str, value: SqlParam) {
        let placeholder = self.bind(value);
        self.assignments.push(format!("{} = {}", column, placeholder));
    }
}

/// Build the `UPDATE user_books` statement for a partial update.
///
/// Returns `None` when `update` carries no fields. Setting the status to
/// `completed` without a `completed_at` stamps today's date; moving to
/// `reading` sets `started_at` unless it is already set. Any progress field
/// refreshes `progress_updated_at`, and `updated_at` is always bumped.
pub fn build_user_book_update(
    user_id: i64,
    id: i64,
    update: &UserBookUpdate,
    now: DateTime<Utc>,
    today: NaiveDate,
) -> Option<UpdateStatement> {
    let mut set = SetClause::default();

    if let Some(status) = update.status {
        set.assign("status", SqlParam::Status(status));
    }

    match update.completed_at {
        Some(None) => set.assignments.push("completed_at = NULL".to_string()),
        Some(Some(date)) => set.assign("completed_at", SqlParam::Date(date)),
        None if update.status == Some(ReadingStatus::Completed) => {
            set.assign("completed_at", SqlParam::Date(today))
        }
        None => {}
    }

    if update.status == Some(ReadingStatus::Reading) {
        let placeholder = set.bind(SqlParam::Date(today));
        set.assignments
            .push(format!("started_at = COALESCE(started_at, {})", placeholder));
    }

    if let Some(pages) = update.pages_read {
        set.assign("pages_read", SqlParam::Integer(pages));
    }
    if let Some(percentage) = update.percentage_read {
        set.assign("percentage_read", SqlParam::Real(percentage));
    }
    if update.pages_read.is_some() || update.percentage_read.is_some() {
        set.assign("progress_updated_at", SqlParam::Timestamp(now));
    }

    if set.assignments.is_empty() {
        return None;
    }

    set.assign("updated_at", SqlParam::Timestamp(now));

    let id_placeholder = set.bind(SqlParam::Integer(id));
    let user_placeholder = set.bind(SqlParam::Integer(user_id));

    Some(UpdateStatement {
        sql: format!(
            "UPDATE user_books SET {} WHERE id = {} AND user_id = {} RETURNING {}",
            set.assignments.join(", "),
            id_placeholder,
            user_placeholder,
            USER_BOOK_COLUMNS
        ),
        params: set.params,
    })
}

fn map_user_book_error(err: rusqlite::Error) -> AppError {
    let mapped = match constraint_violation(&err) {
        Some(Violation::Unique(_)) => Some(AppError::Conflict("book already in list".to_string())),
        Some(Violation::ForeignKey) => Some(AppError::NotFound("book not found".to_string())),
        Some(Violation::Check) => Some(AppError::ValidationError(
            "reading progress out of range".to_string(),
        )),
        None => None,
    };
    mapped.unwrap_or(AppError::DatabaseError(err))
}

fn user_book_not_found() -> AppError {
    AppError::NotFound("user book not found".to_string())
}

/// SQLite-backed [`UserBookStore`]
pub struct UserBookRepository {
    db: Arc<DatabaseManager>,
}

impl UserBookRepository {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserBookStore for UserBookRepository {
    async fn get_user_books_by_user_id(
        &self,
        user_id: i64,
        status: Option<ReadingStatus>,
        page: Page,
    ) -> Result<Vec<BasicUserBook>> {
        self.db
            .execute(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, user_id, book_id, status, updated_at FROM user_books \
                     WHERE user_id = ?1 AND (?2 IS NULL OR status = ?2) \
                     ORDER BY updated_at DESC, id DESC LIMIT ?3 OFFSET ?4",
                )?;
                let rows = stmt
                    .query_map(
                        params![user_id, status, page.limit, page.offset()],
                        |row| {
                            Ok((
                                row.get::<_, i64>(0)?,
                                row.get::<_, i64>(1)?,
                                row.get::<_, i64>(2)?,
                                row.get::<_, ReadingStatus>(3)?,
                                row.get::<_, DateTime<Utc>>(4)?,
                            ))
                        },
                    )?
                    .collect::<rusqlite::Result<Vec<_>>>()?;

                let mut entries = Vec::with_capacity(rows.len());
                for (id, user_id, book_id, status, updated_at) in rows {
                    // ON DELETE CASCADE keeps this in step; skip rather than fail
                    if let Some(book) = load_book(conn, book_id)? {
                        entries.push(BasicUserBook {
                            id,
                            user_id,
                            status,
                            updated_at,
                            book,
                        });
                    }
                }
                Ok(entries)
            })
            .await
    }

    async fn add_user_book(
        &self,
        user_id: i64,
        book_id: i64,
        status: ReadingStatus,
    ) -> Result<UserBook> {
        self.db
            .execute(move |conn| {
                let now = Utc::now();
                let today = now.date_naive();
                let started_at = (status == ReadingStatus::Reading).then_some(today);
                let completed_at = (status == ReadingStatus::Completed).then_some(today);

                let mut user_book = conn
                    .query_row(
                        &format!(
                            "INSERT INTO user_books \
                                (user_id, book_id, status, started_at, completed_at, updated_at) \
                             VALUES (?1, ?2, ?3, ?4, ?5, ?6) RETURNING {}",
                            USER_BOOK_COLUMNS
                        ),
                        params![user_id, book_id, status, started_at, completed_at, now],
                        user_book_from_row,
                    )
                    .map_err(map_user_book_error)?;
                user_book.book = load_book(conn, book_id)?;
                Ok(user_book)
            })
            .await
    }

    async fn update_user_book(
        &self,
        user_id: i64,
        id: i64,
        update: UserBookUpdate,
    ) -> Result<UserBook> {
        let now = Utc::now();
        let statement = build_user_book_update(user_id, id, &update, now, now.date_naive())
            .ok_or_else(|| AppError::ValidationError("no fields to update".to_string()))?;

        self.db
            .execute(move |conn| {
                conn.query_row(
                    &statement.sql,
                    params_from_iter(statement.params.iter()),
                    user_book_from_row,
                )
                .optional()
                .map_err(map_user_book_error)?
                .ok_or_else(user_book_not_found)
            })
            .await
    }

    async fn delete_user_book(&self, user_id: i64, id: i64) -> Result<()> {
        self.db
            .execute(move |conn| {
                let deleted = conn.execute(
                    "DELETE FROM user_books WHERE id = ?1 AND user_id = ?2",
                    params![id, user_id],
                )?;
                if deleted == 0 {
                    return Err(user_book_not_found());
                }
                Ok(())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures;
    use super::*;
    use crate::db::models::Role;
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    #[test]
    fn test_empty_update_builds_nothing() {
        assert_eq!(
            build_user_book_update(1, 2, &UserBookUpdate::default(), now(), today()),
            None
        );
    }

    #[test]
    fn test_pages_read_only() {
        let update = UserBookUpdate {
            pages_read: Some(42),
            ..Default::default()
        };
        let stmt = build_user_book_update(7, 3, &update, now(), today()).unwrap();
        assert!(stmt.sql.starts_with(
            "UPDATE user_books SET pages_read = ?1, progress_updated_at = ?2, updated_at = ?3 \
             WHERE id = ?4 AND user_id = ?5 RETURNING "
        ));
        assert_eq!(
            stmt.params,
            vec![
                SqlParam::Integer(42),
                SqlParam::Timestamp(now()),
                SqlParam::Timestamp(now()),
                SqlParam::Integer(3),
                SqlParam::Integer(7),
            ]
        );
    }

    #[test]
    fn test_completed_without_date_stamps_today() {
        let update = UserBookUpdate {
            status: Some(ReadingStatus::Completed),
            ..Default::default()
        };
        let stmt = build_user_book_update(1, 1, &update, now(), today()).unwrap();
        assert!(stmt.sql.contains("status = ?1, completed_at = ?2, updated_at = ?3"));
        assert_eq!(stmt.params[1], SqlParam::Date(today()));
    }

    #[test]
    fn test_explicit_null_clears_completed_at() {
        let update = UserBookUpdate {
            status: Some(ReadingStatus::Completed),
            completed_at: Some(None),
            ..Default::default()
        };
        let stmt = build_user_book_update(1, 1, &update, now(), today()).unwrap();
        assert!(stmt.sql.contains("completed_at = NULL"));
        assert!(!stmt.params.contains(&SqlParam::Date(today())));
    }

    #[test]
    fn test_reading_keeps_existing_start_date() {
        let update = UserBookUpdate {
            status: Some(ReadingStatus::Reading),
            percentage_read: Some(12.5),
            ..Default::default()
        };
        let stmt = build_user_book_update(1, 1, &update, now(), today()).unwrap();
        assert!(stmt.sql.contains("started_at = COALESCE(started_at, ?2)"));
        assert!(stmt.sql.contains("percentage_read = ?3"));
        assert_eq!(stmt.sql.matches("progress_updated_at").count(), 2); // SET + RETURNING
    }

    fn arb_update() -> impl Strategy<Value = UserBookUpdate> {
        let status = prop_oneof![
            Just(None),
            Just(Some(ReadingStatus::Wishlist)),
            Just(Some(ReadingStatus::Reading)),
            Just(Some(ReadingStatus::Completed)),
        ];
        let completed_at = prop_oneof![
            Just(None),
            Just(Some(None)),
            (1u32..=28).prop_map(|d| Some(NaiveDate::from_ymd_opt(2023, 2, d))),
        ];
        (
            status,
            completed_at,
            proptest::option::of(0i64..5000),
            proptest::option::of(0.0f64..=100.0),
        )
            .prop_map(|(status, completed_at, pages_read, percentage_read)| UserBookUpdate {
                status,
                completed_at,
                pages_read,
                percentage_read,
            })
    }

    proptest! {
        #[test]
        fn prop_placeholders_match_params(update in arb_update(), id in 1i64..1000, user_id in 1i64..1000) {
            match build_user_book_update(user_id, id, &update, now(), today()) {
                None => prop_assert!(update.is_empty()),
                Some(stmt) => {
                    prop_assert!(!update.is_empty());
                    let n = stmt.params.len();
                    for i in 1..=n {
                        let placeholder = format!("?{}", i);
                        prop_assert!(stmt.sql.contains(&placeholder));
                    }
                    let extra = format!("?{}", n + 1);
                    prop_assert!(!stmt.sql.contains(&extra));
                    prop_assert_eq!(&stmt.params[n - 2], &SqlParam::Integer(id));
                    prop_assert_eq!(&stmt.params[n - 1], &SqlParam::Integer(user_id));
                    prop_assert_eq!(&stmt.params[n - 3], &SqlParam::Timestamp(now()));
                    let set_clause = stmt.sql.split(" WHERE ").next().unwrap_or_default();
                    let last_assignment = format!("updated_at = ?{}", n - 2);
                    prop_assert!(set_clause.ends_with(&last_assignment));
                    prop_assert!(set_clause.matches("progress_updated_at").count() <= 1);
                }
            }
        }
    }

    async fn seeded() -> (UserBookRepository, i64, crate::db::models::Book) {
        let db = fixtures::db();
        let ada = fixtures::user(&db, "ada", Role::User).await;
        let book = fixtures::book(&db, "9780441478125").await;
        (UserBookRepository::new(db), ada.id, book)
    }

    #[tokio::test]
    async fn test_add_user_book() {
        let (repo, user_id, book) = seeded().await;

        let entry = repo
            .add_user_book(user_id, book.id, ReadingStatus::Reading)
            .await
            .unwrap();
        assert_eq!(entry.status, ReadingStatus::Reading);
        assert!(entry.started_at.is_some());
        assert!(entry.completed_at.is_none());
        assert_eq!(entry.book.as_ref().map(|b| b.id), Some(book.id));

        let err = repo
            .add_user_book(user_id, book.id, ReadingStatus::Wishlist)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let err = repo
            .add_user_book(user_id, 9999, ReadingStatus::Wishlist)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref m) if m == "book not found"));
    }

    #[tokio::test]
    async fn test_update_user_book() {
        let (repo, user_id, book) = seeded().await;
        let entry = repo
            .add_user_book(user_id, book.id, ReadingStatus::Wishlist)
            .await
            .unwrap();

        let updated = repo
            .update_user_book(
                user_id,
                entry.id,
                UserBookUpdate {
                    status: Some(ReadingStatus::Completed),
                    pages_read: Some(304),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, ReadingStatus::Completed);
        assert_eq!(updated.pages_read, Some(304));
        assert!(updated.completed_at.is_some());
        assert!(updated.progress_updated_at.is_some());
        assert!(updated.updated_at >= entry.updated_at);

        let cleared = repo
            .update_user_book(
                user_id,
                entry.id,
                UserBookUpdate {
                    completed_at: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(cleared.completed_at, None);
        assert_eq!(cleared.pages_read, Some(304));
    }

    #[tokio::test]
    async fn test_update_user_book_errors() {
        let (repo, user_id, book) = seeded().await;
        let entry = repo
            .add_user_book(user_id, book.id, ReadingStatus::Wishlist)
            .await
            .unwrap();

        let err = repo
            .update_user_book(user_id, entry.id, UserBookUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(ref m) if m == "no fields to update"));

        // someone else's entry looks the same as a missing one
        let err = repo
            .update_user_book(
                user_id + 1,
                entry.id,
                UserBookUpdate {
                    pages_read: Some(1),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_filters_and_orders() {
        let db = fixtures::db();
        let ada = fixtures::user(&db, "ada", Role::User).await;
        let first = fixtures::book(&db, "9780000000001").await;
        let second = fixtures::book(&db, "9780000000002").await;
        let repo = UserBookRepository::new(db);

        repo.add_user_book(ada.id, first.id, ReadingStatus::Reading)
            .await
            .unwrap();
        repo.add_user_book(ada.id, second.id, ReadingStatus::Wishlist)
            .await
            .unwrap();

        let all = repo
            .get_user_books_by_user_id(ada.id, None, Page::default())
            .await
            .unwrap();
        let ids: Vec<i64> = all.iter().map(|e| e.book.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);

        let reading = repo
            .get_user_books_by_user_id(ada.id, Some(ReadingStatus::Reading), Page::default())
            .await
            .unwrap();
        assert_eq!(reading.len(), 1);
        assert_eq!(reading[0].book.id, first.id);
        assert_eq!(reading[0].book.chapters.len(), 2);

        let second_page = repo
            .get_user_books_by_user_id(ada.id, None, Page::new(2, 1))
            .await
            .unwrap();
        assert_eq!(second_page.len(), 1);
        assert_eq!(second_page[0].book.id, first.id);
    }

    #[tokio::test]
    async fn test_delete_user_book() {
        let (repo, user_id, book) = seeded().await;
        let entry = repo
            .add_user_book(user_id, book.id, ReadingStatus::Wishlist)
            .await
            .unwrap();

        assert!(matches!(
            repo.delete_user_book(user_id + 1, entry.id).await,
            Err(AppError::NotFound(_))
        ));
        repo.delete_user_book(user_id, entry.id).await.unwrap();
        assert!(matches!(
            repo.delete_user_book(user_id, entry.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
