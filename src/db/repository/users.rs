use super::{constraint_violation, UserStore, Violation};
use crate::auth::tokens::hash_token;
use crate::core::error::{AppError, Result};
use crate::db::manager::DatabaseManager;
use crate::db::models::{NewUser, Role, User};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use std::sync::Arc;

const USER_COLUMNS: &str = "id, username, email, password_hash, role, created_at";

/// Map a user starting at column `offset`, so joins can reuse it
pub(crate) fn user_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(offset)?,
        username: row.get(offset + 1)?,
        email: row.get(offset + 2)?,
        password_hash: row.get(offset + 3)?,
        role: row.get(offset + 4)?,
        created_at: row.get(offset + 5)?,
    })
}

fn map_user_conflict(err: rusqlite::Error) -> AppError {
    let conflict = match constraint_violation(&err) {
        Some(Violation::Unique(msg)) if msg.contains("users.email") => Some("email already in use"),
        Some(Violation::Unique(msg)) if msg.contains("users.username") => {
            Some("username already taken")
        }
        _ => None,
    };
    match conflict {
        Some(msg) => AppError::Conflict(msg.to_string()),
        None => AppError::DatabaseError(err),
    }
}

/// SQLite-backed [`UserStore`]
pub struct UserRepository {
    db: Arc<DatabaseManager>,
}

impl UserRepository {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        self.db
            .execute(move |conn| {
                conn.query_row(
                    &format!(
                        "INSERT INTO users (username, email, password_hash, role, created_at) \
                         VALUES (?1, ?2, ?3, ?4, ?5) RETURNING {}",
                        USER_COLUMNS
                    ),
                    params![user.username, user.email, user.password_hash, user.role, Utc::now()],
                    |row| user_from_row(row, 0),
                )
                .map_err(map_user_conflict)
            })
            .await
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let username = username.to_string();
        self.db
            .execute(move |conn| {
                Ok(conn
                    .query_row(
                        &format!("SELECT {} FROM users WHERE username = ?1", USER_COLUMNS),
                        [&username],
                        |row| user_from_row(row, 0),
                    )
                    .optional()?)
            })
            .await
    }

    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>> {
        self.db
            .execute(move |conn| {
                Ok(conn
                    .query_row(
                        &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
                        [id],
                        |row| user_from_row(row, 0),
                    )
                    .optional()?)
            })
            .await
    }

    async fn update_user(&self, id: i64, username: String, email: String) -> Result<User> {
        self.db
            .execute(move |conn| {
                conn.query_row(
                    &format!(
                        "UPDATE users SET username = ?1, email = ?2 WHERE id = ?3 RETURNING {}",
                        USER_COLUMNS
                    ),
                    params![username, email, id],
                    |row| user_from_row(row, 0),
                )
                .optional()
                .map_err(map_user_conflict)?
                .ok_or_else(|| AppError::NotFound("user not found".to_string()))
            })
            .await
    }

    async fn get_user_for_token(&self, scope: &str, plaintext: &str) -> Result<Option<User>> {
        let hash = hash_token(plaintext);
        let scope = scope.to_string();
        self.db
            .execute(move |conn| {
                Ok(conn
                    .query_row(
                        "SELECT u.id, u.username, u.email, u.password_hash, u.role, u.created_at \
                         FROM users u \
                         INNER JOIN tokens t ON t.user_id = u.id \
                         WHERE t.hash = ?1 AND t.scope = ?2 AND t.expiry > ?3",
                        params![&hash[..], scope, Utc::now()],
                        |row| user_from_row(row, 0),
                    )
                    .optional()?)
            })
            .await
    }

    async fn count_admins(&self) -> Result<i64> {
        self.db
            .execute(|conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM users WHERE role = ?1",
                    [Role::Admin],
                    |row| row.get(0),
                )?)
            })
            .await
    }
}
