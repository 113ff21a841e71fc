use super::TokenStore;
use crate::auth::tokens::generate_token;
use crate::core::error::Result;
use crate::db::manager::DatabaseManager;
use crate::db::models::Token;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::params;
use std::sync::Arc;

/// SQLite-backed [`TokenStore`]
pub struct TokenRepository {
    db: Arc<DatabaseManager>,
}

impl TokenRepository {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TokenStore for TokenRepository {
    async fn create_new_token(
        &self,
        user_id: i64,
        ttl: chrono::Duration,
        scope: &str,
    ) -> Result<Token> {
        let token = generate_token(user_id, ttl, scope);
        self.insert(token.clone()).await?;
        Ok(token)
    }

    async fn insert(&self, token: Token) -> Result<()> {
        self.db
            .execute(move |conn| {
                conn.execute(
                    "INSERT INTO tokens (hash, user_id, expiry, scope) VALUES (?1, ?2, ?3, ?4)",
                    params![token.hash, token.user_id, token.expiry, token.scope],
                )?;
                Ok(())
            })
            .await
    }

    async fn delete_all_for_user(&self, scope: &str, user_id: i64) -> Result<u64> {
        let scope = scope.to_string();
        self.db
            .execute(move |conn| {
                let deleted = conn.execute(
                    "DELETE FROM tokens WHERE scope = ?1 AND user_id = ?2",
                    params![scope, user_id],
                )?;
                Ok(deleted as u64)
            })
            .await
    }

    async fn delete_expired(&self) -> Result<u64> {
        self.db
            .execute(|conn| {
                let deleted =
                    conn.execute("DELETE FROM tokens WHERE expiry <= ?1", [Utc::now()])?;
                Ok(deleted as u64)
            })
            .await
    }
}
