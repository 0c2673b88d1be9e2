//! User repository
//!
//! Staff accounts. Passwords arrive already hashed.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use crate::db::{on_pool, DynDatabasePool, LastInsertId};
use crate::models::User;

const COLUMNS: &str = "id, username, email, password_hash, is_staff, created_at, updated_at";

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        is_staff: bool,
    ) -> Result<User>;

    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn count(&self) -> Result<i64>;
}

/// SQLx-based user repository for SQLite and MySQL
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        is_staff: bool,
    ) -> Result<User> {
        let now = Utc::now();
        let id = on_pool!(self.pool, |conn| {
            sqlx::query(
                "INSERT INTO users (username, email, password_hash, is_staff, created_at, updated_at) \
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(username)
            .bind(email)
            .bind(password_hash)
            .bind(is_staff)
            .bind(now)
            .bind(now)
            .execute(conn)
            .await
            .context("Failed to create user")?
            .last_id()
        });

        Ok(User {
            id,
            username: username.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            is_staff,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", COLUMNS);
        let user = on_pool!(self.pool, |conn| {
            sqlx::query_as::<_, User>(&sql)
                .bind(id)
                .fetch_optional(conn)
                .await
                .context("Failed to get user by id")?
        });
        Ok(user)
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE username = ?", COLUMNS);
        let user = on_pool!(self.pool, |conn| {
            sqlx::query_as::<_, User>(&sql)
                .bind(username)
                .fetch_optional(conn)
                .await
                .context("Failed to get user by username")?
        });
        Ok(user)
    }

    async fn count(&self) -> Result<i64> {
        let count = on_pool!(self.pool, |conn| {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
                .fetch_one(conn)
                .await
                .context("Failed to count users")?
        });
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::fixtures;

    #[tokio::test]
    async fn test_create_and_lookup() {
        let pool = fixtures::migrated_pool().await;
        let repo = SqlxUserRepository::new(pool);

        assert_eq!(repo.count().await.unwrap(), 0);
        let user = repo
            .create("editor", "editor@example.com", "hash", true)
            .await
            .unwrap();

        let by_id = repo.get_by_id(user.id).await.unwrap().unwrap();
        assert!(by_id.is_staff);
        let by_name = repo.get_by_username("editor").await.unwrap().unwrap();
        assert_eq!(by_name.id, user.id);
        assert!(repo.get_by_username("nobody").await.unwrap().is_none());
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let pool = fixtures::migrated_pool().await;
        let repo = SqlxUserRepository::new(pool);

        repo.create("editor", "a@example.com", "hash", false).await.unwrap();
        assert!(repo.create("editor", "b@example.com", "hash", false).await.is_err());
    }
}
