//! Newsletter subscriber repository
//!
//! The unique index on `newsletters.email` is the source of truth for
//! duplicates: `create` reports a unique violation as `None` rather than
//! an error.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use crate::db::{on_pool, DynDatabasePool, LastInsertId};
use crate::models::Newsletter;

const COLUMNS: &str = "id, email, created_at, updated_at";

/// Newsletter repository trait
#[async_trait]
pub trait NewsletterRepository: Send + Sync {
    /// Insert a subscriber. Returns `None` when the email is already present.
    async fn create(&self, email: &str) -> Result<Option<Newsletter>>;

    async fn exists_by_email(&self, email: &str) -> Result<bool>;

    /// Subscribers, newest first
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Newsletter>>;

    async fn count(&self) -> Result<i64>;

    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based newsletter repository for SQLite and MySQL
pub struct SqlxNewsletterRepository {
    pool: DynDatabasePool,
}

impl SqlxNewsletterRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn NewsletterRepository> {
        Arc::new(Self::new(pool))
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl NewsletterRepository for SqlxNewsletterRepository {
    async fn create(&self, email: &str) -> Result<Option<Newsletter>> {
        let now = Utc::now();
        let result = on_pool!(self.pool, |conn| {
            sqlx::query("INSERT INTO newsletters (email, created_at, updated_at) VALUES (?, ?, ?)")
                .bind(email)
                .bind(now)
                .bind(now)
                .execute(conn)
                .await
                .map(|done| done.last_id())
        });

        match result {
            Ok(id) => Ok(Some(Newsletter {
                id,
                email: email.to_string(),
                created_at: now,
                updated_at: now,
            })),
            Err(err) if is_unique_violation(&err) => Ok(None),
            Err(err) => Err(err).context("Failed to create newsletter subscriber"),
        }
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool> {
        let count = on_pool!(self.pool, |conn| {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM newsletters WHERE email = ?")
                .bind(email)
                .fetch_one(conn)
                .await
                .context("Failed to look up newsletter subscriber")?
        });
        Ok(count > 0)
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Newsletter>> {
        let sql = format!(
            "SELECT {} FROM newsletters ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            COLUMNS
        );
        let subscribers = on_pool!(self.pool, |conn| {
            sqlx::query_as::<_, Newsletter>(&sql)
                .bind(limit)
                .bind(offset)
                .fetch_all(conn)
                .await
                .context("Failed to list newsletter subscribers")?
        });
        Ok(subscribers)
    }

    async fn count(&self) -> Result<i64> {
        let count = on_pool!(self.pool, |conn| {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM newsletters")
                .fetch_one(conn)
                .await
                .context("Failed to count newsletter subscribers")?
        });
        Ok(count)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = on_pool!(self.pool, |conn| {
            sqlx::query("DELETE FROM newsletters WHERE id = ?")
                .bind(id)
                .execute(conn)
                .await
                .context("Failed to delete newsletter subscriber")?
                .rows_affected()
        });
        Ok(affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::fixtures;

    #[tokio::test]
    async fn test_duplicate_email_returns_none() {
        let pool = fixtures::migrated_pool().await;
        let repo = SqlxNewsletterRepository::new(pool);

        assert!(repo.create("reader@example.com").await.unwrap().is_some());
        assert!(repo.create("reader@example.com").await.unwrap().is_none());
        assert_eq!(repo.count().await.unwrap(), 1);
        assert!(repo.exists_by_email("reader@example.com").await.unwrap());
        assert!(!repo.exists_by_email("other@example.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let pool = fixtures::migrated_pool().await;
        let repo = SqlxNewsletterRepository::new(pool);

        let first = repo.create("a@example.com").await.unwrap().unwrap();
        repo.create("b@example.com").await.unwrap();

        let listed = repo.list(10, 0).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].email, "b@example.com");

        assert!(repo.delete(first.id).await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 1);
    }
}
