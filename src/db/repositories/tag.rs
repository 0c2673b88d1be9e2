//! Tag repository
//!
//! Tags and the `post_tags` association table.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use crate::db::{on_pool, DynDatabasePool, LastInsertId};
use crate::models::Tag;

const COLUMNS: &str = "id, name, created_at, updated_at";

/// Tag repository trait
#[async_trait]
pub trait TagRepository: Send + Sync {
    async fn create(&self, name: &str) -> Result<Tag>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>>;

    /// All tags in creation order
    async fn list(&self) -> Result<Vec<Tag>>;

    /// The first `limit` tags in creation order
    async fn list_limited(&self, limit: i64) -> Result<Vec<Tag>>;

    /// Tags attached to a post, ordered by name
    async fn list_for_post(&self, post_id: i64) -> Result<Vec<Tag>>;

    /// How many of `ids` exist
    async fn count_existing(&self, ids: &[i64]) -> Result<i64>;

    async fn update(&self, id: i64, name: &str) -> Result<Option<Tag>>;

    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based tag repository for SQLite and MySQL
pub struct SqlxTagRepository {
    pool: DynDatabasePool,
}

impl SqlxTagRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TagRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TagRepository for SqlxTagRepository {
    async fn create(&self, name: &str) -> Result<Tag> {
        let now = Utc::now();
        let id = on_pool!(self.pool, |conn| {
            sqlx::query("INSERT INTO tags (name, created_at, updated_at) VALUES (?, ?, ?)")
                .bind(name)
                .bind(now)
                .bind(now)
                .execute(conn)
                .await
                .context("Failed to create tag")?
                .last_id()
        });

        Ok(Tag {
            id,
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>> {
        let sql = format!("SELECT {} FROM tags WHERE id = ?", COLUMNS);
        let tag = on_pool!(self.pool, |conn| {
            sqlx::query_as::<_, Tag>(&sql)
                .bind(id)
                .fetch_optional(conn)
                .await
                .context("Failed to get tag by id")?
        });
        Ok(tag)
    }

    async fn list(&self) -> Result<Vec<Tag>> {
        let sql = format!("SELECT {} FROM tags ORDER BY id ASC", COLUMNS);
        let tags = on_pool!(self.pool, |conn| {
            sqlx::query_as::<_, Tag>(&sql)
                .fetch_all(conn)
                .await
                .context("Failed to list tags")?
        });
        Ok(tags)
    }

    async fn list_limited(&self, limit: i64) -> Result<Vec<Tag>> {
        let sql = format!("SELECT {} FROM tags ORDER BY id ASC LIMIT ?", COLUMNS);
        let tags = on_pool!(self.pool, |conn| {
            sqlx::query_as::<_, Tag>(&sql)
                .bind(limit)
                .fetch_all(conn)
                .await
                .context("Failed to list tags")?
        });
        Ok(tags)
    }

    async fn list_for_post(&self, post_id: i64) -> Result<Vec<Tag>> {
        let sql = "SELECT t.id, t.name, t.created_at, t.updated_at FROM tags t \
                   JOIN post_tags pt ON pt.tag_id = t.id \
                   WHERE pt.post_id = ? ORDER BY t.name ASC, t.id ASC";
        let tags = on_pool!(self.pool, |conn| {
            sqlx::query_as::<_, Tag>(sql)
                .bind(post_id)
                .fetch_all(conn)
                .await
                .context("Failed to list tags for post")?
        });
        Ok(tags)
    }

    async fn count_existing(&self, ids: &[i64]) -> Result<i64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("SELECT COUNT(*) FROM tags WHERE id IN ({})", placeholders);
        let count = on_pool!(self.pool, |conn| {
            let mut query = sqlx::query_scalar::<_, i64>(&sql);
            for id in ids {
                query = query.bind(*id);
            }
            query
                .fetch_one(conn)
                .await
                .context("Failed to count tags")?
        });
        Ok(count)
    }

    async fn update(&self, id: i64, name: &str) -> Result<Option<Tag>> {
        let now = Utc::now();
        let affected = on_pool!(self.pool, |conn| {
            sqlx::query("UPDATE tags SET name = ?, updated_at = ? WHERE id = ?")
                .bind(name)
                .bind(now)
                .bind(id)
                .execute(conn)
                .await
                .context("Failed to update tag")?
                .rows_affected()
        });

        if affected == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = on_pool!(self.pool, |conn| {
            sqlx::query("DELETE FROM tags WHERE id = ?")
                .bind(id)
                .execute(conn)
                .await
                .context("Failed to delete tag")?
                .rows_affected()
        });
        Ok(affected > 0)
    }
}
