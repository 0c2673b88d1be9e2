//! Category repository
//!
//! This module provides:
//! - `CategoryRepository` trait defining the interface for category data access
//! - `SqlxCategoryRepository` implementing the trait for SQLite and MySQL

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use crate::db::{on_pool, DynDatabasePool, LastInsertId};
use crate::models::Category;

const COLUMNS: &str = "id, name, created_at, updated_at";

/// Category repository trait
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn create(&self, name: &str) -> Result<Category>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>>;

    /// All categories ordered by name
    async fn list(&self) -> Result<Vec<Category>>;

    /// The first `limit` categories by name
    async fn list_limited(&self, limit: i64) -> Result<Vec<Category>>;

    /// Rename a category. Returns `None` if it does not exist.
    async fn update(&self, id: i64, name: &str) -> Result<Option<Category>>;

    /// Delete a category and, by cascade, its posts. Returns false if it did
    /// not exist.
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based category repository for SQLite and MySQL
pub struct SqlxCategoryRepository {
    pool: DynDatabasePool,
}

impl SqlxCategoryRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CategoryRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CategoryRepository for SqlxCategoryRepository {
    async fn create(&self, name: &str) -> Result<Category> {
        let now = Utc::now();
        let id = on_pool!(self.pool, |conn| {
            sqlx::query("INSERT INTO categories (name, created_at, updated_at) VALUES (?, ?, ?)")
                .bind(name)
                .bind(now)
                .bind(now)
                .execute(conn)
                .await
                .context("Failed to create category")?
                .last_id()
        });

        Ok(Category {
            id,
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>> {
        let sql = format!("SELECT {} FROM categories WHERE id = ?", COLUMNS);
        let category = on_pool!(self.pool, |conn| {
            sqlx::query_as::<_, Category>(&sql)
                .bind(id)
                .fetch_optional(conn)
                .await
                .context("Failed to get category by id")?
        });
        Ok(category)
    }

    async fn list(&self) -> Result<Vec<Category>> {
        let sql = format!("SELECT {} FROM categories ORDER BY name ASC, id ASC", COLUMNS);
        let categories = on_pool!(self.pool, |conn| {
            sqlx::query_as::<_, Category>(&sql)
                .fetch_all(conn)
                .await
                .context("Failed to list categories")?
        });
        Ok(categories)
    }

    async fn list_limited(&self, limit: i64) -> Result<Vec<Category>> {
        let sql = format!(
            "SELECT {} FROM categories ORDER BY name ASC, id ASC LIMIT ?",
            COLUMNS
        );
        let categories = on_pool!(self.pool, |conn| {
            sqlx::query_as::<_, Category>(&sql)
                .bind(limit)
                .fetch_all(conn)
                .await
                .context("Failed to list categories")?
        });
        Ok(categories)
    }

    async fn update(&self, id: i64, name: &str) -> Result<Option<Category>> {
        let now = Utc::now();
        let affected = on_pool!(self.pool, |conn| {
            sqlx::query("UPDATE categories SET name = ?, updated_at = ? WHERE id = ?")
                .bind(name)
                .bind(now)
                .bind(id)
                .execute(conn)
                .await
                .context("Failed to update category")?
                .rows_affected()
        });

        if affected == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = on_pool!(self.pool, |conn| {
            sqlx::query("DELETE FROM categories WHERE id = ?")
                .bind(id)
                .execute(conn)
                .await
                .context("Failed to delete category")?
                .rows_affected()
        });
        Ok(affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{fixtures, PostRepository, SqlxPostRepository};

    async fn setup_test_repo() -> (DynDatabasePool, SqlxCategoryRepository) {
        let pool = fixtures::migrated_pool().await;
        let repo = SqlxCategoryRepository::new(pool.clone());
        (pool, repo)
    }

    #[tokio::test]
    async fn test_create_and_get_category() {
        let (_pool, repo) = setup_test_repo().await;

        let created = repo.create("Politics").await.expect("Failed to create category");
        assert!(created.id > 0);

        let found = repo
            .get_by_id(created.id)
            .await
            .expect("Failed to get category")
            .expect("Category not found");
        assert_eq!(found.name, "Politics");
    }

    #[tokio::test]
    async fn test_get_category_not_found() {
        let (_pool, repo) = setup_test_repo().await;
        assert!(repo.get_by_id(99999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_ordered_by_name() {
        let (_pool, repo) = setup_test_repo().await;
        for name in ["Tech", "Business", "Sports", "Art"] {
            repo.create(name).await.unwrap();
        }

        let names: Vec<_> = repo.list().await.unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Art", "Business", "Sports", "Tech"]);

        let first: Vec<_> = repo
            .list_limited(2)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(first, vec!["Art", "Business"]);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let (_pool, repo) = setup_test_repo().await;
        let created = repo.create("Old").await.unwrap();

        let updated = repo.update(created.id, "New").await.unwrap().unwrap();
        assert_eq!(updated.name, "New");
        assert!(repo.update(424242, "Nope").await.unwrap().is_none());

        assert!(repo.delete(created.id).await.unwrap());
        assert!(!repo.delete(created.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_cascades_to_posts() {
        let (pool, repo) = setup_test_repo().await;
        let author = fixtures::insert_user(&pool, "author", true).await;
        let category = repo.create("Doomed").await.unwrap();
        let post = fixtures::insert_published_post(&pool, author.id, category.id, "Gone soon").await;

        repo.delete(category.id).await.unwrap();

        let posts = SqlxPostRepository::new(pool.clone());
        assert!(posts.get_by_id(post.id).await.unwrap().is_none());
    }
}
