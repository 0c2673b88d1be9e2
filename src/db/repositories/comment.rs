//! Comment repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use crate::db::{on_pool, DynDatabasePool, LastInsertId};
use crate::models::{Comment, NewComment};

const COLUMNS: &str = "id, post_id, comment, name, email, created_at, updated_at";

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn create(&self, comment: &NewComment) -> Result<Comment>;

    /// Comments on a post, oldest first
    async fn list_for_post(&self, post_id: i64) -> Result<Vec<Comment>>;

    /// All comments, newest first
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Comment>>;

    async fn count(&self) -> Result<i64>;

    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based comment repository for SQLite and MySQL
pub struct SqlxCommentRepository {
    pool: DynDatabasePool,
}

impl SqlxCommentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, comment: &NewComment) -> Result<Comment> {
        let now = Utc::now();
        let id = on_pool!(self.pool, |conn| {
            sqlx::query(
                "INSERT INTO comments (post_id, comment, name, email, created_at, updated_at) \
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(comment.post_id)
            .bind(&comment.comment)
            .bind(&comment.name)
            .bind(&comment.email)
            .bind(now)
            .bind(now)
            .execute(conn)
            .await
            .context("Failed to create comment")?
            .last_id()
        });

        Ok(Comment {
            id,
            post_id: comment.post_id,
            comment: comment.comment.clone(),
            name: comment.name.clone(),
            email: comment.email.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    async fn list_for_post(&self, post_id: i64) -> Result<Vec<Comment>> {
        let sql = format!(
            "SELECT {} FROM comments WHERE post_id = ? ORDER BY created_at ASC, id ASC",
            COLUMNS
        );
        let comments = on_pool!(self.pool, |conn| {
            sqlx::query_as::<_, Comment>(&sql)
                .bind(post_id)
                .fetch_all(conn)
                .await
                .context("Failed to list comments for post")?
        });
        Ok(comments)
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Comment>> {
        let sql = format!(
            "SELECT {} FROM comments ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            COLUMNS
        );
        let comments = on_pool!(self.pool, |conn| {
            sqlx::query_as::<_, Comment>(&sql)
                .bind(limit)
                .bind(offset)
                .fetch_all(conn)
                .await
                .context("Failed to list comments")?
        });
        Ok(comments)
    }

    async fn count(&self) -> Result<i64> {
        let count = on_pool!(self.pool, |conn| {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM comments")
                .fetch_one(conn)
                .await
                .context("Failed to count comments")?
        });
        Ok(count)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = on_pool!(self.pool, |conn| {
            sqlx::query("DELETE FROM comments WHERE id = ?")
                .bind(id)
                .execute(conn)
                .await
                .context("Failed to delete comment")?
                .rows_affected()
        });
        Ok(affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::fixtures;

    fn new_comment(post_id: i64, body: &str) -> NewComment {
        NewComment {
            post_id,
            name: "Reader".into(),
            email: "reader@example.com".into(),
            comment: body.into(),
        }
    }

    #[tokio::test]
    async fn test_comments_listed_oldest_first() {
        let pool = fixtures::migrated_pool().await;
        let author = fixtures::insert_user(&pool, "author", true).await;
        let category = fixtures::insert_category(&pool, "News").await;
        let post = fixtures::insert_published_post(&pool, author.id, category.id, "p").await;
        let other = fixtures::insert_published_post(&pool, author.id, category.id, "q").await;
        let repo = SqlxCommentRepository::new(pool);

        repo.create(&new_comment(post.id, "first")).await.unwrap();
        repo.create(&new_comment(post.id, "second")).await.unwrap();
        repo.create(&new_comment(other.id, "elsewhere")).await.unwrap();

        let bodies: Vec<_> = repo
            .list_for_post(post.id)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.comment)
            .collect();
        assert_eq!(bodies, vec!["first", "second"]);

        assert_eq!(repo.count().await.unwrap(), 3);
        let newest = repo.list(1, 0).await.unwrap();
        assert_eq!(newest[0].comment, "elsewhere");
    }

    #[tokio::test]
    async fn test_delete_comment() {
        let pool = fixtures::migrated_pool().await;
        let author = fixtures::insert_user(&pool, "author", true).await;
        let category = fixtures::insert_category(&pool, "News").await;
        let post = fixtures::insert_published_post(&pool, author.id, category.id, "p").await;
        let repo = SqlxCommentRepository::new(pool);

        let comment = repo.create(&new_comment(post.id, "bye")).await.unwrap();
        assert!(repo.delete(comment.id).await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 0);
    }
}
