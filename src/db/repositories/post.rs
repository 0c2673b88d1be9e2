//! Post repository
//!
//! Listing queries arrive as a [`PostQuery`] and are rendered to SQL here.
//! View counting is a single `UPDATE ... SET views_count = views_count + 1`
//! so concurrent readers never lose increments.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::db::{bind_values, on_pool, DynDatabasePool, LastInsertId, PostQuery};
use crate::models::{CreatePostInput, Post, PostStatus, UpdatePostInput};

const COLUMNS: &str = "p.id, p.title, p.content, p.featured_image, p.author_id, p.category_id, \
                       p.status, p.views_count, p.published_at, p.created_at, p.updated_at";

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Posts matching a query, in the query's order and window
    async fn find(&self, query: &PostQuery) -> Result<Vec<Post>>;

    /// Number of posts matching a query's filters
    async fn count(&self, query: &PostQuery) -> Result<i64>;

    /// First post matching a query
    async fn find_one(&self, query: &PostQuery) -> Result<Option<Post>> {
        let mut posts = self.find(&query.clone().limit(1)).await?;
        Ok(posts.pop())
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;

    async fn create(&self, author_id: i64, input: &CreatePostInput) -> Result<Post>;

    /// Apply a partial update. Returns `None` if the post does not exist.
    async fn update(&self, id: i64, input: &UpdatePostInput) -> Result<Option<Post>>;

    /// Set or clear the publication time
    async fn set_published_at(&self, id: i64, at: Option<DateTime<Utc>>) -> Result<Option<Post>>;

    async fn delete(&self, id: i64) -> Result<bool>;

    /// Replace the tag set of a post
    async fn set_tags(&self, post_id: i64, tag_ids: &[i64]) -> Result<()>;

    /// Add one to `views_count`. Returns false if the post does not exist.
    async fn increment_views(&self, id: i64) -> Result<bool>;
}

/// SQLx-based post repository for SQLite and MySQL
pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn find(&self, query: &PostQuery) -> Result<Vec<Post>> {
        let parts = query.to_sql();
        let sql = format!(
            "SELECT {} FROM posts p {} {}",
            COLUMNS, parts.where_clause, parts.order_clause
        );
        tracing::debug!(%sql, "Finding posts");

        let posts = on_pool!(self.pool, |conn| {
            bind_values!(sqlx::query_as::<_, Post>(&sql), &parts.values)
                .fetch_all(conn)
                .await
                .context("Failed to query posts")?
        });
        Ok(posts)
    }

    async fn count(&self, query: &PostQuery) -> Result<i64> {
        let parts = query.for_count().to_sql();
        let sql = format!("SELECT COUNT(*) FROM posts p {}", parts.where_clause);

        // for_count() carries no limit, so every bound value belongs to WHERE
        let count = on_pool!(self.pool, |conn| {
            bind_values!(sqlx::query_scalar::<_, i64>(&sql), &parts.values)
                .fetch_one(conn)
                .await
                .context("Failed to count posts")?
        });
        Ok(count)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        let sql = format!("SELECT {} FROM posts p WHERE p.id = ?", COLUMNS);
        let post = on_pool!(self.pool, |conn| {
            sqlx::query_as::<_, Post>(&sql)
                .bind(id)
                .fetch_optional(conn)
                .await
                .context("Failed to get post by id")?
        });
        Ok(post)
    }

    async fn create(&self, author_id: i64, input: &CreatePostInput) -> Result<Post> {
        let now = Utc::now();
        let published_at = input.resolved_published_at(now);

        let id = on_pool!(self.pool, |conn| {
            sqlx::query(
                "INSERT INTO posts (title, content, featured_image, author_id, category_id, \
                 status, views_count, published_at, created_at, updated_at) \
                 VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?, ?)",
            )
            .bind(&input.title)
            .bind(&input.content)
            .bind(&input.featured_image)
            .bind(author_id)
            .bind(input.category_id)
            .bind(input.status.as_str())
            .bind(published_at)
            .bind(now)
            .bind(now)
            .execute(conn)
            .await
            .context("Failed to create post")?
            .last_id()
        });

        if !input.tag_ids.is_empty() {
            self.set_tags(id, &input.tag_ids).await?;
        }

        Ok(Post {
            id,
            title: input.title.clone(),
            content: input.content.clone(),
            featured_image: input.featured_image.clone(),
            author_id,
            category_id: input.category_id,
            status: input.status,
            views_count: 0,
            published_at,
            created_at: now,
            updated_at: now,
        })
    }

    async fn update(&self, id: i64, input: &UpdatePostInput) -> Result<Option<Post>> {
        let Some(current) = self.get_by_id(id).await? else {
            return Ok(None);
        };

        let title = input.title.as_ref().unwrap_or(&current.title);
        let content = input.content.as_ref().unwrap_or(&current.content);
        let featured_image = input
            .featured_image
            .as_ref()
            .unwrap_or(&current.featured_image);
        let category_id = input.category_id.unwrap_or(current.category_id);
        let status = input.status.unwrap_or(current.status);
        let now = Utc::now();

        on_pool!(self.pool, |conn| {
            sqlx::query(
                "UPDATE posts SET title = ?, content = ?, featured_image = ?, category_id = ?, \
                 status = ?, updated_at = ? WHERE id = ?",
            )
            .bind(title)
            .bind(content)
            .bind(featured_image)
            .bind(category_id)
            .bind(status.as_str())
            .bind(now)
            .bind(id)
            .execute(conn)
            .await
            .context("Failed to update post")?;
        });

        if let Some(tag_ids) = &input.tag_ids {
            self.set_tags(id, tag_ids).await?;
        }

        self.get_by_id(id).await
    }

    async fn set_published_at(&self, id: i64, at: Option<DateTime<Utc>>) -> Result<Option<Post>> {
        let now = Utc::now();
        let affected = on_pool!(self.pool, |conn| {
            sqlx::query("UPDATE posts SET published_at = ?, updated_at = ? WHERE id = ?")
                .bind(at)
                .bind(now)
                .bind(id)
                .execute(conn)
                .await
                .context("Failed to set post publication time")?
                .rows_affected()
        });

        if affected == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = on_pool!(self.pool, |conn| {
            sqlx::query("DELETE FROM posts WHERE id = ?")
                .bind(id)
                .execute(conn)
                .await
                .context("Failed to delete post")?
                .rows_affected()
        });
        Ok(affected > 0)
    }

    async fn set_tags(&self, post_id: i64, tag_ids: &[i64]) -> Result<()> {
        let mut unique = tag_ids.to_vec();
        unique.sort_unstable();
        unique.dedup();

        on_pool!(self.pool, |conn| {
            let mut tx = conn.begin().await.context("Failed to begin transaction")?;

            sqlx::query("DELETE FROM post_tags WHERE post_id = ?")
                .bind(post_id)
                .execute(&mut *tx)
                .await
                .context("Failed to clear post tags")?;

            for tag_id in &unique {
                sqlx::query("INSERT INTO post_tags (post_id, tag_id) VALUES (?, ?)")
                    .bind(post_id)
                    .bind(*tag_id)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to attach tag to post")?;
            }

            tx.commit().await.context("Failed to commit post tags")?;
        });
        Ok(())
    }

    async fn increment_views(&self, id: i64) -> Result<bool> {
        let affected = on_pool!(self.pool, |conn| {
            sqlx::query("UPDATE posts SET views_count = views_count + 1 WHERE id = ?")
                .bind(id)
                .execute(conn)
                .await
                .context("Failed to record post view")?
                .rows_affected()
        });
        Ok(affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{fixtures, SqlxTagRepository, TagRepository};
    use crate::db::{PostFilter, PostOrder};
    use chrono::Duration;

    struct Seed {
        pool: DynDatabasePool,
        repo: SqlxPostRepository,
        author: i64,
        category: i64,
    }

    async fn seed() -> Seed {
        let pool = fixtures::migrated_pool().await;
        let author = fixtures::insert_user(&pool, "author", true).await.id;
        let category = fixtures::insert_category(&pool, "News").await.id;
        let repo = SqlxPostRepository::new(pool.clone());
        Seed {
            pool,
            repo,
            author,
            category,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let s = seed().await;
        let input = CreatePostInput::new("Headline", "<p>Body</p>", s.category)
            .with_featured_image("post_images/2024/01/01/a.png");

        let created = s.repo.create(s.author, &input).await.unwrap();
        let found = s.repo.get_by_id(created.id).await.unwrap().unwrap();

        assert_eq!(found.title, "Headline");
        assert_eq!(found.status, PostStatus::Active);
        assert_eq!(found.views_count, 0);
        assert!(found.published_at.is_none());
        assert!(!found.is_visible());
    }

    #[tokio::test]
    async fn test_visible_filter_excludes_drafts_and_inactive() {
        let s = seed().await;
        let now = Utc::now();

        let visible = s
            .repo
            .create(s.author, &CreatePostInput::new("visible", "c", s.category).published_at(now))
            .await
            .unwrap();
        s.repo
            .create(s.author, &CreatePostInput::new("draft", "c", s.category))
            .await
            .unwrap();
        s.repo
            .create(
                s.author,
                &CreatePostInput::new("inactive", "c", s.category)
                    .published_at(now)
                    .with_status(PostStatus::Inactive),
            )
            .await
            .unwrap();

        let found = s.repo.find(&PostQuery::visible()).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, visible.id);
        assert_eq!(s.repo.count(&PostQuery::visible()).await.unwrap(), 1);
        assert_eq!(s.repo.count(&PostQuery::all()).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_order_and_window() {
        let s = seed().await;
        let base = Utc::now() - Duration::days(1);
        for i in 0..5 {
            s.repo
                .create(
                    s.author,
                    &CreatePostInput::new(format!("p{}", i), "c", s.category)
                        .published_at(base + Duration::minutes(i)),
                )
                .await
                .unwrap();
        }

        let query = PostQuery::visible()
            .order_by(PostOrder::PublishedDesc)
            .limit(2)
            .offset(1);
        let titles: Vec<_> = s
            .repo
            .find(&query)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(titles, vec!["p3", "p2"]);
        assert_eq!(s.repo.count(&query).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_text_search_matches_tags_once() {
        let s = seed().await;
        let tags = SqlxTagRepository::new(s.pool.clone());

        let post = s
            .repo
            .create(
                s.author,
                &CreatePostInput::new("Plain title", "plain body", s.category)
                    .published_at(Utc::now()),
            )
            .await
            .unwrap();
        let t1 = tags.create("Elections 2024").await.unwrap();
        let t2 = tags.create("US elections").await.unwrap();
        s.repo.set_tags(post.id, &[t1.id, t2.id]).await.unwrap();

        let query = PostQuery::visible().matching("ELECTIONS");
        assert_eq!(s.repo.find(&query).await.unwrap().len(), 1);
        assert_eq!(s.repo.count(&query).await.unwrap(), 1);

        // category name is searched too
        let by_category = PostQuery::visible().matching("news");
        assert_eq!(s.repo.count(&by_category).await.unwrap(), 1);

        let wildcard = PostQuery::visible().matching("%");
        assert_eq!(s.repo.count(&wildcard).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_adjacent_filters() {
        let s = seed().await;
        let mut ids = Vec::new();
        for i in 0..3 {
            let post = s
                .repo
                .create(
                    s.author,
                    &CreatePostInput::new(format!("p{}", i), "c", s.category)
                        .published_at(Utc::now()),
                )
                .await
                .unwrap();
            ids.push(post.id);
        }

        let previous = s
            .repo
            .find_one(
                &PostQuery::visible()
                    .filter(PostFilter::IdBelow(ids[2]))
                    .order_by(PostOrder::IdDesc),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(previous.id, ids[1]);

        let next = s
            .repo
            .find_one(
                &PostQuery::visible()
                    .filter(PostFilter::IdAbove(ids[2]))
                    .order_by(PostOrder::IdAsc),
            )
            .await
            .unwrap();
        assert!(next.is_none());
    }

    #[tokio::test]
    async fn test_update_partial() {
        let s = seed().await;
        let post = s
            .repo
            .create(s.author, &CreatePostInput::new("Before", "body", s.category))
            .await
            .unwrap();

        let updated = s
            .repo
            .update(post.id, &UpdatePostInput::new().with_title("After"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.title, "After");
        assert_eq!(updated.content, "body");

        assert!(s
            .repo
            .update(9999, &UpdatePostInput::new().with_title("x"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_publish_and_unpublish() {
        let s = seed().await;
        let post = s
            .repo
            .create(s.author, &CreatePostInput::new("Draft", "body", s.category))
            .await
            .unwrap();

        let published = s
            .repo
            .set_published_at(post.id, Some(Utc::now()))
            .await
            .unwrap()
            .unwrap();
        assert!(published.is_visible());

        let unpublished = s.repo.set_published_at(post.id, None).await.unwrap().unwrap();
        assert!(!unpublished.is_visible());
    }

    #[tokio::test]
    async fn test_set_tags_replaces_and_dedups() {
        let s = seed().await;
        let post = fixtures::insert_published_post(&s.pool, s.author, s.category, "t").await;
        let a = fixtures::insert_tag(&s.pool, "a").await.id;
        let b = fixtures::insert_tag(&s.pool, "b").await.id;

        s.repo.set_tags(post.id, &[a, a, b]).await.unwrap();
        s.repo.set_tags(post.id, &[b]).await.unwrap();

        assert_eq!(
            s.repo
                .count(&PostQuery::all().tagged(a))
                .await
                .unwrap(),
            0
        );
        assert_eq!(
            s.repo
                .count(&PostQuery::all().tagged(b))
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_increment_views() {
        let s = seed().await;
        let post = fixtures::insert_published_post(&s.pool, s.author, s.category, "t").await;

        assert!(s.repo.increment_views(post.id).await.unwrap());
        assert!(s.repo.increment_views(post.id).await.unwrap());
        assert!(!s.repo.increment_views(9999).await.unwrap());

        let found = s.repo.get_by_id(post.id).await.unwrap().unwrap();
        assert_eq!(found.views_count, 2);
    }

    #[tokio::test]
    async fn test_concurrent_views_are_not_lost() {
        let s = seed().await;
        let post = fixtures::insert_published_post(&s.pool, s.author, s.category, "t").await;
        let repo = Arc::new(s.repo);

        let mut handles = Vec::new();
        for _ in 0..20 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                repo.increment_views(post.id).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let found = repo.get_by_id(post.id).await.unwrap().unwrap();
        assert_eq!(found.views_count, 20);
    }

    #[tokio::test]
    async fn test_delete() {
        let s = seed().await;
        let post = fixtures::insert_published_post(&s.pool, s.author, s.category, "t").await;
        assert!(s.repo.delete(post.id).await.unwrap());
        assert!(!s.repo.delete(post.id).await.unwrap());
    }
}
