//! Shared test data for repository, service and API tests

use chrono::{DateTime, Utc};

use super::{
    CategoryRepository, PostRepository, SqlxCategoryRepository, SqlxPostRepository,
    SqlxTagRepository, SqlxUserRepository, TagRepository, UserRepository,
};
use crate::db::{create_test_pool, migrations, DynDatabasePool};
use crate::models::{Category, CreatePostInput, Post, PostStatus, Tag, User};

/// In-memory SQLite pool with every migration applied
pub async fn migrated_pool() -> DynDatabasePool {
    let pool = create_test_pool().await.expect("Failed to create test pool");
    migrations::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

pub async fn insert_user(pool: &DynDatabasePool, username: &str, is_staff: bool) -> User {
    SqlxUserRepository::new(pool.clone())
        .create(
            username,
            &format!("{}@example.com", username),
            "not-a-real-hash",
            is_staff,
        )
        .await
        .expect("Failed to create user")
}

pub async fn insert_category(pool: &DynDatabasePool, name: &str) -> Category {
    SqlxCategoryRepository::new(pool.clone())
        .create(name)
        .await
        .expect("Failed to create category")
}

pub async fn insert_tag(pool: &DynDatabasePool, name: &str) -> Tag {
    SqlxTagRepository::new(pool.clone())
        .create(name)
        .await
        .expect("Failed to create tag")
}

/// Insert a post with explicit visibility inputs and view count
pub async fn insert_post(
    pool: &DynDatabasePool,
    author_id: i64,
    category_id: i64,
    title: &str,
    published_at: Option<DateTime<Utc>>,
    status: PostStatus,
    views: i64,
) -> Post {
    let mut input = CreatePostInput::new(title, format!("Body of {}", title), category_id)
        .with_featured_image("post_images/2024/01/01/fixture.png")
        .with_status(status);
    input.published_at = published_at;

    let repo = SqlxPostRepository::new(pool.clone());
    let mut post = repo
        .create(author_id, &input)
        .await
        .expect("Failed to create post");

    if views > 0 {
        let sqlite = pool.as_sqlite().expect("fixtures use SQLite");
        sqlx::query("UPDATE posts SET views_count = ? WHERE id = ?")
            .bind(views)
            .bind(post.id)
            .execute(sqlite)
            .await
            .expect("Failed to set views");
        post.views_count = views;
    }
    post
}

/// Insert an active post published now
pub async fn insert_published_post(
    pool: &DynDatabasePool,
    author_id: i64,
    category_id: i64,
    title: &str,
) -> Post {
    insert_post(
        pool,
        author_id,
        category_id,
        title,
        Some(Utc::now()),
        PostStatus::Active,
        0,
    )
    .await
}
