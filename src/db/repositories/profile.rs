//! User profile repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use crate::db::{on_pool, DynDatabasePool};
use crate::models::{ProfileInput, UserProfile};

const COLUMNS: &str = "id, user_id, image, address, biography, created_at, updated_at";

/// Profile repository trait
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn get_by_user(&self, user_id: i64) -> Result<Option<UserProfile>>;

    /// All profiles ordered by user
    async fn list(&self) -> Result<Vec<UserProfile>>;

    /// Create the user's profile or replace its fields
    async fn upsert(&self, user_id: i64, input: &ProfileInput) -> Result<UserProfile>;

    async fn delete_by_user(&self, user_id: i64) -> Result<bool>;
}

/// SQLx-based profile repository for SQLite and MySQL
pub struct SqlxProfileRepository {
    pool: DynDatabasePool,
}

impl SqlxProfileRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ProfileRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ProfileRepository for SqlxProfileRepository {
    async fn get_by_user(&self, user_id: i64) -> Result<Option<UserProfile>> {
        let sql = format!("SELECT {} FROM user_profiles WHERE user_id = ?", COLUMNS);
        let profile = on_pool!(self.pool, |conn| {
            sqlx::query_as::<_, UserProfile>(&sql)
                .bind(user_id)
                .fetch_optional(conn)
                .await
                .context("Failed to get user profile")?
        });
        Ok(profile)
    }

    async fn list(&self) -> Result<Vec<UserProfile>> {
        let sql = format!("SELECT {} FROM user_profiles ORDER BY user_id ASC", COLUMNS);
        let profiles = on_pool!(self.pool, |conn| {
            sqlx::query_as::<_, UserProfile>(&sql)
                .fetch_all(conn)
                .await
                .context("Failed to list user profiles")?
        });
        Ok(profiles)
    }

    async fn upsert(&self, user_id: i64, input: &ProfileInput) -> Result<UserProfile> {
        let now = Utc::now();
        on_pool!(self.pool, |conn| {
            let updated = sqlx::query(
                "UPDATE user_profiles SET image = ?, address = ?, biography = ?, updated_at = ? \
                 WHERE user_id = ?",
            )
            .bind(&input.image)
            .bind(&input.address)
            .bind(&input.biography)
            .bind(now)
            .bind(user_id)
            .execute(conn)
            .await
            .context("Failed to update user profile")?
            .rows_affected();

            if updated == 0 {
                sqlx::query(
                    "INSERT INTO user_profiles (user_id, image, address, biography, created_at, updated_at) \
                     VALUES (?, ?, ?, ?, ?, ?)",
                )
                .bind(user_id)
                .bind(&input.image)
                .bind(&input.address)
                .bind(&input.biography)
                .bind(now)
                .bind(now)
                .execute(conn)
                .await
                .context("Failed to create user profile")?;
            }
        });

        self.get_by_user(user_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Profile for user {} vanished after upsert", user_id))
    }

    async fn delete_by_user(&self, user_id: i64) -> Result<bool> {
        let affected = on_pool!(self.pool, |conn| {
            sqlx::query("DELETE FROM user_profiles WHERE user_id = ?")
                .bind(user_id)
                .execute(conn)
                .await
                .context("Failed to delete user profile")?
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
    async fn test_upsert_creates_then_replaces() {
        let pool = fixtures::migrated_pool().await;
        let user = fixtures::insert_user(&pool, "writer", true).await;
        let repo = SqlxProfileRepository::new(pool);

        assert!(repo.get_by_user(user.id).await.unwrap().is_none());

        let created = repo
            .upsert(
                user.id,
                &ProfileInput {
                    image: "user_images/a.png".into(),
                    address: "Kathmandu".into(),
                    biography: "Reporter".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(created.address, "Kathmandu");

        let replaced = repo
            .upsert(
                user.id,
                &ProfileInput {
                    biography: "Editor".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(replaced.id, created.id);
        assert_eq!(replaced.biography, "Editor");
        assert_eq!(replaced.address, "");
        assert_eq!(repo.list().await.unwrap().len(), 1);

        assert!(repo.delete_by_user(user.id).await.unwrap());
        assert!(repo.get_by_user(user.id).await.unwrap().is_none());
    }
}
