//! Category service
//!
//! Category lists feed the navigation and home sidebars on every page, so
//! they are served from the cache and invalidated on any write.

use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::CategoryRepository;
use crate::models::{Category, CategoryInput};
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;

const CATEGORY_CACHE_TTL_SECS: u64 = 600;

const MAX_NAME_LEN: usize = 100;

const CACHE_KEY_CATEGORY_LIST: &str = "categories:all";
const CACHE_KEY_CATEGORY_LIMITED: &str = "categories:limited:";

/// Error types for category service operations
#[derive(Debug, thiserror::Error)]
pub enum CategoryServiceError {
    #[error("Category not found: {0}")]
    NotFound(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Category service
pub struct CategoryService {
    repo: Arc<dyn CategoryRepository>,
    cache: Arc<Cache>,
    cache_ttl: Duration,
}

impl CategoryService {
    pub fn new(repo: Arc<dyn CategoryRepository>, cache: Arc<Cache>) -> Self {
        Self::with_cache_ttl(repo, cache, Duration::from_secs(CATEGORY_CACHE_TTL_SECS))
    }

    pub fn with_cache_ttl(repo: Arc<dyn CategoryRepository>, cache: Arc<Cache>, cache_ttl: Duration) -> Self {
        Self { repo, cache, cache_ttl }
    }

    /// All categories ordered by name
    pub async fn list(&self) -> Result<Vec<Category>, CategoryServiceError> {
        if let Some(cached) = self.cache.get::<Vec<Category>>(CACHE_KEY_CATEGORY_LIST).await.ok().flatten() {
            return Ok(cached);
        }

        let categories = self.repo.list().await.context("Failed to list categories")?;
        let _ = self.cache.set(CACHE_KEY_CATEGORY_LIST, &categories, self.cache_ttl).await;
        Ok(categories)
    }

    /// The first `limit` categories by name
    pub async fn list_limited(&self, limit: i64) -> Result<Vec<Category>, CategoryServiceError> {
        let key = format!("{}{}", CACHE_KEY_CATEGORY_LIMITED, limit);
        if let Some(cached) = self.cache.get::<Vec<Category>>(&key).await.ok().flatten() {
            return Ok(cached);
        }

        let categories = self
            .repo
            .list_limited(limit)
            .await
            .context("Failed to list categories")?;
        let _ = self.cache.set(&key, &categories, self.cache_ttl).await;
        Ok(categories)
    }

    pub async fn get(&self, id: i64) -> Result<Category, CategoryServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get category")?
            .ok_or(CategoryServiceError::NotFound(id))
    }

    pub async fn exists(&self, id: i64) -> Result<bool, CategoryServiceError> {
        Ok(self.repo.get_by_id(id).await.context("Failed to get category")?.is_some())
    }

    pub async fn create(&self, input: &CategoryInput) -> Result<Category, CategoryServiceError> {
        let name = validate_name(&input.name)?;
        let category = self.repo.create(name).await.context("Failed to create category")?;
        self.invalidate_cache().await;
        tracing::info!(id = category.id, name = %category.name, "Created category");
        Ok(category)
    }

    pub async fn update(&self, id: i64, input: &CategoryInput) -> Result<Category, CategoryServiceError> {
        let name = validate_name(&input.name)?;
        let category = self
            .repo
            .update(id, name)
            .await
            .context("Failed to update category")?
            .ok_or(CategoryServiceError::NotFound(id))?;
        self.invalidate_cache().await;
        Ok(category)
    }

    /// Delete a category together with its posts
    pub async fn delete(&self, id: i64) -> Result<(), CategoryServiceError> {
        let deleted = self.repo.delete(id).await.context("Failed to delete category")?;
        if !deleted {
            return Err(CategoryServiceError::NotFound(id));
        }
        self.invalidate_cache().await;
        tracing::info!(id, "Deleted category");
        Ok(())
    }

    async fn invalidate_cache(&self) {
        let _ = self.cache.delete(CACHE_KEY_CATEGORY_LIST).await;
        let _ = self
            .cache
            .delete_pattern(&format!("{}*", CACHE_KEY_CATEGORY_LIMITED))
            .await;
    }
}

fn validate_name(name: &str) -> Result<&str, CategoryServiceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CategoryServiceError::ValidationError(
            "Category name cannot be empty".to_string(),
        ));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(CategoryServiceError::ValidationError(format!(
            "Category name cannot exceed {} characters",
            MAX_NAME_LEN
        )));
    }
    Ok(name)
}
