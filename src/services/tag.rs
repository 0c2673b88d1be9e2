//! Tag service
//!
//! Tags are shown in the navigation tag cloud, so the lists are cached and
//! invalidated on writes. Also checks tag ids handed in by the post editor.

use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::TagRepository;
use crate::models::{Tag, TagInput};
use anyhow::Context;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

const TAG_CACHE_TTL_SECS: u64 = 600;

const MAX_NAME_LEN: usize = 100;

const CACHE_KEY_TAG_LIST: &str = "tags:all";
const CACHE_KEY_TAG_LIMITED: &str = "tags:limited:";

/// Error types for tag service operations
#[derive(Debug, thiserror::Error)]
pub enum TagServiceError {
    #[error("Tag not found: {0}")]
    NotFound(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Tag service
pub struct TagService {
    repo: Arc<dyn TagRepository>,
    cache: Arc<Cache>,
    cache_ttl: Duration,
}

impl TagService {
    pub fn new(repo: Arc<dyn TagRepository>, cache: Arc<Cache>) -> Self {
        Self::with_cache_ttl(repo, cache, Duration::from_secs(TAG_CACHE_TTL_SECS))
    }

    pub fn with_cache_ttl(repo: Arc<dyn TagRepository>, cache: Arc<Cache>, cache_ttl: Duration) -> Self {
        Self { repo, cache, cache_ttl }
    }

    pub async fn list(&self) -> Result<Vec<Tag>, TagServiceError> {
        if let Some(cached) = self.cache.get::<Vec<Tag>>(CACHE_KEY_TAG_LIST).await.ok().flatten() {
            return Ok(cached);
        }

        let tags = self.repo.list().await.context("Failed to list tags")?;
        let _ = self.cache.set(CACHE_KEY_TAG_LIST, &tags, self.cache_ttl).await;
        Ok(tags)
    }

    pub async fn list_limited(&self, limit: i64) -> Result<Vec<Tag>, TagServiceError> {
        let key = format!("{}{}", CACHE_KEY_TAG_LIMITED, limit);
        if let Some(cached) = self.cache.get::<Vec<Tag>>(&key).await.ok().flatten() {
            return Ok(cached);
        }

        let tags = self.repo.list_limited(limit).await.context("Failed to list tags")?;
        let _ = self.cache.set(&key, &tags, self.cache_ttl).await;
        Ok(tags)
    }

    /// Tags attached to a post, by name
    pub async fn list_for_post(&self, post_id: i64) -> Result<Vec<Tag>, TagServiceError> {
        Ok(self
            .repo
            .list_for_post(post_id)
            .await
            .context("Failed to list post tags")?)
    }

    pub async fn get(&self, id: i64) -> Result<Tag, TagServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get tag")?
            .ok_or(TagServiceError::NotFound(id))
    }

    /// Fail with a validation error unless every id names an existing tag
    pub async fn ensure_exist(&self, ids: &[i64]) -> Result<(), TagServiceError> {
        let unique: Vec<i64> = ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
        if unique.is_empty() {
            return Ok(());
        }

        let found = self
            .repo
            .count_existing(&unique)
            .await
            .context("Failed to check tags")?;
        if found != unique.len() as i64 {
            return Err(TagServiceError::ValidationError(
                "One or more tags do not exist".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn create(&self, input: &TagInput) -> Result<Tag, TagServiceError> {
        let name = validate_name(&input.name)?;
        let tag = self.repo.create(name).await.context("Failed to create tag")?;
        self.invalidate_cache().await;
        tracing::info!(id = tag.id, name = %tag.name, "Created tag");
        Ok(tag)
    }

    pub async fn update(&self, id: i64, input: &TagInput) -> Result<Tag, TagServiceError> {
        let name = validate_name(&input.name)?;
        let tag = self
            .repo
            .update(id, name)
            .await
            .context("Failed to update tag")?
            .ok_or(TagServiceError::NotFound(id))?;
        self.invalidate_cache().await;
        Ok(tag)
    }

    pub async fn delete(&self, id: i64) -> Result<(), TagServiceError> {
        if !self.repo.delete(id).await.context("Failed to delete tag")? {
            return Err(TagServiceError::NotFound(id));
        }
        self.invalidate_cache().await;
        Ok(())
    }

    async fn invalidate_cache(&self) {
        let _ = self.cache.delete(CACHE_KEY_TAG_LIST).await;
        let _ = self.cache.delete_pattern(&format!("{}*", CACHE_KEY_TAG_LIMITED)).await;
    }
}

fn validate_name(name: &str) -> Result<&str, TagServiceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(TagServiceError::ValidationError("Tag name cannot be empty".to_string()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(TagServiceError::ValidationError(format!(
            "Tag name cannot exceed {} characters",
            MAX_NAME_LEN
        )));
    }
    Ok(name)
}
