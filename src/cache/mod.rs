//! Cache layer
//!
//! In-process cache for hot read paths (category and tag lists, sidebar
//! data). Entries are stored as JSON so any serializable value can be cached.
//!
//! # Usage
//!
//! ```rust,ignore
//! use gazette::cache::{create_cache, CacheLayer};
//! use gazette::config::CacheConfig;
//!
//! let cache = create_cache(&CacheConfig::default());
//! cache.set("key", &"value", Duration::from_secs(60)).await?;
//! ```

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::CacheConfig;

pub use memory::MemoryCache;

/// The cache shared by services
pub type Cache = MemoryCache;

/// Cache layer trait
///
/// Generic methods keep this from being object safe, so services hold
/// `Arc<Cache>` rather than `Arc<dyn CacheLayer>`.
#[async_trait]
pub trait CacheLayer: Send + Sync {
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>>;

    /// Set a value with its own time-to-live
    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Delete every key matching a glob pattern (`*` and `?`)
    async fn delete_pattern(&self, pattern: &str) -> Result<()>;

    async fn clear(&self) -> Result<()>;
}

/// Build the shared cache from configuration
pub fn create_cache(config: &CacheConfig) -> Arc<Cache> {
    Arc::new(MemoryCache::with_capacity_and_ttl(
        config.max_entries,
        Duration::from_secs(config.ttl_seconds),
    ))
}
