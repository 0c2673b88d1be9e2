//! Post model
//!
//! This module provides:
//! - `Post` entity, the unit of published content
//! - `PostStatus` enum for the editorial on/off switch
//! - Input types for creating and updating posts from the admin API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Post entity
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub title: String,
    /// Rich text body, stored as submitted
    pub content: String,
    /// Path of the featured image relative to the upload root
    pub featured_image: String,
    pub author_id: i64,
    pub category_id: i64,
    #[sqlx(try_from = "String")]
    pub status: PostStatus,
    pub views_count: i64,
    /// `None` means the post is a draft
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// A post is public once it has a publication time and is active.
    pub fn is_visible(&self) -> bool {
        self.published_at.is_some() && self.status == PostStatus::Active
    }
}

/// Editorial status of a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    #[default]
    Active,
    Inactive,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Active => "active",
            PostStatus::Inactive => "inactive",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for a status string that is neither `active` nor `inactive`
#[derive(Debug, thiserror::Error)]
#[error("invalid post status: {0}")]
pub struct InvalidPostStatus(pub String);

impl FromStr for PostStatus {
    type Err = InvalidPostStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(PostStatus::Active),
            "inactive" | "in_active" => Ok(PostStatus::Inactive),
            other => Err(InvalidPostStatus(other.to_string())),
        }
    }
}

impl TryFrom<String> for PostStatus {
    type Error = InvalidPostStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Input for creating a post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePostInput {
    pub title: String,
    pub content: String,
    pub featured_image: String,
    pub category_id: i64,
    #[serde(default)]
    pub status: PostStatus,
    /// Publish immediately when set and `published_at` is absent
    #[serde(default)]
    pub publish: bool,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tag_ids: Vec<i64>,
}

impl CreatePostInput {
    pub fn new(title: impl Into<String>, content: impl Into<String>, category_id: i64) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            featured_image: String::new(),
            category_id,
            status: PostStatus::Active,
            publish: false,
            published_at: None,
            tag_ids: Vec::new(),
        }
    }

    pub fn with_featured_image(mut self, path: impl Into<String>) -> Self {
        self.featured_image = path.into();
        self
    }

    pub fn with_status(mut self, status: PostStatus) -> Self {
        self.status = status;
        self
    }

    pub fn published_at(mut self, at: DateTime<Utc>) -> Self {
        self.published_at = Some(at);
        self
    }

    pub fn with_tags(mut self, tag_ids: Vec<i64>) -> Self {
        self.tag_ids = tag_ids;
        self
    }

    /// Publication time to store, resolving `publish` against `now`
    pub fn resolved_published_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.published_at.or(if self.publish { Some(now) } else { None })
    }
}

/// Partial update for a post. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePostInput {
    pub title: Option<String>,
    pub content: Option<String>,
    pub featured_image: Option<String>,
    pub category_id: Option<i64>,
    pub status: Option<PostStatus>,
    /// Replaces the whole tag set when present
    pub tag_ids: Option<Vec<i64>>,
}

impl UpdatePostInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_status(mut self, status: PostStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_tags(mut self, tag_ids: Vec<i64>) -> Self {
        self.tag_ids = Some(tag_ids);
        self
    }

    pub fn has_changes(&self) -> bool {
        self.title.is_some()
            || self.content.is_some()
            || self.featured_image.is_some()
            || self.category_id.is_some()
            || self.status.is_some()
            || self.tag_ids.is_some()
    }
}
