//! Tag model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tag entity. Posts and tags are many-to-many through `post_tags`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating or renaming a tag
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagInput {
    pub name: String,
}

impl TagInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}
