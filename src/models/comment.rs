//! Comment model
//!
//! Comments are left by anonymous readers on visible posts. Only name and
//! email identify the commenter; the avatar comes from Gravatar.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Comment entity
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    /// Comment body
    pub comment: String,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    /// Gravatar URL for the commenter's email
    pub fn avatar_url(&self) -> String {
        gravatar_url(&self.email)
    }
}

/// Public view of a comment. The email is replaced by its avatar URL.
#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: i64,
    pub post_id: i64,
    pub comment: String,
    pub name: String,
    pub avatar_url: String,
    pub created_at: DateTime<Utc>,
}

impl From<Comment> for CommentView {
    fn from(comment: Comment) -> Self {
        Self {
            avatar_url: comment.avatar_url(),
            id: comment.id,
            post_id: comment.post_id,
            comment: comment.comment,
            name: comment.name,
            created_at: comment.created_at,
        }
    }
}

/// Generate a Gravatar URL from an email address
pub fn gravatar_url(email: &str) -> String {
    let email = email.trim();
    if email.is_empty() {
        return "https://www.gravatar.com/avatar/?d=mp&s=80".to_string();
    }
    let hash = format!("{:x}", md5::compute(email.to_lowercase()));
    format!("https://www.gravatar.com/avatar/{}?d=mp&s=80", hash)
}

/// Form fields of a comment submission
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub post: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub comment: String,
}

/// Validated comment ready to persist
#[derive(Debug, Clone, PartialEq)]
pub struct NewComment {
    pub post_id: i64,
    pub name: String,
    pub email: String,
    pub comment: String,
}
