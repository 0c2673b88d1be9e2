//! User and profile models
//!
//! Users are the staff accounts that author posts and use the admin API.
//! Readers never log in. A user may have one `UserProfile` carrying the
//! public author details shown next to their posts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Staff users may use the admin API
    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new user (before password hashing)
#[derive(Debug, Clone)]
pub struct CreateUserInput {
    pub username: String,
    pub email: String,
    /// Plaintext password (will be hashed)
    pub password: String,
    pub is_staff: bool,
}

/// Public author details attached to a user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct UserProfile {
    pub id: i64,
    pub user_id: i64,
    /// Image path relative to the upload root
    pub image: String,
    pub address: String,
    pub biography: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating or replacing a profile
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileInput {
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub biography: String,
}

/// Author block shown on a post
#[derive(Debug, Clone, Serialize)]
pub struct Author {
    pub id: i64,
    pub username: String,
    pub profile: Option<UserProfile>,
}

impl Author {
    pub fn new(user: &User, profile: Option<UserProfile>) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            profile,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_not_serialized() {
        let now = Utc::now();
        let user = User {
            id: 1,
            username: "editor".into(),
            email: "editor@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            is_staff: true,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("secret"));
        assert!(json.contains("\"is_staff\":true"));
    }
}
