//! User service
//!
//! Staff authentication and author profiles:
//! - Login with username and password, producing an opaque session token
//! - Session validation and logout
//! - Startup bootstrap of the first staff account
//! - Profile management and author lookup for post pages

use anyhow::Context;
use chrono::{Duration, Utc};
use std::sync::Arc;

use crate::config::AdminBootstrapConfig;
use crate::db::repositories::{ProfileRepository, SessionRepository, UserRepository};
use crate::models::{Author, ProfileInput, Session, User, UserProfile};
use crate::services::password::{hash_password, verify_password};

const DEFAULT_SESSION_TTL_HOURS: i64 = 168;

const MAX_USERNAME_LEN: usize = 150;
const MAX_ADDRESS_LEN: usize = 200;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("User not found: {0}")]
    NotFound(i64),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// User service for staff accounts, sessions and profiles
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    profile_repo: Arc<dyn ProfileRepository>,
    session_ttl: Duration,
}

impl UserService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        profile_repo: Arc<dyn ProfileRepository>,
    ) -> Self {
        Self::with_session_ttl(
            user_repo,
            session_repo,
            profile_repo,
            Duration::hours(DEFAULT_SESSION_TTL_HOURS),
        )
    }

    pub fn with_session_ttl(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        profile_repo: Arc<dyn ProfileRepository>,
        session_ttl: Duration,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            profile_repo,
            session_ttl,
        }
    }

    /// Verify credentials and open a new session.
    ///
    /// Unknown users and wrong passwords produce the same error.
    pub async fn login(&self, username: &str, password: &str) -> Result<(Session, User), UserServiceError> {
        let invalid = || UserServiceError::AuthenticationError("Invalid username or password".to_string());

        let user = self
            .user_repo
            .get_by_username(username.trim())
            .await
            .context("Failed to look up user")?
            .ok_or_else(invalid)?;

        if !verify_password(password, &user.password_hash).context("Failed to verify password")? {
            tracing::info!(username = %user.username, "Rejected login with wrong password");
            return Err(invalid());
        }

        let now = Utc::now();
        let session = Session {
            id: uuid::Uuid::new_v4().simple().to_string(),
            user_id: user.id,
            expires_at: now + self.session_ttl,
            created_at: now,
        };
        self.session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;

        tracing::info!(user_id = user.id, "User logged in");
        Ok((session, user))
    }

    pub async fn logout(&self, token: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(token)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// Resolve a session token to its user.
    ///
    /// Missing or expired sessions yield `None`; expired ones are removed.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let session = match self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        {
            Some(s) => s,
            None => return Ok(None),
        };

        if session.is_expired() {
            let _ = self.session_repo.delete(token).await;
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get session user")?;
        Ok(user)
    }

    pub async fn cleanup_expired_sessions(&self) -> Result<u64, UserServiceError> {
        let removed = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?;
        Ok(removed)
    }

    /// Create the configured staff account when no user exists yet.
    ///
    /// Returns the new user, or `None` when users already exist.
    pub async fn bootstrap_admin(&self, admin: &AdminBootstrapConfig) -> Result<Option<User>, UserServiceError> {
        let username = admin.username.trim();
        if username.is_empty() || admin.password.is_empty() {
            return Err(UserServiceError::ValidationError(
                "Bootstrap admin needs both a username and a password".to_string(),
            ));
        }
        if username.chars().count() > MAX_USERNAME_LEN {
            return Err(UserServiceError::ValidationError(format!(
                "Username cannot exceed {} characters",
                MAX_USERNAME_LEN
            )));
        }

        let count = self.user_repo.count().await.context("Failed to count users")?;
        if count > 0 {
            return Ok(None);
        }

        let password_hash = hash_password(&admin.password)?;
        let user = self
            .user_repo
            .create(username, admin.email.trim(), &password_hash, true)
            .await
            .context("Failed to create bootstrap admin")?;

        tracing::info!(username = %user.username, "Created bootstrap staff user");
        Ok(Some(user))
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        Ok(self.user_repo.get_by_id(id).await.context("Failed to get user by ID")?)
    }

    /// Author block for a post page: username plus profile if one exists
    pub async fn get_author(&self, user_id: i64) -> Result<Option<Author>, UserServiceError> {
        let Some(user) = self.get_by_id(user_id).await? else {
            return Ok(None);
        };
        let profile = self
            .profile_repo
            .get_by_user(user_id)
            .await
            .context("Failed to get author profile")?;
        Ok(Some(Author::new(&user, profile)))
    }

    pub async fn list_profiles(&self) -> Result<Vec<UserProfile>, UserServiceError> {
        Ok(self.profile_repo.list().await.context("Failed to list profiles")?)
    }

    pub async fn get_profile(&self, user_id: i64) -> Result<Option<UserProfile>, UserServiceError> {
        Ok(self
            .profile_repo
            .get_by_user(user_id)
            .await
            .context("Failed to get profile")?)
    }

    /// Create or replace a user's profile
    pub async fn save_profile(&self, user_id: i64, input: &ProfileInput) -> Result<UserProfile, UserServiceError> {
        if input.address.chars().count() > MAX_ADDRESS_LEN {
            return Err(UserServiceError::ValidationError(format!(
                "Address cannot exceed {} characters",
                MAX_ADDRESS_LEN
            )));
        }
        if self.get_by_id(user_id).await?.is_none() {
            return Err(UserServiceError::NotFound(user_id));
        }

        let profile = self
            .profile_repo
            .upsert(user_id, input)
            .await
            .context("Failed to save profile")?;
        Ok(profile)
    }

    pub async fn delete_profile(&self, user_id: i64) -> Result<(), UserServiceError> {
        let deleted = self
            .profile_repo
            .delete_by_user(user_id)
            .await
            .context("Failed to delete profile")?;
        if !deleted {
            return Err(UserServiceError::NotFound(user_id));
        }
        Ok(())
    }
}
