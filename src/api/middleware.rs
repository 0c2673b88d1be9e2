//! API middleware
//!
//! Contains:
//! - Shared application state
//! - The JSON error envelope and its mapping from service errors
//! - Session authentication and the staff-only guard

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::cache::Cache;
use crate::config::{Config, UploadConfig};
use crate::db::repositories::{
    SqlxCategoryRepository, SqlxCommentRepository, SqlxContactRepository, SqlxNewsletterRepository,
    SqlxPostRepository, SqlxProfileRepository, SqlxSessionRepository, SqlxTagRepository,
    SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::models::User;
use crate::services::{
    CategoryService, CategoryServiceError, PageSizes, PostService, PostServiceError,
    SubmissionError, SubmissionService, TagService, TagServiceError, UserService, UserServiceError,
};

/// Name of the cookie carrying the session token
pub const SESSION_COOKIE: &str = "session";

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub post_service: Arc<PostService>,
    pub category_service: Arc<CategoryService>,
    pub tag_service: Arc<TagService>,
    pub submission_service: Arc<SubmissionService>,
    pub user_service: Arc<UserService>,
    pub upload_config: Arc<UploadConfig>,
}

impl AppState {
    /// Wire repositories and services over one pool and cache
    pub fn build(pool: DynDatabasePool, cache: Arc<Cache>, config: &Config) -> Self {
        let cache_ttl = std::time::Duration::from_secs(config.cache.ttl_seconds);

        let category_service = Arc::new(CategoryService::with_cache_ttl(
            SqlxCategoryRepository::boxed(pool.clone()),
            cache.clone(),
            cache_ttl,
        ));
        let tag_service = Arc::new(TagService::with_cache_ttl(
            SqlxTagRepository::boxed(pool.clone()),
            cache,
            cache_ttl,
        ));
        let user_service = Arc::new(UserService::with_session_ttl(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool.clone()),
            SqlxProfileRepository::boxed(pool.clone()),
            chrono::Duration::hours(config.session.ttl_hours),
        ));
        let page_sizes = PageSizes::from(&config.pagination);
        let post_service = Arc::new(PostService::new(
            SqlxPostRepository::boxed(pool.clone()),
            SqlxCommentRepository::boxed(pool.clone()),
            category_service.clone(),
            tag_service.clone(),
            user_service.clone(),
            page_sizes,
        ));
        let submission_service = Arc::new(
            SubmissionService::new(
                post_service.clone(),
                SqlxCommentRepository::boxed(pool.clone()),
                SqlxNewsletterRepository::boxed(pool.clone()),
                SqlxContactRepository::boxed(pool),
            )
            .with_admin_page_size(page_sizes.admin),
        );

        Self {
            post_service,
            category_service,
            tag_service,
            submission_service,
            user_service,
            upload_config: Arc::new(config.upload.clone()),
        }
    }
}

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S: Send + Sync> FromRequestParts<S> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    /// Log the cause and hide it from the client
    pub fn internal(err: impl std::fmt::Display) -> Self {
        tracing::error!(error = %err, "Request failed");
        Self::new("INTERNAL_ERROR", "Internal server error")
    }

    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" | "PAGE_OUT_OF_RANGE" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<crate::models::PageOutOfRange> for ApiError {
    fn from(e: crate::models::PageOutOfRange) -> Self {
        Self::with_details(
            "PAGE_OUT_OF_RANGE",
            e.to_string(),
            serde_json::json!({ "requested": e.requested, "last": e.last }),
        )
    }
}

impl From<PostServiceError> for ApiError {
    fn from(e: PostServiceError) -> Self {
        match e {
            PostServiceError::NotFound(what) => ApiError::not_found(format!("Not found: {}", what)),
            PostServiceError::PageOutOfRange(e) => e.into(),
            PostServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            PostServiceError::InternalError(e) => ApiError::internal(e),
        }
    }
}

impl From<CategoryServiceError> for ApiError {
    fn from(e: CategoryServiceError) -> Self {
        match e {
            CategoryServiceError::NotFound(id) => ApiError::not_found(format!("Category not found: {}", id)),
            CategoryServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            CategoryServiceError::InternalError(e) => ApiError::internal(e),
        }
    }
}

impl From<TagServiceError> for ApiError {
    fn from(e: TagServiceError) -> Self {
        match e {
            TagServiceError::NotFound(id) => ApiError::not_found(format!("Tag not found: {}", id)),
            TagServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            TagServiceError::InternalError(e) => ApiError::internal(e),
        }
    }
}

impl From<UserServiceError> for ApiError {
    fn from(e: UserServiceError) -> Self {
        match e {
            UserServiceError::AuthenticationError(msg) => ApiError::unauthorized(msg),
            UserServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            UserServiceError::NotFound(id) => ApiError::not_found(format!("User not found: {}", id)),
            UserServiceError::InternalError(e) => ApiError::internal(e),
        }
    }
}

impl From<SubmissionError> for ApiError {
    fn from(e: SubmissionError) -> Self {
        match e {
            SubmissionError::Invalid(errors) | SubmissionError::InvalidComment { errors, .. } => {
                ApiError::with_details(
                    "VALIDATION_ERROR",
                    "Invalid submission",
                    serde_json::json!({ "errors": errors }),
                )
            }
            SubmissionError::NotFound(what) => ApiError::not_found(format!("Not found: {}", what)),
            SubmissionError::Duplicate => ApiError::conflict("Already subscribed"),
            SubmissionError::PageOutOfRange(e) => e.into(),
            SubmissionError::InternalError(e) => ApiError::internal(e),
        }
    }
}

/// Session token from `Authorization: Bearer` or the session cookie
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        return Some(token.to_string());
    }

    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies
        .split(';')
        .filter_map(|c| c.trim().strip_prefix(SESSION_COOKIE)?.strip_prefix('='))
        .map(str::to_string)
        .next()
}

/// Authentication middleware
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_session_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    let user = state
        .user_service
        .validate_session(&token)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired session"))?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

/// Staff authorization middleware; runs after `require_auth`
pub async fn require_staff(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if !user.0.is_staff {
        return Err(ApiError::forbidden("Staff privileges required"));
    }

    Ok(next.run(request).await)
}
