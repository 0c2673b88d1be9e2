//! Admin API endpoints
//!
//! Staff-only management of the newspaper's content:
//! - Categories and tags
//! - Posts, including tag sets and publishing
//! - Author profiles
//! - Reader comments, contact queries and newsletter subscribers
//!
//! Every route sits behind `require_auth` and `require_staff`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::api::common::PageQuery;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{
    Category, CategoryInput, Comment, Contact, CreatePostInput, Newsletter, Page, Post,
    ProfileInput, Tag, TagInput, UpdatePostInput, UserProfile,
};

/// A post with its tag set, as the editor sees it
#[derive(Debug, Serialize)]
pub struct AdminPostResponse {
    pub post: Post,
    pub tags: Vec<Tag>,
}

/// Build the admin router
pub fn router() -> Router<AppState> {
    Router::new()
        // Categories
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/{id}",
            get(get_category).put(update_category).delete(delete_category),
        )
        // Tags
        .route("/tags", get(list_tags).post(create_tag))
        .route("/tags/{id}", get(get_tag).put(update_tag).delete(delete_tag))
        // Posts
        .route("/posts", get(list_posts).post(create_post))
        .route("/posts/{id}", get(get_post).put(update_post).delete(delete_post))
        .route("/posts/{id}/publish", post(publish_post))
        .route("/posts/{id}/unpublish", post(unpublish_post))
        // Profiles
        .route("/profiles", get(list_profiles))
        .route(
            "/profiles/{user_id}",
            get(get_profile).put(save_profile).delete(delete_profile),
        )
        // Reader submissions
        .route("/comments", get(list_comments))
        .route("/comments/{id}", axum::routing::delete(delete_comment))
        .route("/contacts", get(list_contacts))
        .route("/contacts/{id}", get(get_contact).delete(delete_contact))
        .route("/subscribers", get(list_subscribers))
        .route("/subscribers/{id}", axum::routing::delete(delete_subscriber))
}

// ============================================================================
// Categories
// ============================================================================

async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>, ApiError> {
    Ok(Json(state.category_service.list().await?))
}

async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(state.category_service.get(id).await?))
}

/// POST /api/v1/admin/categories
async fn create_category(
    State(state): State<AppState>,
    Json(body): Json<CategoryInput>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let category = state.category_service.create(&body).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<CategoryInput>,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(state.category_service.update(id, &body).await?))
}

/// DELETE /api/v1/admin/categories/{id}
///
/// Posts in the category are removed with it.
async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.category_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Tags
// ============================================================================

async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<Tag>>, ApiError> {
    Ok(Json(state.tag_service.list().await?))
}

async fn get_tag(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Tag>, ApiError> {
    Ok(Json(state.tag_service.get(id).await?))
}

async fn create_tag(
    State(state): State<AppState>,
    Json(body): Json<TagInput>,
) -> Result<(StatusCode, Json<Tag>), ApiError> {
    let tag = state.tag_service.create(&body).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

async fn update_tag(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<TagInput>,
) -> Result<Json<Tag>, ApiError> {
    Ok(Json(state.tag_service.update(id, &body).await?))
}

async fn delete_tag(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode, ApiError> {
    state.tag_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Posts
// ============================================================================

/// GET /api/v1/admin/posts?page= - Every post, drafts included
async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<Post>>, ApiError> {
    Ok(Json(state.post_service.list_admin(query.request()).await?))
}

async fn post_response(state: &AppState, post: Post) -> Result<AdminPostResponse, ApiError> {
    let tags = state.post_service.tags_for(post.id).await?;
    Ok(AdminPostResponse { post, tags })
}

async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<AdminPostResponse>, ApiError> {
    let post = state.post_service.get(id).await?;
    Ok(Json(post_response(&state, post).await?))
}

/// POST /api/v1/admin/posts
///
/// The logged-in staff member becomes the author.
async fn create_post(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(body): Json<CreatePostInput>,
) -> Result<(StatusCode, Json<AdminPostResponse>), ApiError> {
    let post = state.post_service.create(user.id, &body).await?;
    Ok((StatusCode::CREATED, Json(post_response(&state, post).await?)))
}

async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdatePostInput>,
) -> Result<Json<AdminPostResponse>, ApiError> {
    let post = state.post_service.update(id, &body).await?;
    Ok(Json(post_response(&state, post).await?))
}

async fn delete_post(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode, ApiError> {
    state.post_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn publish_post(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Post>, ApiError> {
    Ok(Json(state.post_service.publish(id).await?))
}

async fn unpublish_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Post>, ApiError> {
    Ok(Json(state.post_service.unpublish(id).await?))
}

// ============================================================================
// Profiles
// ============================================================================

async fn list_profiles(State(state): State<AppState>) -> Result<Json<Vec<UserProfile>>, ApiError> {
    Ok(Json(state.user_service.list_profiles().await?))
}

async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<UserProfile>, ApiError> {
    state
        .user_service
        .get_profile(user_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Profile not found for user {}", user_id)))
}

/// PUT /api/v1/admin/profiles/{user_id} - Create or replace a profile
async fn save_profile(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(body): Json<ProfileInput>,
) -> Result<Json<UserProfile>, ApiError> {
    Ok(Json(state.user_service.save_profile(user_id, &body).await?))
}

async fn delete_profile(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.user_service.delete_profile(user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Reader submissions
// ============================================================================

async fn list_comments(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<Comment>>, ApiError> {
    Ok(Json(state.submission_service.list_comments(query.request()).await?))
}

async fn delete_comment(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode, ApiError> {
    state.submission_service.delete_comment(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_contacts(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<Contact>>, ApiError> {
    Ok(Json(state.submission_service.list_contacts(query.request()).await?))
}

async fn get_contact(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Contact>, ApiError> {
    Ok(Json(state.submission_service.get_contact(id).await?))
}

async fn delete_contact(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode, ApiError> {
    state.submission_service.delete_contact(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_subscribers(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<Newsletter>>, ApiError> {
    Ok(Json(state.submission_service.list_subscribers(query.request()).await?))
}

async fn delete_subscriber(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.submission_service.delete_subscriber(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
