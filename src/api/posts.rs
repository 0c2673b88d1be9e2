//! Post API endpoints
//!
//! Public, read-only access to visible posts:
//! - GET /api/v1/posts - Paginated list, newest first
//! - GET /api/v1/posts/trending - Most viewed
//! - GET /api/v1/posts/recent - Latest
//! - GET /api/v1/posts/weekly-top - Published in the last week, newest first,
//!   then most viewed
//! - GET /api/v1/posts/{id} - Post detail; counts a view
//! - GET /api/v1/search - Case-insensitive text search over title, content,
//!   tag names and category name

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};

use crate::api::common::{LimitQuery, PageQuery, SearchQuery};
use crate::api::middleware::{ApiError, AppState};
use crate::models::{Page, Post};
use crate::services::post::{TRENDING_LIMIT, WEEKLY_TOP_LIMIT, WEEKLY_TOP_WINDOW_DAYS};
use crate::services::PostDetail;

const RECENT_DEFAULT_LIMIT: i64 = 5;
const MAX_LIST_LIMIT: i64 = 50;

/// Build the posts router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_posts))
        .route("/trending", get(list_trending))
        .route("/recent", get(list_recent))
        .route("/weekly-top", get(list_weekly_top))
        .route("/{id}", get(get_post))
}

/// GET /api/v1/posts
async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<Post>>, ApiError> {
    Ok(Json(state.post_service.list_all(query.request()).await?))
}

async fn list_trending(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<Post>>, ApiError> {
    let limit = query.resolve(TRENDING_LIMIT, MAX_LIST_LIMIT);
    Ok(Json(state.post_service.list_trending(limit).await?))
}

async fn list_recent(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<Post>>, ApiError> {
    let limit = query.resolve(RECENT_DEFAULT_LIMIT, MAX_LIST_LIMIT);
    Ok(Json(state.post_service.list_recent(limit).await?))
}

async fn list_weekly_top(State(state): State<AppState>) -> Result<Json<Vec<Post>>, ApiError> {
    Ok(Json(
        state
            .post_service
            .list_weekly_top(WEEKLY_TOP_WINDOW_DAYS, WEEKLY_TOP_LIMIT)
            .await?,
    ))
}

/// GET /api/v1/posts/{id}
///
/// Every successful request counts as one view.
async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PostDetail>, ApiError> {
    Ok(Json(state.post_service.detail(id).await?))
}

/// GET /api/v1/search?query=&page=
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Page<Post>>, ApiError> {
    let text = query
        .query
        .as_deref()
        .ok_or_else(|| ApiError::validation_error("Missing search query"))?;

    Ok(Json(state.post_service.search(text, query.page_request()).await?))
}
