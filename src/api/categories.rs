//! Category API endpoints
//!
//! - GET /api/v1/categories - All categories, by name
//! - GET /api/v1/categories/{id}/posts - Visible posts in a category

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};

use crate::api::common::PageQuery;
use crate::api::middleware::{ApiError, AppState};
use crate::models::{Category, Page, Post};

/// Build the categories router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories))
        .route("/{id}/posts", get(list_category_posts))
}

async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>, ApiError> {
    Ok(Json(state.category_service.list().await?))
}

/// GET /api/v1/categories/{id}/posts?page=
///
/// 404 when the category does not exist, even if `page` is valid.
async fn list_category_posts(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<Post>>, ApiError> {
    Ok(Json(
        state
            .post_service
            .list_by_category(id, query.request())
            .await?,
    ))
}
