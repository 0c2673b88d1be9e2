//! Tag API endpoints
//!
//! - GET /api/v1/tags - All tags
//! - GET /api/v1/tags/{id}/posts - Visible posts carrying a tag

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};

use crate::api::common::PageQuery;
use crate::api::middleware::{ApiError, AppState};
use crate::models::{Page, Post, Tag};

/// Build the tags router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tags))
        .route("/{id}/posts", get(list_tag_posts))
}

async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<Tag>>, ApiError> {
    Ok(Json(state.tag_service.list().await?))
}

async fn list_tag_posts(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<Post>>, ApiError> {
    Ok(Json(state.post_service.list_by_tag(id, query.request()).await?))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::TestApp;
    use crate::db::repositories::fixtures::{insert_category, insert_published_post, insert_tag, insert_user};
    use axum::http::StatusCode;
    use serde_json::Value;

    #[tokio::test]
    async fn test_tag_posts() {
        let app = TestApp::new().await;
        let author = insert_user(&app.pool, "writer", true).await;
        let category = insert_category(&app.pool, "World").await;
        let tag = insert_tag(&app.pool, "elections").await;
        let tagged = insert_published_post(&app.pool, author.id, category.id, "Polls open").await;
        insert_published_post(&app.pool, author.id, category.id, "Untagged").await;
        app.state
            .post_service
            .update(tagged.id, &crate::models::UpdatePostInput::new().with_tags(vec![tag.id]))
            .await
            .unwrap();

        let tags: Value = app.server.get("/api/v1/tags").await.json();
        assert_eq!(tags[0]["name"], "elections");

        let body: Value = app.server.get(&format!("/api/v1/tags/{}/posts", tag.id)).await.json();
        assert_eq!(body["total_count"], 1);
        assert_eq!(body["items"][0]["id"], tagged.id);
    }

    #[tokio::test]
    async fn test_unknown_tag_is_404() {
        let app = TestApp::new().await;
        let response = app.server.get("/api/v1/tags/42/posts").await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    }
}
