//! Page-level aggregates for the public site
//!
//! The front page and the navigation/sidebar blocks are each served in a
//! single request so the frontend does not fan out.

use axum::{extract::State, routing::get, Json, Router};

use crate::api::middleware::{ApiError, AppState};
use crate::services::{HomeData, Navigation};

/// Build the site router; mounted at the API root
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/home", get(get_home))
        .route("/nav", get(get_navigation))
}

/// GET /api/v1/home
async fn get_home(State(state): State<AppState>) -> Result<Json<HomeData>, ApiError> {
    Ok(Json(state.post_service.home().await?))
}

/// GET /api/v1/nav
async fn get_navigation(State(state): State<AppState>) -> Result<Json<Navigation>, ApiError> {
    Ok(Json(state.post_service.navigation().await?))
}
