//! API layer - HTTP handlers and routing
//!
//! This module contains all HTTP API endpoints for Gazette:
//! - Post listings, post detail and search
//! - Category and tag archives
//! - Home page and navigation aggregates
//! - Reader submissions (comments, newsletter, contact)
//! - Staff authentication
//! - Admin management and image uploads

pub mod admin;
pub mod auth;
pub mod categories;
pub mod common;
pub mod middleware;
pub mod posts;
pub mod site;
pub mod submissions;
pub mod tags;
pub mod upload;

#[cfg(test)]
pub(crate) mod test_support;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

pub use middleware::{ApiError, AppState, AuthenticatedUser};

/// Build the main API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Admin routes (need staff)
    let admin_routes = Router::new()
        .nest(
            "/admin",
            admin::router().nest("/uploads", upload::router(state.upload_config.max_file_size)),
        )
        .route_layer(axum_middleware::from_fn(middleware::require_staff))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Protected routes (need a session)
    let protected_routes = Router::new()
        .nest("/auth", auth::protected_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_auth,
        ));

    // Public routes
    Router::new()
        .nest("/posts", posts::router())
        .route("/search", get(posts::search))
        .nest("/categories", categories::router())
        .nest("/tags", tags::router())
        .nest("/auth", auth::public_router())
        .merge(site::router())
        .merge(submissions::router())
        .merge(admin_routes)
        .merge(protected_routes)
}

/// CORS for the configured frontend origin.
///
/// Cookies are only allowed with an explicit origin; `*` or an unparsable
/// value falls back to any origin without credentials.
fn cors_layer(cors_origin: &str) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::COOKIE,
            header::HeaderName::from_static("x-requested-with"),
        ]);

    if cors_origin.trim() == "*" {
        return base.allow_origin(Any);
    }
    match cors_origin.parse::<HeaderValue>() {
        Ok(origin) => base.allow_origin(origin).allow_credentials(true),
        Err(e) => {
            tracing::warn!(origin = %cors_origin, error = %e, "Invalid CORS origin, allowing any origin");
            base.allow_origin(Any)
        }
    }
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let uploads = ServeDir::new(&state.upload_config.path);

    Router::new()
        .nest("/api/v1", build_api_router(state.clone()))
        .nest_service("/uploads", uploads)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors_layer(cors_origin)),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::TestApp;
    use axum::http::StatusCode;

    #[test]
    fn test_cors_layer_accepts_any_origin_string() {
        // Must not panic for wildcard or junk values
        let _ = cors_layer("*");
        let _ = cors_layer("http://localhost:3000");
        let _ = cors_layer("bad\norigin");
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let app = TestApp::new().await;
        let response = app.server.get("/api/v1/nothing-here").await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cors_preflight_for_configured_origin() {
        let app = TestApp::new().await;
        let response = app
            .server
            .method(Method::OPTIONS, "/api/v1/posts")
            .add_header(header::ORIGIN, HeaderValue::from_static("http://localhost:3000"))
            .add_header(
                header::ACCESS_CONTROL_REQUEST_METHOD,
                HeaderValue::from_static("GET"),
            )
            .await;
        assert_eq!(
            response.header("access-control-allow-origin"),
            "http://localhost:3000"
        );
    }
}
