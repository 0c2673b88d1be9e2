//! Authentication API endpoints
//!
//! Handles HTTP requests for staff sessions:
//! - POST /api/v1/auth/login - Log in with username and password
//! - POST /api/v1/auth/logout - End the current session
//! - GET /api/v1/auth/me - Get current user

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::api::middleware::{extract_session_token, ApiError, AppState, AuthenticatedUser, SESSION_COOKIE};
use crate::models::User;

/// Request body for user login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Response for successful authentication
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
    pub expires_at: String,
}

/// Build public auth routes (no auth required)
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
}

/// Build protected auth routes (requires auth middleware)
pub fn protected_router() -> Router<AppState> {
    Router::new().route("/me", get(get_current_user))
}

fn session_cookie(token: &str, max_age_secs: i64) -> Result<HeaderValue, ApiError> {
    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, max_age_secs
    );
    HeaderValue::from_str(&cookie).map_err(ApiError::internal)
}

/// POST /api/v1/auth/login - User login
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (session, user) = state
        .user_service
        .login(&body.username, &body.password)
        .await?;

    let max_age = (session.expires_at - Utc::now()).num_seconds().max(0);
    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, session_cookie(&session.id, max_age)?);

    Ok((
        headers,
        Json(AuthResponse {
            user,
            token: session.id,
            expires_at: session.expires_at.to_rfc3339(),
        }),
    ))
}

/// POST /api/v1/auth/logout - User logout
///
/// Always clears the cookie, even when the request carried no session.
async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(token) = extract_session_token(&headers) {
        state.user_service.logout(&token).await?;
    }

    let mut response_headers = HeaderMap::new();
    response_headers.insert(header::SET_COOKIE, session_cookie("", 0)?);

    Ok((StatusCode::NO_CONTENT, response_headers))
}

/// GET /api/v1/auth/me - Get current user
async fn get_current_user(AuthenticatedUser(user): AuthenticatedUser) -> Json<User> {
    Json(user)
}
