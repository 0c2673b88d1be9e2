//! Upload API endpoints
//!
//! Staff image uploads for featured images and profile pictures:
//! - POST /api/v1/admin/uploads/post_images
//! - POST /api/v1/admin/uploads/user_images
//!
//! Files are stored as `<upload.path>/<kind>/%Y/%m/%d/<uuid>.<ext>` and served
//! back under `/uploads`.

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use std::path::Path as FsPath;
use tokio::fs;
use uuid::Uuid;

use crate::api::middleware::{ApiError, AppState};

/// Multipart overhead allowed on top of the file itself
const MULTIPART_SLACK: u64 = 64 * 1024;

/// Response for successful upload
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    /// Public URL, e.g. `/uploads/post_images/2024/05/01/<uuid>.png`
    pub url: String,
    /// Path relative to the upload root, as stored on posts and profiles
    pub path: String,
    pub size: u64,
    pub content_type: String,
}

/// Where an image belongs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    PostImages,
    UserImages,
}

impl UploadKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "post_images" => Some(UploadKind::PostImages),
            "user_images" => Some(UploadKind::UserImages),
            _ => None,
        }
    }

    pub fn as_dir(&self) -> &'static str {
        match self {
            UploadKind::PostImages => "post_images",
            UploadKind::UserImages => "user_images",
        }
    }
}

/// Build the upload router. The body limit follows the configured file size.
pub fn router(max_file_size: u64) -> Router<AppState> {
    let limit = usize::try_from(max_file_size.saturating_add(MULTIPART_SLACK)).unwrap_or(usize::MAX);
    Router::new()
        .route("/{kind}", post(upload_image))
        .layer(DefaultBodyLimit::max(limit))
}

async fn ensure_upload_dir(path: &FsPath) -> Result<(), ApiError> {
    if !path.exists() {
        fs::create_dir_all(path)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to create upload directory: {}", e)))?;
    }
    Ok(())
}

/// POST /api/v1/admin/uploads/{kind}
///
/// Accepts multipart/form-data with a single file field named "file".
async fn upload_image(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let kind = UploadKind::parse(&kind)
        .ok_or_else(|| ApiError::not_found(format!("Unknown upload kind: {}", kind)))?;
    let config = &state.upload_config;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation_error(format!("Failed to read multipart: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        if !config.is_type_allowed(&content_type) {
            return Err(ApiError::validation_error(format!(
                "Invalid file type: {}. Allowed types: {}",
                content_type,
                config.allowed_types.join(", ")
            )));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::validation_error(format!("Failed to read file: {}", e)))?;

        if data.len() as u64 > config.max_file_size {
            return Err(ApiError::validation_error(format!(
                "File too large. Maximum size: {} bytes",
                config.max_file_size
            )));
        }

        let relative_dir = format!("{}/{}", kind.as_dir(), Utc::now().format("%Y/%m/%d"));
        let dir = config.path.join(&relative_dir);
        ensure_upload_dir(&dir).await?;

        let filename = format!("{}.{}", Uuid::new_v4().simple(), config.extension_for(&content_type));
        fs::write(dir.join(&filename), &data)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to save file: {}", e)))?;

        let path = format!("{}/{}", relative_dir, filename);
        tracing::info!(path = %path, size = data.len(), "Stored upload");

        return Ok((
            StatusCode::CREATED,
            Json(UploadResponse {
                url: format!("/uploads/{}", path),
                path,
                size: data.len() as u64,
                content_type,
            }),
        ));
    }

    Err(ApiError::validation_error("No file provided"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::TestApp;
    use crate::config::Config;
    use axum_test::multipart::{MultipartForm, Part};
    use serde_json::Value;
    use tempfile::TempDir;

    const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

    async fn app_with_upload_dir(dir: &TempDir, max_file_size: u64) -> TestApp {
        let mut config = Config::default();
        config.upload.path = dir.path().to_path_buf();
        config.upload.max_file_size = max_file_size;
        TestApp::with_config(config).await
    }

    fn png_form(bytes: Vec<u8>) -> MultipartForm {
        MultipartForm::new().add_part(
            "file",
            Part::bytes(bytes).file_name("photo.png").mime_type("image/png"),
        )
    }

    #[test]
    fn test_upload_kind() {
        assert_eq!(UploadKind::parse("post_images"), Some(UploadKind::PostImages));
        assert_eq!(UploadKind::parse("user_images").map(|k| k.as_dir()), Some("user_images"));
        assert_eq!(UploadKind::parse("../etc"), None);
    }

    #[tokio::test]
    async fn test_upload_stores_dated_file_and_serves_it() {
        let dir = TempDir::new().unwrap();
        let app = app_with_upload_dir(&dir, 1024).await;
        let (name, value) = app.bearer_for("editor", true).await;

        let response = app
            .server
            .post("/api/v1/admin/uploads/post_images")
            .add_header(name, value)
            .multipart(png_form(PNG_BYTES.to_vec()))
            .await;

        assert_eq!(response.status_code(), StatusCode::CREATED);
        let body: Value = response.json();
        let path = body["path"].as_str().unwrap();
        let today = Utc::now().format("post_images/%Y/%m/%d/").to_string();
        assert!(path.starts_with(&today));
        assert!(path.ends_with(".png"));
        assert!(dir.path().join(path).exists());

        let served = app.server.get(body["url"].as_str().unwrap()).await;
        assert_eq!(served.status_code(), StatusCode::OK);
        assert_eq!(served.as_bytes().as_ref(), PNG_BYTES);
    }

    #[tokio::test]
    async fn test_upload_rejects_type_and_size() {
        let dir = TempDir::new().unwrap();
        let app = app_with_upload_dir(&dir, 16).await;
        let (name, value) = app.bearer_for("editor", true).await;

        let text = MultipartForm::new().add_part(
            "file",
            Part::bytes(b"hello".to_vec()).file_name("notes.txt").mime_type("text/plain"),
        );
        let response = app
            .server
            .post("/api/v1/admin/uploads/user_images")
            .add_header(name.clone(), value.clone())
            .multipart(text)
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

        let response = app
            .server
            .post("/api/v1/admin/uploads/user_images")
            .add_header(name.clone(), value.clone())
            .multipart(png_form(vec![0u8; 64]))
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

        let response = app
            .server
            .post("/api/v1/admin/uploads/videos")
            .add_header(name, value)
            .multipart(png_form(PNG_BYTES.to_vec()))
            .await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_upload_requires_staff() {
        let dir = TempDir::new().unwrap();
        let app = app_with_upload_dir(&dir, 1024).await;
        let response = app
            .server
            .post("/api/v1/admin/uploads/post_images")
            .multipart(png_form(PNG_BYTES.to_vec()))
            .await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    }
}
