//! Reader submission endpoints
//!
//! Handles the three public forms:
//! - POST /api/v1/comments - Comment on a post (form-encoded)
//! - POST /api/v1/newsletter - Newsletter signup (AJAX only)
//! - POST /api/v1/contact - Contact query (form-encoded)
//!
//! Successful comment and contact posts answer `303 See Other` pointing at
//! the page the browser should land on.

use axum::{
    extract::{rejection::FormRejection, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Form, Json, Router,
};
use serde::Serialize;
use serde_json::json;

use crate::api::middleware::{ApiError, AppState};
use crate::models::{CommentForm, CommentView, ContactForm, NewsletterForm};
use crate::services::SubmissionError;

const AJAX_HEADER: &str = "x-requested-with";
const AJAX_HEADER_VALUE: &str = "XMLHttpRequest";

const NEWSLETTER_NOT_AJAX: &str = "Cannot process. Must be an AJAX XMLHttpRequest";
const NEWSLETTER_SUCCESS: &str = "Successfully subscribed to the newsletter.";
const NEWSLETTER_FAILURE: &str = "Cannot subscribe to the newsletter.";
const CONTACT_SUCCESS: &str = "Successfully submitted your query. We will contact you soon.";
const CONTACT_FAILURE: &str = "Cannot submit your query. Please make sure all fields are valid.";

/// Body of every newsletter response
#[derive(Debug, Serialize)]
pub struct NewsletterResponse {
    pub success: bool,
    pub message: &'static str,
}

/// Build the submissions router; mounted at the API root
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/comments", post(submit_comment))
        .route("/newsletter", post(submit_newsletter))
        .route("/contact", post(submit_contact))
}

fn see_other(location: String, body: impl Serialize) -> Response {
    (
        StatusCode::SEE_OTHER,
        [(header::LOCATION, location)],
        Json(body),
    )
        .into_response()
}

/// POST /api/v1/comments
async fn submit_comment(
    State(state): State<AppState>,
    Form(form): Form<CommentForm>,
) -> Result<Response, ApiError> {
    match state.submission_service.submit_comment(&form).await {
        Ok(comment) => {
            let location = format!("/posts/{}", comment.post_id);
            Ok(see_other(location, CommentView::from(comment)))
        }
        Err(SubmissionError::InvalidComment { post, errors }) => Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({ "errors": errors, "post": post })),
        )
            .into_response()),
        Err(SubmissionError::Invalid(errors)) => {
            Ok((StatusCode::BAD_REQUEST, Json(json!({ "errors": errors }))).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

fn newsletter_reply(status: StatusCode, success: bool, message: &'static str) -> Response {
    (status, Json(NewsletterResponse { success, message })).into_response()
}

/// POST /api/v1/newsletter
///
/// Only answers requests made with `X-Requested-With: XMLHttpRequest`.
async fn submit_newsletter(
    State(state): State<AppState>,
    headers: HeaderMap,
    form: Result<Form<NewsletterForm>, FormRejection>,
) -> Result<Response, ApiError> {
    let is_ajax = headers
        .get(AJAX_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == AJAX_HEADER_VALUE);
    if !is_ajax {
        return Ok(newsletter_reply(StatusCode::BAD_REQUEST, false, NEWSLETTER_NOT_AJAX));
    }

    let Ok(Form(form)) = form else {
        return Ok(newsletter_reply(StatusCode::BAD_REQUEST, false, NEWSLETTER_FAILURE));
    };

    match state.submission_service.submit_newsletter(&form).await {
        Ok(_) => Ok(newsletter_reply(StatusCode::CREATED, true, NEWSLETTER_SUCCESS)),
        Err(SubmissionError::Invalid(_)) | Err(SubmissionError::Duplicate) => {
            Ok(newsletter_reply(StatusCode::BAD_REQUEST, false, NEWSLETTER_FAILURE))
        }
        Err(e) => Err(e.into()),
    }
}

/// POST /api/v1/contact
async fn submit_contact(
    State(state): State<AppState>,
    Form(form): Form<ContactForm>,
) -> Result<Response, ApiError> {
    match state.submission_service.submit_contact(&form).await {
        Ok(_) => Ok(see_other(
            "/contact".to_string(),
            json!({ "message": CONTACT_SUCCESS }),
        )),
        Err(SubmissionError::Invalid(errors)) => Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": CONTACT_FAILURE, "errors": errors })),
        )
            .into_response()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::TestApp;
    use crate::db::repositories::fixtures::{insert_category, insert_post, insert_published_post, insert_user};
    use crate::models::{PageRequest, PostStatus};
    use axum::http::{HeaderName, HeaderValue};
    use serde_json::Value;

    fn ajax() -> (HeaderName, HeaderValue) {
        (
            HeaderName::from_static(AJAX_HEADER),
            HeaderValue::from_static(AJAX_HEADER_VALUE),
        )
    }

    async fn subscriber_count(app: &TestApp) -> i64 {
        app.state
            .submission_service
            .list_subscribers(PageRequest::Number(1))
            .await
            .unwrap()
            .total_count
    }

    #[tokio::test]
    async fn test_comment_redirects_to_post() {
        let app = TestApp::new().await;
        let author = insert_user(&app.pool, "writer", true).await;
        let category = insert_category(&app.pool, "World").await;
        let post = insert_published_post(&app.pool, author.id, category.id, "Summit").await;
        let post_id = post.id.to_string();

        let response = app
            .server
            .post("/api/v1/comments")
            .form(&[
                ("post", post_id.as_str()),
                ("name", "Reader"),
                ("email", "reader@example.com"),
                ("comment", "Great piece"),
            ])
            .await;

        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
        assert_eq!(response.header("location"), format!("/posts/{}", post.id).as_str());
        let body: Value = response.json();
        assert_eq!(body["name"], "Reader");
        assert!(body.get("email").is_none());

        let detail: Value = app.server.get(&format!("/api/v1/posts/{}", post.id)).await.json();
        assert_eq!(detail["comments"][0]["comment"], "Great piece");
    }

    #[tokio::test]
    async fn test_invalid_comment_returns_errors_and_post() {
        let app = TestApp::new().await;
        let author = insert_user(&app.pool, "writer", true).await;
        let category = insert_category(&app.pool, "World").await;
        let post = insert_published_post(&app.pool, author.id, category.id, "Summit").await;
        let post_id = post.id.to_string();

        let response = app
            .server
            .post("/api/v1/comments")
            .form(&[("post", post_id.as_str()), ("name", ""), ("email", "nope"), ("comment", "hi")])
            .await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["errors"]["name"][0], "This field is required.");
        assert_eq!(body["errors"]["email"][0], "Enter a valid email address.");
        assert_eq!(body["post"]["id"], post.id);
    }

    #[tokio::test]
    async fn test_comment_on_draft_is_404() {
        let app = TestApp::new().await;
        let author = insert_user(&app.pool, "writer", true).await;
        let category = insert_category(&app.pool, "World").await;
        let draft = insert_post(&app.pool, author.id, category.id, "Draft", None, PostStatus::Active, 0).await;
        let post_id = draft.id.to_string();

        let response = app
            .server
            .post("/api/v1/comments")
            .form(&[
                ("post", post_id.as_str()),
                ("name", "Reader"),
                ("email", "reader@example.com"),
                ("comment", "First"),
            ])
            .await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_comment_with_bad_post_reference() {
        let app = TestApp::new().await;
        let response = app
            .server
            .post("/api/v1/comments")
            .form(&[("post", "abc"), ("name", "Reader"), ("email", "reader@example.com"), ("comment", "x")])
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        assert!(response.json::<Value>()["errors"]["post"].is_array());
    }

    #[tokio::test]
    async fn test_newsletter_requires_ajax() {
        let app = TestApp::new().await;
        let response = app
            .server
            .post("/api/v1/newsletter")
            .form(&[("email", "reader@example.com")])
            .await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], NEWSLETTER_NOT_AJAX);
        assert_eq!(subscriber_count(&app).await, 0);
    }

    #[tokio::test]
    async fn test_newsletter_signup_and_duplicate() {
        let app = TestApp::new().await;
        let (name, value) = ajax();

        let first = app
            .server
            .post("/api/v1/newsletter")
            .add_header(name.clone(), value.clone())
            .form(&[("email", "reader@example.com")])
            .await;
        assert_eq!(first.status_code(), StatusCode::CREATED);
        let body: Value = first.json();
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], NEWSLETTER_SUCCESS);

        let again = app
            .server
            .post("/api/v1/newsletter")
            .add_header(name, value)
            .form(&[("email", " Reader@Example.com ")])
            .await;
        assert_eq!(again.status_code(), StatusCode::BAD_REQUEST);
        let body: Value = again.json();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], NEWSLETTER_FAILURE);

        assert_eq!(subscriber_count(&app).await, 1);
    }

    #[tokio::test]
    async fn test_newsletter_invalid_email() {
        let app = TestApp::new().await;
        let (name, value) = ajax();
        let response = app
            .server
            .post("/api/v1/newsletter")
            .add_header(name, value)
            .form(&[("email", "not-an-email")])
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(subscriber_count(&app).await, 0);
    }

    #[tokio::test]
    async fn test_contact_redirects() {
        let app = TestApp::new().await;
        let response = app
            .server
            .post("/api/v1/contact")
            .form(&[
                ("name", "Reader"),
                ("email", "reader@example.com"),
                ("subject", "Correction"),
                ("message", "The date in paragraph two is wrong."),
            ])
            .await;

        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
        assert_eq!(response.header("location"), "/contact");
        assert_eq!(response.json::<Value>()["message"], CONTACT_SUCCESS);
    }

    #[tokio::test]
    async fn test_contact_invalid() {
        let app = TestApp::new().await;
        let response = app
            .server
            .post("/api/v1/contact")
            .form(&[("name", "Reader"), ("email", "reader@example.com")])
            .await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["message"], CONTACT_FAILURE);
        assert!(body["errors"]["subject"].is_array());
        assert!(body["errors"]["message"].is_array());
        assert!(body["errors"].get("name").is_none());
    }
}
