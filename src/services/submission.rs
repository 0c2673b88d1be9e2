//! Reader submissions
//!
//! Validates and stores the three forms readers can send: comments on a
//! post, newsletter signups and contact queries. Validation collects every
//! problem per field; nothing is written unless the whole form is valid.
//! Also backs the staff listings of what readers have submitted.

use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::db::repositories::{CommentRepository, ContactRepository, NewsletterRepository};
use crate::models::{
    Comment, CommentForm, Contact, ContactForm, NewComment, NewContact, Newsletter, NewsletterForm,
    Page, PageOutOfRange, PageRequest, Post,
};
use crate::services::post::{PostService, PostServiceError};

const MAX_COMMENT_NAME_LEN: usize = 50;
const MAX_CONTACT_NAME_LEN: usize = 100;
const MAX_SUBJECT_LEN: usize = 200;
const MAX_EMAIL_LEN: usize = 254;

const DEFAULT_ADMIN_PAGE_SIZE: i64 = 20;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9](?:[A-Za-z0-9\-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9\-]*[A-Za-z0-9])?)*\.[A-Za-z]{2,}$")
        .expect("email pattern is valid")
});

/// Whether a string looks like a deliverable email address
pub fn is_valid_email(email: &str) -> bool {
    email.len() <= MAX_EMAIL_LEN && EMAIL_RE.is_match(email)
}

/// Field name -> validation messages
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Required, trimmed, at most `max` characters
    fn require_text<'a>(&mut self, field: &str, value: &'a str, max: Option<usize>) -> &'a str {
        let value = value.trim();
        if value.is_empty() {
            self.add(field, "This field is required.");
        } else if let Some(max) = max {
            if value.chars().count() > max {
                self.add(
                    field,
                    format!("Ensure this value has at most {} characters.", max),
                );
            }
        }
        value
    }

    fn require_email<'a>(&mut self, field: &str, value: &'a str) -> &'a str {
        let value = value.trim();
        if value.is_empty() {
            self.add(field, "This field is required.");
        } else if !is_valid_email(value) {
            self.add(field, "Enter a valid email address.");
        }
        value
    }

    fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

/// Error types for submissions
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("Invalid submission")]
    Invalid(FieldErrors),

    /// A comment failed validation; carries the post so the form can be
    /// shown again next to it
    #[error("Invalid comment")]
    InvalidComment { post: Box<Post>, errors: FieldErrors },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already subscribed")]
    Duplicate,

    #[error(transparent)]
    PageOutOfRange(#[from] PageOutOfRange),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<PostServiceError> for SubmissionError {
    fn from(e: PostServiceError) -> Self {
        match e {
            PostServiceError::NotFound(what) => SubmissionError::NotFound(what),
            PostServiceError::PageOutOfRange(e) => SubmissionError::PageOutOfRange(e),
            PostServiceError::InternalError(e) => SubmissionError::InternalError(e),
            PostServiceError::ValidationError(msg) => {
                let mut errors = FieldErrors::new();
                errors.add("post", msg);
                SubmissionError::Invalid(errors)
            }
        }
    }
}

/// Submission service
pub struct SubmissionService {
    posts: Arc<PostService>,
    comment_repo: Arc<dyn CommentRepository>,
    newsletter_repo: Arc<dyn NewsletterRepository>,
    contact_repo: Arc<dyn ContactRepository>,
    admin_page_size: i64,
}

impl SubmissionService {
    pub fn new(
        posts: Arc<PostService>,
        comment_repo: Arc<dyn CommentRepository>,
        newsletter_repo: Arc<dyn NewsletterRepository>,
        contact_repo: Arc<dyn ContactRepository>,
    ) -> Self {
        Self {
            posts,
            comment_repo,
            newsletter_repo,
            contact_repo,
            admin_page_size: DEFAULT_ADMIN_PAGE_SIZE,
        }
    }

    pub fn with_admin_page_size(mut self, page_size: i64) -> Self {
        self.admin_page_size = page_size.max(1);
        self
    }

    /// Store a comment on a visible post.
    ///
    /// A missing or non-numeric post reference is a field error; an unknown
    /// or hidden post is NotFound.
    pub async fn submit_comment(&self, form: &CommentForm) -> Result<Comment, SubmissionError> {
        let post_id = match form.post.as_deref().map(str::trim).map(str::parse::<i64>) {
            Some(Ok(id)) => id,
            _ => {
                let mut errors = FieldErrors::new();
                errors.add("post", "A valid post is required.");
                return Err(SubmissionError::Invalid(errors));
            }
        };
        let post = self.posts.get_visible(post_id).await?;

        let mut errors = FieldErrors::new();
        let name = errors.require_text("name", &form.name, Some(MAX_COMMENT_NAME_LEN));
        let email = errors.require_email("email", &form.email);
        let body = errors.require_text("comment", &form.comment, None);
        if let Err(errors) = errors.into_result() {
            return Err(SubmissionError::InvalidComment {
                post: Box::new(post),
                errors,
            });
        }

        let comment = self
            .comment_repo
            .create(&NewComment {
                post_id,
                name: name.to_string(),
                email: email.to_string(),
                comment: body.to_string(),
            })
            .await
            .context("Failed to save comment")?;

        tracing::info!(id = comment.id, post_id, "Stored comment");
        Ok(comment)
    }

    /// Subscribe an email address. Addresses are compared trimmed and
    /// lower-cased; a repeat signup is `Duplicate`.
    pub async fn submit_newsletter(&self, form: &NewsletterForm) -> Result<Newsletter, SubmissionError> {
        let mut errors = FieldErrors::new();
        let email = errors.require_email("email", &form.email).to_lowercase();
        errors.into_result().map_err(SubmissionError::Invalid)?;

        if self
            .newsletter_repo
            .exists_by_email(&email)
            .await
            .context("Failed to check subscriber")?
        {
            return Err(SubmissionError::Duplicate);
        }

        // The unique index settles a race between two identical signups
        let subscriber = self
            .newsletter_repo
            .create(&email)
            .await
            .context("Failed to save subscriber")?
            .ok_or(SubmissionError::Duplicate)?;

        tracing::info!(id = subscriber.id, "New newsletter subscriber");
        Ok(subscriber)
    }

    pub async fn submit_contact(&self, form: &ContactForm) -> Result<Contact, SubmissionError> {
        let mut errors = FieldErrors::new();
        let contact = NewContact {
            name: errors.require_text("name", &form.name, Some(MAX_CONTACT_NAME_LEN)).to_string(),
            email: errors.require_email("email", &form.email).to_string(),
            subject: errors.require_text("subject", &form.subject, Some(MAX_SUBJECT_LEN)).to_string(),
            message: errors.require_text("message", &form.message, None).to_string(),
        };
        errors.into_result().map_err(SubmissionError::Invalid)?;

        let contact = self
            .contact_repo
            .create(&contact)
            .await
            .context("Failed to save contact query")?;

        tracing::info!(id = contact.id, "Stored contact query");
        Ok(contact)
    }

    // ------------------------------------------------------------------
    // Staff listings
    // ------------------------------------------------------------------

    pub async fn list_comments(&self, page: PageRequest) -> Result<Page<Comment>, SubmissionError> {
        let total = self.comment_repo.count().await.context("Failed to count comments")?;
        let window = page.resolve(self.admin_page_size, total)?;
        let items = self
            .comment_repo
            .list(window.size, window.offset)
            .await
            .context("Failed to list comments")?;
        Ok(Page::new(items, window, total))
    }

    pub async fn delete_comment(&self, id: i64) -> Result<(), SubmissionError> {
        if !self.comment_repo.delete(id).await.context("Failed to delete comment")? {
            return Err(SubmissionError::NotFound(format!("comment {}", id)));
        }
        Ok(())
    }

    pub async fn list_contacts(&self, page: PageRequest) -> Result<Page<Contact>, SubmissionError> {
        let total = self.contact_repo.count().await.context("Failed to count contacts")?;
        let window = page.resolve(self.admin_page_size, total)?;
        let items = self
            .contact_repo
            .list(window.size, window.offset)
            .await
            .context("Failed to list contacts")?;
        Ok(Page::new(items, window, total))
    }

    pub async fn get_contact(&self, id: i64) -> Result<Contact, SubmissionError> {
        self.contact_repo
            .get_by_id(id)
            .await
            .context("Failed to get contact")?
            .ok_or_else(|| SubmissionError::NotFound(format!("contact {}", id)))
    }

    pub async fn delete_contact(&self, id: i64) -> Result<(), SubmissionError> {
        if !self.contact_repo.delete(id).await.context("Failed to delete contact")? {
            return Err(SubmissionError::NotFound(format!("contact {}", id)));
        }
        Ok(())
    }

    pub async fn list_subscribers(&self, page: PageRequest) -> Result<Page<Newsletter>, SubmissionError> {
        let total = self
            .newsletter_repo
            .count()
            .await
            .context("Failed to count subscribers")?;
        let window = page.resolve(self.admin_page_size, total)?;
        let items = self
            .newsletter_repo
            .list(window.size, window.offset)
            .await
            .context("Failed to list subscribers")?;
        Ok(Page::new(items, window, total))
    }

    pub async fn delete_subscriber(&self, id: i64) -> Result<(), SubmissionError> {
        if !self
            .newsletter_repo
            .delete(id)
            .await
            .context("Failed to delete subscriber")?
        {
            return Err(SubmissionError::NotFound(format!("subscriber {}", id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::db::repositories::{
        fixtures, SqlxCategoryRepository, SqlxCommentRepository, SqlxContactRepository,
        SqlxNewsletterRepository, SqlxPostRepository, SqlxProfileRepository, SqlxSessionRepository,
        SqlxTagRepository, SqlxUserRepository,
    };
    use crate::db::DynDatabasePool;
    use crate::models::PostStatus;
    use crate::services::post::PageSizes;
    use crate::services::{CategoryService, TagService, UserService};

    fn service(pool: &DynDatabasePool) -> SubmissionService {
        let cache = Arc::new(MemoryCache::new());
        let posts = Arc::new(PostService::new(
            SqlxPostRepository::boxed(pool.clone()),
            SqlxCommentRepository::boxed(pool.clone()),
            Arc::new(CategoryService::new(SqlxCategoryRepository::boxed(pool.clone()), cache.clone())),
            Arc::new(TagService::new(SqlxTagRepository::boxed(pool.clone()), cache)),
            Arc::new(UserService::new(
                SqlxUserRepository::boxed(pool.clone()),
                SqlxSessionRepository::boxed(pool.clone()),
                SqlxProfileRepository::boxed(pool.clone()),
            )),
            PageSizes::default(),
        ));
        SubmissionService::new(
            posts,
            SqlxCommentRepository::boxed(pool.clone()),
            SqlxNewsletterRepository::boxed(pool.clone()),
            SqlxContactRepository::boxed(pool.clone()),
        )
    }

    async fn published_post(pool: &DynDatabasePool) -> Post {
        let author = fixtures::insert_user(pool, "reporter", true).await;
        let category = fixtures::insert_category(pool, "World").await;
        fixtures::insert_published_post(pool, author.id, category.id, "Story").await
    }

    fn comment_form(post: Option<String>) -> CommentForm {
        CommentForm {
            post,
            name: "Reader".into(),
            email: "reader@example.com".into(),
            comment: "Well written".into(),
        }
    }

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("a@example.com"));
        assert!(is_valid_email("first.last+news@mail.example.co.uk"));
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a@@example.com"));
        assert!(!is_valid_email("a b@example.com"));
        assert!(!is_valid_email(&format!("{}@example.com", "a".repeat(250))));
    }

    #[tokio::test]
    async fn test_comment_stored_on_visible_post() {
        let pool = fixtures::migrated_pool().await;
        let post = published_post(&pool).await;
        let service = service(&pool);

        let comment = service
            .submit_comment(&comment_form(Some(post.id.to_string())))
            .await
            .unwrap();
        assert_eq!(comment.post_id, post.id);
        assert_eq!(comment.name, "Reader");
    }

    #[tokio::test]
    async fn test_comment_field_errors_carry_post() {
        let pool = fixtures::migrated_pool().await;
        let post = published_post(&pool).await;
        let service = service(&pool);

        let form = CommentForm {
            name: "x".repeat(51),
            email: "not-an-email".into(),
            comment: "   ".into(),
            ..comment_form(Some(post.id.to_string()))
        };
        match service.submit_comment(&form).await {
            Err(SubmissionError::InvalidComment { post: shown, errors }) => {
                assert_eq!(shown.id, post.id);
                assert!(errors.contains("name"));
                assert!(errors.contains("email"));
                assert!(errors.contains("comment"));
            }
            other => panic!("unexpected result: {:?}", other.map(|c| c.id)),
        }
        assert_eq!(SqlxCommentRepository::new(pool).count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_comment_on_hidden_or_missing_post() {
        let pool = fixtures::migrated_pool().await;
        let author = fixtures::insert_user(&pool, "reporter", true).await;
        let category = fixtures::insert_category(&pool, "World").await;
        let draft = fixtures::insert_post(
            &pool,
            author.id,
            category.id,
            "Draft",
            None,
            PostStatus::Active,
            0,
        )
        .await;
        let service = service(&pool);

        assert!(matches!(
            service.submit_comment(&comment_form(Some(draft.id.to_string()))).await,
            Err(SubmissionError::NotFound(_))
        ));
        assert!(matches!(
            service.submit_comment(&comment_form(Some("999".into()))).await,
            Err(SubmissionError::NotFound(_))
        ));
        assert!(matches!(
            service.submit_comment(&comment_form(None)).await,
            Err(SubmissionError::Invalid(errors)) if errors.contains("post")
        ));
        assert!(matches!(
            service.submit_comment(&comment_form(Some("abc".into()))).await,
            Err(SubmissionError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn test_newsletter_rejects_duplicates_case_insensitively() {
        let pool = fixtures::migrated_pool().await;
        let service = service(&pool);

        let first = service
            .submit_newsletter(&NewsletterForm {
                email: "  Reader@Example.com ".into(),
            })
            .await
            .unwrap();
        assert_eq!(first.email, "reader@example.com");

        assert!(matches!(
            service
                .submit_newsletter(&NewsletterForm {
                    email: "reader@example.COM".into(),
                })
                .await,
            Err(SubmissionError::Duplicate)
        ));
        assert_eq!(SqlxNewsletterRepository::new(pool).count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_newsletter_invalid_email() {
        let pool = fixtures::migrated_pool().await;
        let service = service(&pool);

        assert!(matches!(
            service.submit_newsletter(&NewsletterForm { email: "nope".into() }).await,
            Err(SubmissionError::Invalid(errors)) if errors.contains("email")
        ));
        assert!(matches!(
            service.submit_newsletter(&NewsletterForm::default()).await,
            Err(SubmissionError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn test_contact_validation_and_storage() {
        let pool = fixtures::migrated_pool().await;
        let service = service(&pool);

        let invalid = ContactForm {
            name: String::new(),
            email: "reader@example.com".into(),
            subject: "s".repeat(201),
            message: "Hello".into(),
        };
        match service.submit_contact(&invalid).await {
            Err(SubmissionError::Invalid(errors)) => {
                assert_eq!(errors.get("name").unwrap()[0], "This field is required.");
                assert!(errors.contains("subject"));
                assert!(!errors.contains("email"));
                assert!(!errors.contains("message"));
            }
            other => panic!("unexpected result: {:?}", other.map(|c| c.id)),
        }

        let stored = service
            .submit_contact(&ContactForm {
                name: " Reader ".into(),
                email: "reader@example.com".into(),
                subject: "Tip".into(),
                message: "I have a story".into(),
            })
            .await
            .unwrap();
        assert_eq!(stored.name, "Reader");
        assert_eq!(service.get_contact(stored.id).await.unwrap().subject, "Tip");
    }

    #[tokio::test]
    async fn test_staff_listings() {
        let pool = fixtures::migrated_pool().await;
        let post = published_post(&pool).await;
        let service = service(&pool).with_admin_page_size(2);

        for _ in 0..3 {
            service
                .submit_comment(&comment_form(Some(post.id.to_string())))
                .await
                .unwrap();
        }
        let page = service.list_comments(PageRequest::Last).await.unwrap();
        assert_eq!(page.page_number, 2);
        assert_eq!(page.items.len(), 1);
        assert!(matches!(
            service.list_comments(PageRequest::Number(3)).await,
            Err(SubmissionError::PageOutOfRange(_))
        ));

        let subscriber = service
            .submit_newsletter(&NewsletterForm {
                email: "a@example.com".into(),
            })
            .await
            .unwrap();
        assert_eq!(service.list_subscribers(PageRequest::default()).await.unwrap().total_count, 1);
        service.delete_subscriber(subscriber.id).await.unwrap();
        assert!(matches!(
            service.delete_subscriber(subscriber.id).await,
            Err(SubmissionError::NotFound(_))
        ));

        assert!(service.list_contacts(PageRequest::default()).await.unwrap().items.is_empty());
        assert!(matches!(service.delete_comment(999).await, Err(SubmissionError::NotFound(_))));
        assert!(matches!(service.delete_contact(999).await, Err(SubmissionError::NotFound(_))));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn simple_addresses_are_valid(
                local in "[a-z0-9]{1,20}",
                domain in "[a-z]{1,20}",
                tld in "[a-z]{2,6}",
            ) {
                let email = format!("{}@{}.{}", local, domain, tld);
                prop_assert!(is_valid_email(&email));
            }

            #[test]
            fn addresses_without_at_are_invalid(s in "[a-z0-9.]{0,40}") {
                prop_assert!(!is_valid_email(&s));
            }

            #[test]
            fn required_text_flags_only_blank(value in "\\PC{0,60}") {
                let mut errors = FieldErrors::new();
                errors.require_text("f", &value, None);
                prop_assert_eq!(errors.contains("f"), value.trim().is_empty());
            }
        }
    }
}
