//! Post service
//!
//! Composes the visible-post listings used by the public pages (recent,
//! featured, weekly top, trending, category/tag archives, search), the
//! post detail page, and the staff editing operations.
//!
//! Every listing is expressed as a [`PostQuery`] and handed to the
//! repository. Post lists are never cached since view counts move on every
//! detail request.

use anyhow::Context;
use chrono::{Duration, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::db::repositories::{CommentRepository, PostRepository};
use crate::db::{PostFilter, PostOrder, PostQuery};
use crate::models::{
    Author, Category, CommentView, CreatePostInput, Page, PageOutOfRange, PageRequest, Post, Tag,
    UpdatePostInput,
};
use crate::services::category::{CategoryService, CategoryServiceError};
use crate::services::tag::{TagService, TagServiceError};
use crate::services::user::{UserService, UserServiceError};

const MAX_TITLE_LEN: usize = 200;

pub const WEEKLY_TOP_WINDOW_DAYS: i64 = 7;
pub const WEEKLY_TOP_LIMIT: i64 = 7;
pub const TRENDING_LIMIT: i64 = 3;

const FEATURED_EXTRA: i64 = 3;
const HOME_POSTS: i64 = 5;
const HOME_RECENT_POSTS: i64 = 7;
const HOME_CATEGORIES: i64 = 5;
const NAV_CATEGORIES: i64 = 3;
const NAV_TAGS: i64 = 12;
const NAV_SIDE_CATEGORIES: i64 = 6;
const NAV_SIDE_POSTS: i64 = 5;

const DEFAULT_LIST_PAGE_SIZE: i64 = 10;
const DEFAULT_SEARCH_PAGE_SIZE: i64 = 3;
const DEFAULT_ADMIN_PAGE_SIZE: i64 = 20;

/// Error types for post service operations
#[derive(Debug, thiserror::Error)]
pub enum PostServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    PageOutOfRange(#[from] PageOutOfRange),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<CategoryServiceError> for PostServiceError {
    fn from(e: CategoryServiceError) -> Self {
        match e {
            CategoryServiceError::NotFound(id) => PostServiceError::NotFound(format!("category {}", id)),
            CategoryServiceError::ValidationError(msg) => PostServiceError::ValidationError(msg),
            CategoryServiceError::InternalError(e) => PostServiceError::InternalError(e),
        }
    }
}

impl From<TagServiceError> for PostServiceError {
    fn from(e: TagServiceError) -> Self {
        match e {
            TagServiceError::NotFound(id) => PostServiceError::NotFound(format!("tag {}", id)),
            TagServiceError::ValidationError(msg) => PostServiceError::ValidationError(msg),
            TagServiceError::InternalError(e) => PostServiceError::InternalError(e),
        }
    }
}

impl From<UserServiceError> for PostServiceError {
    fn from(e: UserServiceError) -> Self {
        match e {
            UserServiceError::NotFound(id) => PostServiceError::NotFound(format!("user {}", id)),
            UserServiceError::ValidationError(msg) => PostServiceError::ValidationError(msg),
            UserServiceError::InternalError(e) => PostServiceError::InternalError(e),
            other => PostServiceError::InternalError(anyhow::anyhow!(other.to_string())),
        }
    }
}

/// The lead story and the runners-up shown beside it
#[derive(Debug, Clone, Serialize)]
pub struct FeaturedPosts {
    pub featured: Option<Post>,
    pub featured_posts: Vec<Post>,
}

/// Previous and next visible posts by id
#[derive(Debug, Clone, Serialize)]
pub struct AdjacentPosts {
    pub previous: Option<Post>,
    pub next: Option<Post>,
}

/// Everything the post detail page shows
#[derive(Debug, Clone, Serialize)]
pub struct PostDetail {
    pub post: Post,
    pub category: Option<Category>,
    pub tags: Vec<Tag>,
    pub author: Option<Author>,
    pub comments: Vec<CommentView>,
    pub previous_post: Option<Post>,
    pub next_post: Option<Post>,
}

/// Home page data
#[derive(Debug, Clone, Serialize)]
pub struct HomeData {
    pub posts: Vec<Post>,
    pub featured_post: Option<Post>,
    pub featured_posts: Vec<Post>,
    pub weekly_top_posts: Vec<Post>,
    pub recent_posts: Vec<Post>,
    pub whats_new_categories: Vec<Category>,
}

/// Data shared by every page's header, footer and sidebar
#[derive(Debug, Clone, Serialize)]
pub struct Navigation {
    pub categories: Vec<Category>,
    pub tags: Vec<Tag>,
    pub trending_posts: Vec<Post>,
    pub side_categories: Vec<Category>,
    pub side_posts: Vec<Post>,
}

/// Page sizes used by the paginated listings
#[derive(Debug, Clone, Copy)]
pub struct PageSizes {
    pub list: i64,
    pub search: i64,
    pub admin: i64,
}

impl Default for PageSizes {
    fn default() -> Self {
        Self {
            list: DEFAULT_LIST_PAGE_SIZE,
            search: DEFAULT_SEARCH_PAGE_SIZE,
            admin: DEFAULT_ADMIN_PAGE_SIZE,
        }
    }
}

impl From<&crate::config::PaginationConfig> for PageSizes {
    fn from(config: &crate::config::PaginationConfig) -> Self {
        Self {
            list: i64::from(config.list_page_size),
            search: i64::from(config.search_page_size),
            admin: i64::from(config.admin_page_size),
        }
    }
}

/// Post service
pub struct PostService {
    repo: Arc<dyn PostRepository>,
    comment_repo: Arc<dyn CommentRepository>,
    categories: Arc<CategoryService>,
    tags: Arc<TagService>,
    users: Arc<UserService>,
    page_sizes: PageSizes,
}

impl PostService {
    pub fn new(
        repo: Arc<dyn PostRepository>,
        comment_repo: Arc<dyn CommentRepository>,
        categories: Arc<CategoryService>,
        tags: Arc<TagService>,
        users: Arc<UserService>,
        page_sizes: PageSizes,
    ) -> Self {
        Self {
            repo,
            comment_repo,
            categories,
            tags,
            users,
            page_sizes,
        }
    }

    async fn find(&self, query: PostQuery) -> Result<Vec<Post>, PostServiceError> {
        Ok(self.repo.find(&query).await.context("Failed to list posts")?)
    }

    /// Count the query's matches, resolve the requested page, then fetch it
    async fn paginate(
        &self,
        query: PostQuery,
        page: PageRequest,
        page_size: i64,
    ) -> Result<Page<Post>, PostServiceError> {
        let total = self.repo.count(&query).await.context("Failed to count posts")?;
        let window = page.resolve(page_size, total)?;
        let items = self
            .find(query.limit(window.size).offset(window.offset))
            .await?;
        Ok(Page::new(items, window, total))
    }

    // ------------------------------------------------------------------
    // Public listings
    // ------------------------------------------------------------------

    /// Newest visible posts
    pub async fn list_recent(&self, limit: i64) -> Result<Vec<Post>, PostServiceError> {
        self.find(PostQuery::visible().order_by(PostOrder::PublishedDesc).limit(limit))
            .await
    }

    /// Newest post as the lead story, the next three beside it
    pub async fn list_featured(&self) -> Result<FeaturedPosts, PostServiceError> {
        let mut posts = self
            .find(
                PostQuery::visible()
                    .order_by(PostOrder::PublishedDesc)
                    .order_by(PostOrder::ViewsDesc)
                    .limit(1 + FEATURED_EXTRA),
            )
            .await?
            .into_iter();

        let featured = posts.next();
        Ok(FeaturedPosts {
            featured,
            featured_posts: posts.collect(),
        })
    }

    /// Visible posts published in the last `window_days` days
    pub async fn list_weekly_top(&self, window_days: i64, limit: i64) -> Result<Vec<Post>, PostServiceError> {
        let since = Utc::now() - Duration::days(window_days);
        self.find(
            PostQuery::visible()
                .published_since(since)
                .order_by(PostOrder::PublishedDesc)
                .order_by(PostOrder::ViewsDesc)
                .limit(limit),
        )
        .await
    }

    /// Most viewed visible posts
    pub async fn list_trending(&self, limit: i64) -> Result<Vec<Post>, PostServiceError> {
        self.find(PostQuery::visible().order_by(PostOrder::ViewsDesc).limit(limit))
            .await
    }

    pub async fn list_all(&self, page: PageRequest) -> Result<Page<Post>, PostServiceError> {
        self.paginate(
            PostQuery::visible().order_by(PostOrder::PublishedDesc),
            page,
            self.page_sizes.list,
        )
        .await
    }

    /// Category archive. Unknown categories are NotFound.
    pub async fn list_by_category(
        &self,
        category_id: i64,
        page: PageRequest,
    ) -> Result<Page<Post>, PostServiceError> {
        self.categories.get(category_id).await?;
        self.paginate(
            PostQuery::visible()
                .in_category(category_id)
                .order_by(PostOrder::PublishedDesc),
            page,
            self.page_sizes.list,
        )
        .await
    }

    /// Tag archive. Unknown tags are NotFound.
    pub async fn list_by_tag(&self, tag_id: i64, page: PageRequest) -> Result<Page<Post>, PostServiceError> {
        self.tags.get(tag_id).await?;
        self.paginate(
            PostQuery::visible().tagged(tag_id).order_by(PostOrder::PublishedDesc),
            page,
            self.page_sizes.list,
        )
        .await
    }

    /// Case-insensitive search over title, content, tag names and category
    /// name. An empty query matches every visible post.
    pub async fn search(&self, text: &str, page: PageRequest) -> Result<Page<Post>, PostServiceError> {
        tracing::debug!(query = %text, "Searching posts");
        self.paginate(
            PostQuery::visible().matching(text).order_by(PostOrder::PublishedDesc),
            page,
            self.page_sizes.search,
        )
        .await
    }

    pub async fn get_adjacent(&self, post_id: i64) -> Result<AdjacentPosts, PostServiceError> {
        let previous = self
            .repo
            .find_one(
                &PostQuery::visible()
                    .filter(PostFilter::IdBelow(post_id))
                    .order_by(PostOrder::IdDesc),
            )
            .await
            .context("Failed to get previous post")?;
        let next = self
            .repo
            .find_one(
                &PostQuery::visible()
                    .filter(PostFilter::IdAbove(post_id))
                    .order_by(PostOrder::IdAsc),
            )
            .await
            .context("Failed to get next post")?;

        Ok(AdjacentPosts { previous, next })
    }

    /// Count one view. Returns false when the post does not exist.
    pub async fn record_view(&self, post_id: i64) -> Result<bool, PostServiceError> {
        let recorded = self
            .repo
            .increment_views(post_id)
            .await
            .context("Failed to record post view")?;
        tracing::debug!(post_id, recorded, "Recorded post view");
        Ok(recorded)
    }

    /// A post readers may see; drafts and inactive posts are NotFound
    pub async fn get_visible(&self, post_id: i64) -> Result<Post, PostServiceError> {
        self.repo
            .get_by_id(post_id)
            .await
            .context("Failed to get post")?
            .filter(Post::is_visible)
            .ok_or_else(|| PostServiceError::NotFound(format!("post {}", post_id)))
    }

    /// Post page: records a view, then gathers everything shown around it
    pub async fn detail(&self, post_id: i64) -> Result<PostDetail, PostServiceError> {
        let mut post = self.get_visible(post_id).await?;
        self.record_view(post_id).await?;
        if let Some(fresh) = self.repo.get_by_id(post_id).await.context("Failed to reload post")? {
            post = fresh;
        }

        let category = match self.categories.get(post.category_id).await {
            Ok(c) => Some(c),
            Err(CategoryServiceError::NotFound(_)) => None,
            Err(e) => return Err(e.into()),
        };
        let tags = self.tags.list_for_post(post_id).await?;
        let author = self.users.get_author(post.author_id).await?;
        let comments = self
            .comment_repo
            .list_for_post(post_id)
            .await
            .context("Failed to list comments")?
            .into_iter()
            .map(CommentView::from)
            .collect();
        let adjacent = self.get_adjacent(post_id).await?;

        Ok(PostDetail {
            post,
            category,
            tags,
            author,
            comments,
            previous_post: adjacent.previous,
            next_post: adjacent.next,
        })
    }

    pub async fn home(&self) -> Result<HomeData, PostServiceError> {
        let featured = self.list_featured().await?;
        Ok(HomeData {
            posts: self.list_recent(HOME_POSTS).await?,
            featured_post: featured.featured,
            featured_posts: featured.featured_posts,
            weekly_top_posts: self.list_weekly_top(WEEKLY_TOP_WINDOW_DAYS, WEEKLY_TOP_LIMIT).await?,
            recent_posts: self.list_recent(HOME_RECENT_POSTS).await?,
            whats_new_categories: self.categories.list_limited(HOME_CATEGORIES).await?,
        })
    }

    pub async fn navigation(&self) -> Result<Navigation, PostServiceError> {
        Ok(Navigation {
            categories: self.categories.list_limited(NAV_CATEGORIES).await?,
            tags: self.tags.list_limited(NAV_TAGS).await?,
            trending_posts: self.list_trending(TRENDING_LIMIT).await?,
            side_categories: self.categories.list_limited(NAV_SIDE_CATEGORIES).await?,
            side_posts: self.list_recent(NAV_SIDE_POSTS).await?,
        })
    }

    // ------------------------------------------------------------------
    // Staff operations
    // ------------------------------------------------------------------

    /// Every post including drafts, newest id first
    pub async fn list_admin(&self, page: PageRequest) -> Result<Page<Post>, PostServiceError> {
        self.paginate(
            PostQuery::all().order_by(PostOrder::IdDesc),
            page,
            self.page_sizes.admin,
        )
        .await
    }

    /// Any post regardless of visibility
    pub async fn get(&self, post_id: i64) -> Result<Post, PostServiceError> {
        self.repo
            .get_by_id(post_id)
            .await
            .context("Failed to get post")?
            .ok_or_else(|| PostServiceError::NotFound(format!("post {}", post_id)))
    }

    pub async fn tags_for(&self, post_id: i64) -> Result<Vec<Tag>, PostServiceError> {
        Ok(self.tags.list_for_post(post_id).await?)
    }

    pub async fn create(&self, author_id: i64, input: &CreatePostInput) -> Result<Post, PostServiceError> {
        validate_title(&input.title)?;
        if input.featured_image.trim().is_empty() {
            return Err(PostServiceError::ValidationError(
                "Featured image is required".to_string(),
            ));
        }
        self.ensure_category(input.category_id).await?;
        self.tags.ensure_exist(&input.tag_ids).await?;

        let post = self
            .repo
            .create(author_id, input)
            .await
            .context("Failed to create post")?;
        tracing::info!(id = post.id, title = %post.title, "Created post");
        Ok(post)
    }

    pub async fn update(&self, post_id: i64, input: &UpdatePostInput) -> Result<Post, PostServiceError> {
        if let Some(title) = &input.title {
            validate_title(title)?;
        }
        if let Some(image) = &input.featured_image {
            if image.trim().is_empty() {
                return Err(PostServiceError::ValidationError(
                    "Featured image cannot be empty".to_string(),
                ));
            }
        }
        if let Some(category_id) = input.category_id {
            self.ensure_category(category_id).await?;
        }
        if let Some(tag_ids) = &input.tag_ids {
            self.tags.ensure_exist(tag_ids).await?;
        }

        self.repo
            .update(post_id, input)
            .await
            .context("Failed to update post")?
            .ok_or_else(|| PostServiceError::NotFound(format!("post {}", post_id)))
    }

    pub async fn delete(&self, post_id: i64) -> Result<(), PostServiceError> {
        if !self.repo.delete(post_id).await.context("Failed to delete post")? {
            return Err(PostServiceError::NotFound(format!("post {}", post_id)));
        }
        tracing::info!(id = post_id, "Deleted post");
        Ok(())
    }

    /// Stamp the post as published now
    pub async fn publish(&self, post_id: i64) -> Result<Post, PostServiceError> {
        self.repo
            .set_published_at(post_id, Some(Utc::now()))
            .await
            .context("Failed to publish post")?
            .ok_or_else(|| PostServiceError::NotFound(format!("post {}", post_id)))
    }

    /// Return the post to draft
    pub async fn unpublish(&self, post_id: i64) -> Result<Post, PostServiceError> {
        self.repo
            .set_published_at(post_id, None)
            .await
            .context("Failed to unpublish post")?
            .ok_or_else(|| PostServiceError::NotFound(format!("post {}", post_id)))
    }

    async fn ensure_category(&self, category_id: i64) -> Result<(), PostServiceError> {
        if !self.categories.exists(category_id).await? {
            return Err(PostServiceError::ValidationError(format!(
                "Category {} does not exist",
                category_id
            )));
        }
        Ok(())
    }
}

fn validate_title(title: &str) -> Result<(), PostServiceError> {
    if title.trim().is_empty() {
        return Err(PostServiceError::ValidationError("Title cannot be empty".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(PostServiceError::ValidationError(format!(
            "Title cannot exceed {} characters",
            MAX_TITLE_LEN
        )));
    }
    Ok(())
}
