//! Post listing queries
//!
//! Listing and discovery surfaces describe what they want as a [`PostQuery`]
//! (filters, sort keys, limit and offset). The post repository turns the
//! query into SQL; nothing else builds post listing SQL.

use chrono::{DateTime, Utc};

use crate::models::PostStatus;

/// A value bound to a `?` placeholder
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Int(i64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

/// A single predicate on posts
#[derive(Debug, Clone, PartialEq)]
pub enum PostFilter {
    /// `published_at IS NOT NULL AND status = 'active'`
    Visible,
    Category(i64),
    /// Membership in a tag through `post_tags`
    Tag(i64),
    /// `published_at >= since`
    PublishedSince(DateTime<Utc>),
    IdBelow(i64),
    IdAbove(i64),
    /// Case-insensitive substring of title, content, any tag name or the
    /// category name
    Text(String),
}

/// Sort key, applied in the order given
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostOrder {
    PublishedDesc,
    ViewsDesc,
    IdDesc,
    IdAsc,
}

impl PostOrder {
    fn sql(self) -> &'static str {
        match self {
            PostOrder::PublishedDesc => "p.published_at DESC",
            PostOrder::ViewsDesc => "p.views_count DESC",
            PostOrder::IdDesc => "p.id DESC",
            PostOrder::IdAsc => "p.id ASC",
        }
    }

    fn is_id(self) -> bool {
        matches!(self, PostOrder::IdDesc | PostOrder::IdAsc)
    }
}

/// Filters, ordering and window for a post listing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostQuery {
    pub filters: Vec<PostFilter>,
    pub order: Vec<PostOrder>,
    pub limit: Option<i64>,
    pub offset: i64,
}

/// Rendered WHERE/ORDER BY clauses plus their bind values
#[derive(Debug, Clone, PartialEq)]
pub struct SqlParts {
    pub where_clause: String,
    pub order_clause: String,
    pub values: Vec<SqlValue>,
}

impl PostQuery {
    /// Unfiltered query over all posts
    pub fn all() -> Self {
        Self::default()
    }

    /// Query restricted to publicly visible posts
    pub fn visible() -> Self {
        Self::default().filter(PostFilter::Visible)
    }

    pub fn filter(mut self, filter: PostFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn in_category(self, category_id: i64) -> Self {
        self.filter(PostFilter::Category(category_id))
    }

    pub fn tagged(self, tag_id: i64) -> Self {
        self.filter(PostFilter::Tag(tag_id))
    }

    pub fn published_since(self, since: DateTime<Utc>) -> Self {
        self.filter(PostFilter::PublishedSince(since))
    }

    /// Add a substring match on the text exactly as given. Empty text adds
    /// no predicate.
    pub fn matching(self, text: &str) -> Self {
        if text.is_empty() {
            self
        } else {
            self.filter(PostFilter::Text(text.to_string()))
        }
    }

    pub fn order_by(mut self, order: PostOrder) -> Self {
        self.order.push(order);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit.max(0));
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = offset.max(0);
        self
    }

    /// Same filters without ordering or windowing, for counting
    pub fn for_count(&self) -> Self {
        Self {
            filters: self.filters.clone(),
            ..Self::default()
        }
    }

    /// Render to SQL against `posts p`.
    ///
    /// Every ordering gets `p.id` as a final tie-breaker unless an id key is
    /// already present, so paging is stable.
    pub fn to_sql(&self) -> SqlParts {
        let mut clauses = Vec::with_capacity(self.filters.len());
        let mut values = Vec::new();

        for filter in &self.filters {
            match filter {
                PostFilter::Visible => {
                    clauses.push("(p.published_at IS NOT NULL AND p.status = ?)".to_string());
                    values.push(SqlValue::Text(PostStatus::Active.as_str().to_string()));
                }
                PostFilter::Category(id) => {
                    clauses.push("p.category_id = ?".to_string());
                    values.push(SqlValue::Int(*id));
                }
                PostFilter::Tag(id) => {
                    clauses.push(
                        "EXISTS (SELECT 1 FROM post_tags pt WHERE pt.post_id = p.id AND pt.tag_id = ?)"
                            .to_string(),
                    );
                    values.push(SqlValue::Int(*id));
                }
                PostFilter::PublishedSince(since) => {
                    clauses.push("p.published_at >= ?".to_string());
                    values.push(SqlValue::Timestamp(*since));
                }
                PostFilter::IdBelow(id) => {
                    clauses.push("p.id < ?".to_string());
                    values.push(SqlValue::Int(*id));
                }
                PostFilter::IdAbove(id) => {
                    clauses.push("p.id > ?".to_string());
                    values.push(SqlValue::Int(*id));
                }
                PostFilter::Text(text) => {
                    clauses.push(
                        "(LOWER(p.title) LIKE ? ESCAPE '!' \
                         OR LOWER(p.content) LIKE ? ESCAPE '!' \
                         OR EXISTS (SELECT 1 FROM post_tags pt JOIN tags t ON t.id = pt.tag_id \
                                    WHERE pt.post_id = p.id AND LOWER(t.name) LIKE ? ESCAPE '!') \
                         OR EXISTS (SELECT 1 FROM categories c \
                                    WHERE c.id = p.category_id AND LOWER(c.name) LIKE ? ESCAPE '!'))"
                            .to_string(),
                    );
                    let pattern = like_pattern(text);
                    for _ in 0..4 {
                        values.push(SqlValue::Text(pattern.clone()));
                    }
                }
            }
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let mut keys: Vec<&str> = self.order.iter().map(|o| o.sql()).collect();
        if !self.order.iter().any(|o| o.is_id()) {
            keys.push(PostOrder::IdDesc.sql());
        }
        let mut order_clause = format!("ORDER BY {}", keys.join(", "));

        if let Some(limit) = self.limit {
            order_clause.push_str(" LIMIT ? OFFSET ?");
            values.push(SqlValue::Int(limit));
            values.push(SqlValue::Int(self.offset));
        }

        SqlParts {
            where_clause,
            order_clause,
            values,
        }
    }
}

/// `%text%` pattern with LIKE wildcards escaped by `!`.
///
/// Only ASCII letters are folded, matching SQLite's `LOWER()`; other
/// characters must match the stored text as written.
pub fn like_pattern(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 2);
    escaped.push('%');
    for ch in text.to_ascii_lowercase().chars() {
        if matches!(ch, '!' | '%' | '_') {
            escaped.push('!');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}
