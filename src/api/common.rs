//! Query parameters shared by several endpoints

use serde::Deserialize;

use crate::models::PageRequest;

/// `?page=` as sent by the client. Kept as a string so that junk values
/// fall back to page 1 instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: Option<String>,
}

impl PageQuery {
    pub fn request(&self) -> PageRequest {
        PageRequest::parse(self.page.as_deref())
    }
}

/// `?limit=` for the short discovery lists. A string for the same reason
/// as [`PageQuery::page`].
#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    #[serde(default)]
    pub limit: Option<String>,
}

impl LimitQuery {
    /// Requested limit clamped to `1..=max`, or `default` when absent or
    /// not an integer
    pub fn resolve(&self, default: i64, max: i64) -> i64 {
        self.limit
            .as_deref()
            .and_then(|s| s.trim().parse::<i64>().ok())
            .unwrap_or(default)
            .clamp(1, max)
    }
}

/// `?query=&page=` for search
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub page: Option<String>,
}

impl SearchQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::parse(self.page.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_query() {
        assert_eq!(PageQuery::default().request(), PageRequest::Number(1));
        let q = PageQuery {
            page: Some("last".into()),
        };
        assert_eq!(q.request(), PageRequest::Last);
        let q = PageQuery {
            page: Some("two".into()),
        };
        assert_eq!(q.request(), PageRequest::Number(1));
    }

    #[test]
    fn test_limit_query() {
        assert_eq!(LimitQuery::default().resolve(3, 50), 3);
        let limit = |s: &str| LimitQuery {
            limit: Some(s.to_string()),
        };
        assert_eq!(limit("500").resolve(3, 50), 50);
        assert_eq!(limit("-1").resolve(3, 50), 1);
        assert_eq!(limit("7").resolve(3, 50), 7);
        assert_eq!(limit("abc").resolve(3, 50), 3);
        assert_eq!(limit("").resolve(3, 50), 3);
    }
}
