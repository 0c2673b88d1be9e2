//! Pagination types
//!
//! Page numbers are 1-based. A request is either a concrete number or
//! `last`; anything unparseable means page 1. Resolving a request against a
//! total count either yields a window or a [`PageOutOfRange`] error.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

/// Requested page, before it is checked against the result size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRequest {
    Number(i64),
    Last,
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest::Number(1)
    }
}

impl PageRequest {
    /// Parse a raw `page` query parameter.
    ///
    /// Missing or non-integer input falls back to page 1. Negative and zero
    /// values are kept so that resolving reports them as out of range.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("last") => PageRequest::Last,
            Some(value) => value
                .parse::<i64>()
                .map(PageRequest::Number)
                .unwrap_or_default(),
            None => PageRequest::default(),
        }
    }

    /// Resolve against a result set of `total_count` rows split into pages
    /// of `page_size`.
    pub fn resolve(self, page_size: i64, total_count: i64) -> Result<PageWindow, PageOutOfRange> {
        let page_size = page_size.max(1);
        let last = total_pages(total_count, page_size);

        let number = match self {
            PageRequest::Last => last,
            PageRequest::Number(n) => n,
        };

        if number < 1 || number > last {
            return Err(PageOutOfRange {
                requested: number,
                last,
            });
        }

        Ok(PageWindow {
            number,
            size: page_size,
            offset: (number - 1) * page_size,
        })
    }
}

/// Position of a page inside the full result set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: i64,
    pub size: i64,
    pub offset: i64,
}

/// Requested page lies outside `1..=last`
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("page {requested} is out of range (last page is {last})")]
pub struct PageOutOfRange {
    pub requested: i64,
    pub last: i64,
}

/// Number of pages for `total_count` items. An empty set still has one page.
pub fn total_pages(total_count: i64, page_size: i64) -> i64 {
    let page_size = page_size.max(1);
    let total_count = total_count.max(0);
    ((total_count + page_size - 1) / page_size).max(1)
}

/// One page of results
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page_number: i64,
    pub page_size: i64,
    pub total_count: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, window: PageWindow, total_count: i64) -> Self {
        Self {
            items,
            page_number: window.number,
            page_size: window.size,
            total_count,
        }
    }

    pub fn total_pages(&self) -> i64 {
        total_pages(self.total_count, self.page_size)
    }

    pub fn has_next(&self) -> bool {
        self.page_number < self.total_pages()
    }

    pub fn has_previous(&self) -> bool {
        self.page_number > 1
    }

    pub fn next_page_number(&self) -> Option<i64> {
        self.has_next().then(|| self.page_number + 1)
    }

    pub fn previous_page_number(&self) -> Option<i64> {
        self.has_previous().then(|| self.page_number - 1)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page_number: self.page_number,
            page_size: self.page_size,
            total_count: self.total_count,
        }
    }
}

impl<T: Serialize> Serialize for Page<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Page", 9)?;
        state.serialize_field("items", &self.items)?;
        state.serialize_field("page_number", &self.page_number)?;
        state.serialize_field("page_size", &self.page_size)?;
        state.serialize_field("total_count", &self.total_count)?;
        state.serialize_field("total_pages", &self.total_pages())?;
        state.serialize_field("has_next", &self.has_next())?;
        state.serialize_field("has_previous", &self.has_previous())?;
        state.serialize_field("next_page_number", &self.next_page_number())?;
        state.serialize_field("previous_page_number", &self.previous_page_number())?;
        state.end()
    }
}
