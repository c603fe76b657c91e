//! Common types shared across helpdesk API models.
//!
//! This module defines the page type returned by list operations and the
//! `{result, count}` envelope list endpoints wrap their items in.

use serde::Deserialize;

use crate::decode::flexible_int;

/// One page of a list endpoint.
///
/// `total_count` is only meaningful when the request asked for counts
/// (`requiresCounts=true`); otherwise it is zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Items in server-returned order.
    pub items: Vec<T>,

    /// Total number of matching records across all pages.
    pub total_count: u64,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> Page<T> {
    /// Creates a page from its items and count hint.
    pub fn new(items: Vec<T>, total_count: u64) -> Self {
        Self { items, total_count }
    }

    /// Creates an empty page.
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total_count: 0,
        }
    }

    /// Number of items on this page.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the page holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns true if the page holds at least `per_page` items, meaning more
    /// data may follow.
    pub fn is_full(&self, per_page: u32) -> bool {
        per_page > 0 && self.items.len() >= per_page as usize
    }
}

impl<T> IntoIterator for Page<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Wire envelope of list endpoints: `{"result": [...], "count": n}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ListEnvelope<T> {
    /// The page items. Required: an object without it is not a list page.
    pub result: Vec<T>,

    /// Total count, present when counts were requested.
    #[serde(default, deserialize_with = "flexible_int")]
    pub count: Option<i64>,
}

impl<T> From<ListEnvelope<T>> for Page<T> {
    fn from(envelope: ListEnvelope<T>) -> Self {
        let total_count = envelope
            .count
            .and_then(|c| u64::try_from(c).ok())
            .unwrap_or(0);
        Page::new(envelope.result, total_count)
    }
}
