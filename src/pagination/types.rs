//! Pagination types and traits
//!
//! Defines the page abstractions shared by the aggregator and both backends.

use crate::config::TableConfig;
use crate::error::{Error, Result};
use crate::query::QuerySpec;
use crate::types::{Item, JsonValue};
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use std::fmt;

// ============================================================================
// Cursor
// ============================================================================

/// Opaque continuation token returned with a page
///
/// Backends wrap their native representation (an offset, a last-evaluated key)
/// as URL-safe base64 JSON so callers can neither read nor forge its contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cursor(String);

impl Cursor {
    /// Wrap an existing token
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Encode a backend-native JSON value as a cursor
    pub fn encode(value: &JsonValue) -> Self {
        Self(URL_SAFE_NO_PAD.encode(value.to_string()))
    }

    /// Decode the backend-native JSON value carried by this cursor
    pub fn decode(&self) -> Result<JsonValue> {
        let bytes = URL_SAFE_NO_PAD
            .decode(&self.0)
            .map_err(|e| Error::invalid_cursor(format!("not base64: {e}")))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| Error::invalid_cursor(format!("not JSON: {e}")))
    }

    /// Cursor pointing at a row offset (local backend)
    pub fn from_offset(offset: usize) -> Self {
        Self::encode(&serde_json::json!({ "offset": offset }))
    }

    /// Row offset carried by this cursor (local backend)
    pub fn offset(&self) -> Result<usize> {
        self.decode()?
            .get("offset")
            .and_then(JsonValue::as_u64)
            .map(|o| o as usize)
            .ok_or_else(|| Error::invalid_cursor("missing offset"))
    }

    /// The raw token
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Raw Page
// ============================================================================

/// One response of the paged query primitive
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPage {
    /// Items in store order
    pub items: Vec<Item>,
    /// Continuation cursor; `None` signals end-of-results
    pub next_cursor: Option<Cursor>,
    /// Store-reported item count for this page
    pub count: u32,
    /// Read cost reported for this page
    pub consumed_capacity: f64,
}

impl RawPage {
    /// Create a page whose count is the number of items
    pub fn new(items: Vec<Item>, next_cursor: Option<Cursor>) -> Self {
        let count = items.len() as u32;
        Self {
            items,
            next_cursor,
            count,
            consumed_capacity: 0.0,
        }
    }

    /// Set the read cost of this page
    #[must_use]
    pub fn with_consumed_capacity(mut self, capacity: f64) -> Self {
        self.consumed_capacity = capacity;
        self
    }

    /// True when the store reported no further pages
    pub fn is_last(&self) -> bool {
        self.next_cursor.is_none()
    }
}

// ============================================================================
// Aggregation State
// ============================================================================

/// Caller-supplied bounds for one aggregation (0 = unbounded)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bounds {
    /// Maximum total items across all pages
    pub max_items: u32,
    /// Maximum number of pages; when hit, only the last page is returned
    pub max_pages: u32,
}

impl Bounds {
    /// No bounds: fetch until the store is exhausted
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Bound the total number of items
    #[must_use]
    pub fn with_max_items(mut self, max_items: u32) -> Self {
        self.max_items = max_items;
        self
    }

    /// Bound the number of pages
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// True when the page bound drives termination
    pub fn page_mode(&self) -> bool {
        self.max_pages > 0
    }

    /// True when the item bound drives termination
    pub fn item_mode(&self) -> bool {
        self.max_items > 0 && !self.page_mode()
    }
}

/// Aggregator-owned request state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageRequestState {
    /// Cursor for the next request; `None` before the first page
    pub cursor: Option<Cursor>,
    /// Item limit sent with the next request
    pub limit: Option<u32>,
    /// Remaining item budget, only ever tightened
    pub item_budget: u32,
}

/// Aggregator-owned counters, monotonically non-decreasing during a run
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AggregationCounters {
    /// Pages fetched so far
    pub pages: u32,
    /// Items fetched so far (store-reported counts)
    pub items: u64,
    /// Cumulative read cost
    pub consumed_capacity: f64,
}

impl AggregationCounters {
    /// Account for one fetched page
    pub fn record_page(&mut self, page: &RawPage) {
        self.pages += 1;
        self.items += u64::from(page.count);
        self.consumed_capacity += page.consumed_capacity;
    }

    /// Items fetched, saturated to `u32` for the limit policy
    pub fn items_u32(&self) -> u32 {
        u32::try_from(self.items).unwrap_or(u32::MAX)
    }
}

// ============================================================================
// Page Fetcher
// ============================================================================

/// The paged query primitive: one call, one page
///
/// Implementations are stateless with respect to paging: the cursor passed in
/// fully determines where the page starts.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch the page starting at `cursor` (or the first page when `None`),
    /// returning at most `limit` evaluated items when a limit is given.
    async fn fetch_page(
        &self,
        table: &TableConfig,
        spec: &QuerySpec,
        cursor: Option<&Cursor>,
        limit: Option<u32>,
    ) -> Result<RawPage>;
}
