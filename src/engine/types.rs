//! Engine types
//!
//! Options, statistics and outputs of a query aggregation.

use crate::decode::materialize;
use crate::error::Result;
use crate::types::Item;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

// ============================================================================
// Query Options
// ============================================================================

/// Caller options for one aggregated query (0 = unbounded)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Page cap override; a positive value replaces the table default
    pub page_size: Option<u32>,
    /// Maximum total items
    pub max_items: u32,
    /// Maximum pages; when hit, only the last page is returned
    pub max_pages: u32,
}

impl QueryOptions {
    /// Unbounded query with the table's default page cap
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the page cap
    #[must_use]
    pub fn with_page_size(mut self, size: u32) -> Self {
        self.page_size = Some(size);
        self
    }

    /// Bound the total number of items
    #[must_use]
    pub fn with_max_items(mut self, max: u32) -> Self {
        self.max_items = max;
        self
    }

    /// Return only page `page` (1-based) of the results
    #[must_use]
    pub fn with_max_pages(mut self, max: u32) -> Self {
        self.max_pages = max;
        self
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Why an aggregation stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The requested number of pages was fetched
    PageBound,
    /// The requested number of items was fetched
    ItemBound,
    /// The store reported no further pages
    Exhausted,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Termination::PageBound => "page_bound",
            Termination::ItemBound => "item_bound",
            Termination::Exhausted => "exhausted",
        })
    }
}

/// Diagnostics from a finished aggregation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationStats {
    /// Pages fetched
    pub pages: u32,
    /// Items fetched across all pages (store-reported counts)
    pub items_fetched: u64,
    /// Items in the returned result
    pub items_returned: usize,
    /// Cumulative read cost
    pub consumed_capacity: f64,
    /// Why the aggregation stopped
    pub termination: Termination,
    /// Wall time in milliseconds
    pub duration_ms: u64,
}

// ============================================================================
// Outputs
// ============================================================================

/// Raw result of an aggregation
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    /// Selected items: the last page under a page bound, otherwise all pages
    pub items: Vec<Item>,
    /// Diagnostics
    pub stats: AggregationStats,
}

impl Aggregation {
    /// Decode the items into the caller's record type
    pub fn materialize<T: DeserializeOwned>(self) -> Result<QueryOutput<T>> {
        Ok(QueryOutput {
            records: materialize(self.items)?,
            stats: self.stats,
        })
    }
}

/// Typed result of an aggregation
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutput<T> {
    /// Decoded records
    pub records: Vec<T>,
    /// Diagnostics
    pub stats: AggregationStats,
}

// ============================================================================
// Cancellation
// ============================================================================

/// Cooperative cancellation for long-running aggregations
///
/// Clones share state: cancelling one cancels all.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    sender: Arc<watch::Sender<bool>>,
}

impl CancellationToken {
    /// Create a token that is not cancelled
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// Resolve once cancellation is requested
    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        if receiver.wait_for(|cancelled| *cancelled).await.is_err() {
            // The sender lives as long as self, so this never completes
            std::future::pending::<()>().await;
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}
