//! Query aggregation engine
//!
//! Drives a paged query to completion and returns one bounded result.
//!
//! # Overview
//!
//! The engine module provides:
//! - `QueryAggregator` - Sequential page loop over any `PageFetcher`
//! - `QueryOptions` - Page cap override, item bound, page bound
//! - `Aggregation` / `QueryOutput` - Raw and typed results with `AggregationStats`
//! - `CancellationToken` - Aborts a run between or during page fetches
//!
//! # Termination
//!
//! After every page the page-bound branch is checked first: once `max_pages`
//! pages are fetched (or the store is exhausted) the result is the LAST page
//! only. Otherwise the item-bound branch applies: once `max_items` items are
//! fetched (or the store is exhausted) the result is every page fetched so far.

mod types;

pub use types::{
    Aggregation, AggregationStats, CancellationToken, QueryOptions, QueryOutput, Termination,
};

use crate::config::TableConfig;
use crate::error::{Error, Result};
use crate::pagination::{
    next_page_cap, resolve_page_cap, should_stop_at_item_bound, should_stop_at_page_bound,
    AggregationCounters, Bounds, PageFetcher, PageRequestState, RawPage,
};
use crate::query::QuerySpec;
use crate::types::Item;
use std::time::Instant;
use tracing::{debug, info};

/// Phase of the aggregation loop
#[derive(Debug, Clone, Copy)]
enum Phase {
    /// Ready to fetch the page described by the request state
    Fetching,
    /// A bound was met or the store ran out of pages
    Done(Termination),
}

/// Sequential page loop for one query
pub struct QueryAggregator<'a, F: ?Sized> {
    fetcher: &'a F,
    table: &'a TableConfig,
    spec: &'a QuerySpec,
    page_cap: u32,
    bounds: Bounds,
    cancel: Option<&'a CancellationToken>,
}

impl<'a, F: PageFetcher + ?Sized> QueryAggregator<'a, F> {
    /// Create an unbounded aggregation using the table's default page cap
    pub fn new(fetcher: &'a F, table: &'a TableConfig, spec: &'a QuerySpec) -> Self {
        Self {
            fetcher,
            table,
            spec,
            page_cap: table.max_page_size,
            bounds: Bounds::unbounded(),
            cancel: None,
        }
    }

    /// Apply caller options
    #[must_use]
    pub fn with_options(mut self, options: &QueryOptions) -> Self {
        self.page_cap = resolve_page_cap(self.table.max_page_size, options.page_size);
        self.bounds = Bounds::unbounded()
            .with_max_items(options.max_items)
            .with_max_pages(options.max_pages);
        self
    }

    /// Abort the run when `token` is cancelled
    #[must_use]
    pub fn with_cancellation(mut self, token: &'a CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Run the loop to completion
    pub async fn run(self) -> Result<Aggregation> {
        let started = Instant::now();

        // INIT
        let mut request = PageRequestState {
            cursor: None,
            limit: None,
            item_budget: self.bounds.max_items,
        };
        request.limit = self.request_limit(request.item_budget, 0);
        let mut counters = AggregationCounters::default();
        let mut selected: Vec<Item> = Vec::new();
        let mut phase = Phase::Fetching;

        let termination = loop {
            match phase {
                Phase::Done(termination) => break termination,
                Phase::Fetching => {
                    let page = self.fetch(&request, &counters).await?;
                    counters.record_page(&page);

                    let exhausted = page.is_last();
                    debug!(
                        table = %self.table.table_name,
                        page = counters.pages,
                        count = page.count,
                        capacity = page.consumed_capacity,
                        exhausted,
                        "Fetched page"
                    );

                    let next_cursor = page.next_cursor;
                    if self.bounds.page_mode() {
                        selected = page.items;
                    } else {
                        selected.extend(page.items);
                    }

                    phase = match self.decide(&counters, exhausted) {
                        Some(termination) => Phase::Done(termination),
                        None => {
                            // CONTINUE
                            request.cursor = next_cursor;
                            if let Some(budget) =
                                next_page_cap(request.item_budget, counters.items_u32())
                            {
                                request.item_budget = budget;
                            }
                            request.limit =
                                self.request_limit(request.item_budget, counters.items_u32());
                            Phase::Fetching
                        }
                    };
                }
            }
        };

        // DONE
        if self.bounds.item_mode() {
            selected.truncate(self.bounds.max_items as usize);
        }

        let stats = AggregationStats {
            pages: counters.pages,
            items_fetched: counters.items,
            items_returned: selected.len(),
            consumed_capacity: counters.consumed_capacity,
            termination,
            duration_ms: started.elapsed().as_millis() as u64,
        };

        info!(
            table = %self.table.table_name,
            index = self.spec.index().unwrap_or(""),
            pages = stats.pages,
            items_fetched = stats.items_fetched,
            items_returned = stats.items_returned,
            consumed_capacity = stats.consumed_capacity,
            termination = %stats.termination,
            "Query complete"
        );

        Ok(Aggregation {
            items: selected,
            stats,
        })
    }

    /// Fetch one page, honouring cancellation before and during the call
    async fn fetch(
        &self,
        request: &PageRequestState,
        counters: &AggregationCounters,
    ) -> Result<RawPage> {
        let cancelled = || Error::Cancelled {
            pages_fetched: counters.pages,
        };

        let fetch = self.fetcher.fetch_page(
            self.table,
            self.spec,
            request.cursor.as_ref(),
            request.limit,
        );

        match self.cancel {
            Some(token) if token.is_cancelled() => Err(cancelled()),
            Some(token) => tokio::select! {
                biased;
                () = token.cancelled() => Err(cancelled()),
                page = fetch => page,
            },
            None => fetch.await,
        }
    }

    /// Termination decision after a page, page-bound branch first
    fn decide(&self, counters: &AggregationCounters, exhausted: bool) -> Option<Termination> {
        if self.bounds.page_mode() {
            if should_stop_at_page_bound(counters.pages, self.bounds.max_pages) {
                return Some(Termination::PageBound);
            }
        } else if should_stop_at_item_bound(
            counters.items_u32(),
            self.bounds.max_items,
            self.bounds.max_pages,
        ) {
            return Some(Termination::ItemBound);
        }

        exhausted.then_some(Termination::Exhausted)
    }

    /// Item limit for the next request.
    ///
    /// The page cap, shrunk to the tightened item budget whenever one exists.
    /// Under an active item bound it is also clamped to what is still missing,
    /// so a request never overshoots.
    fn request_limit(&self, item_budget: u32, items_fetched: u32) -> Option<u32> {
        let remaining = if self.bounds.item_mode() {
            self.bounds.max_items.saturating_sub(items_fetched)
        } else {
            0
        };
        [self.page_cap, item_budget, remaining]
            .into_iter()
            .filter(|l| *l > 0)
            .min()
    }
}

#[cfg(test)]
mod tests;
