//! Pagination module
//!
//! Page-level data model and the limit policy that drives paging.
//!
//! # Overview
//!
//! The pagination module provides:
//! - `PageFetcher` - The single-method capability every backend implements
//! - `Cursor` / `RawPage` - One page of a paged query and its continuation token
//! - `Bounds`, `PageRequestState`, `AggregationCounters` - Aggregation state
//! - `policy` - Pure decisions on page caps and termination

pub mod policy;
mod types;

pub use policy::{next_page_cap, resolve_page_cap, should_stop_at_item_bound, should_stop_at_page_bound};
pub use types::{AggregationCounters, Bounds, Cursor, PageFetcher, PageRequestState, RawPage};
