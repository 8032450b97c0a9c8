// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # dynaquery
//!
//! Paged query aggregation over a partitioned key/value store.
//!
//! A store query returns one page at a time plus a continuation cursor.
//! dynaquery drives those pages to completion under an item bound and a page
//! bound, then hands back one result with diagnostics.
//!
//! ## Features
//!
//! - **Bounded Aggregation**: Stop after N items, or return only page P
//! - **Two Backends**: DynamoDB through the AWS SDK, or an in-memory local store
//! - **Typed Results**: Items decode into any `serde` record type
//! - **Cancellation**: Abort long aggregations between or during page fetches
//! - **YAML Configuration**: Tables and connection settings in one file
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use dynaquery::{KeyCondition, QueryOptions, QuerySpec, StoreClient, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = StoreClient::from_file("store.yaml").await?;
//!
//!     let spec = QuerySpec::new("orders", KeyCondition::partition("customer", "c1"));
//!     let output = client
//!         .query::<Order>(&spec, &QueryOptions::new().with_max_items(50))
//!         .await?;
//!
//!     println!("{} orders in {} pages", output.records.len(), output.stats.pages);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          StoreClient                            │
//! │  save / get_one / query_one / batch_get      query / query_gsi  │
//! └─────────────────────────────────────────────────────────────────┘
//!             │                                   │
//!             │                      ┌────────────┴────────────┐
//!             │                      │     QueryAggregator     │
//!             │                      │  limit policy, bounds   │
//!             │                      └────────────┬────────────┘
//! ┌───────────┴───────────────────────────────────┴─────────────────┐
//! │              Backend = ItemStore + PageFetcher                  │
//! ├──────────────────────────────┬──────────────────────────────────┤
//! │ LocalStore                   │ RemoteStore                      │
//! │ in-memory rows, offsets      │ aws-sdk-dynamodb + serde_dynamo  │
//! └──────────────────────────────┴──────────────────────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Query specifications and expressions
pub mod query;

/// Limit policy and page data model
pub mod pagination;

/// Wire conversion and result materialization
pub mod decode;

/// Query aggregation engine
pub mod engine;

/// Store configuration and table registry
pub mod config;

/// Local and remote store backends
pub mod backend;

/// Caller-facing store client
pub mod client;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use backend::{Backend, ItemStore, LocalStore, RemoteStore};
pub use client::StoreClient;
pub use config::{
    load_config, load_config_from_str, RemoteSettings, StoreConfig, TableConfig, TableRegistry,
};
pub use engine::{
    Aggregation, AggregationStats, CancellationToken, QueryAggregator, QueryOptions, QueryOutput,
    Termination,
};
pub use pagination::{Cursor, PageFetcher, RawPage};
pub use query::{Condition, KeyCondition, QuerySpec};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
