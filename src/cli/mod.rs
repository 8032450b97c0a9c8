//! CLI module
//!
//! Command-line interface over a configured store.
//!
//! # Commands
//!
//! - `tables` - List registered tables
//! - `get` - Fetch one item by primary key
//! - `put` - Store items
//! - `query` - Run a bounded, paged partition query

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat, SortOp};
pub use runner::Runner;
