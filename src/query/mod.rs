//! Query description module
//!
//! Describes one logical query against a table or secondary index.
//!
//! # Overview
//!
//! The query module provides:
//! - `QuerySpec` - Immutable description of a query (table, index, key condition,
//!   filter, projection)
//! - `KeyCondition` / `Condition` - Expression trees for key and filter conditions
//! - `compile` - Renders the trees into the store's native expression syntax
//! - `matches_key` / `matches_condition` / `project` - Evaluates the same trees
//!   in-process for the local backend

mod expression;
mod types;

pub use expression::{
    compare_values, compile, matches_condition, matches_key, project, values_equal,
    CompiledExpression,
};
pub use types::{Comparator, Condition, KeyCondition, QuerySpec, SortCondition, SortKeyCondition};
