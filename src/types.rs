//! Common types used throughout dynaquery
//!
//! This module contains shared type definitions, type aliases,
//! and utility types used across multiple modules.

use serde::{Deserialize, Serialize};

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// A single stored item: a flat map of attribute name to plain JSON value.
///
/// Both backends exchange items in this shape. The remote backend converts
/// to and from the SDK's `AttributeValue` maps at the edge.
pub type Item = serde_json::Map<String, JsonValue>;

// ============================================================================
// Backend Kind
// ============================================================================

/// Which backend a configured store talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// In-memory emulation, seeded from files or code
    #[default]
    Local,
    /// The managed store through the AWS SDK
    Remote,
}

// ============================================================================
// Utilities
// ============================================================================

/// Render a key item as `field=value` pairs, sorted by field name
pub fn describe_key(key: &Item) -> String {
    let mut parts: Vec<String> = key
        .iter()
        .map(|(field, value)| match value {
            JsonValue::String(s) => format!("{field}={s}"),
            other => format!("{field}={other}"),
        })
        .collect();
    parts.sort();
    parts.join(",")
}
