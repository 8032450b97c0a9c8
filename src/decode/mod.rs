//! Item decoding module
//!
//! Converts between the shapes an item takes on its way to the caller.
//!
//! # Overview
//!
//! The decode module provides:
//! - `wire` - Plain items to and from SDK attribute values (via `serde_dynamo`)
//! - `materialize` - Plain JSON items into caller record types and back
//!
//! Unreadable wire data is a protocol error raised while fetching. A well-formed
//! item that does not fit the caller's type is a decode error.

mod materialize;
mod wire;

pub use wire::{item_from_wire, item_to_wire, value_to_wire, WireItem};
pub use materialize::{encode_record, materialize, materialize_one};
