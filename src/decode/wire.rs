//! Conversion between plain items and SDK attribute-value maps

use crate::error::{Error, Result};
use crate::types::{Item, JsonValue};
use aws_sdk_dynamodb::types::AttributeValue;
use serde_dynamo::aws_sdk_dynamodb_1::{from_item, to_attribute_value, to_item};
use std::collections::HashMap;

/// An item as the SDK carries it
pub type WireItem = HashMap<String, AttributeValue>;

/// Convert a plain item for a request
pub fn item_to_wire(item: &Item) -> Result<WireItem> {
    to_item(item).map_err(|e| Error::encode(e.to_string()))
}

/// Convert one plain value for an expression placeholder
pub fn value_to_wire(value: &JsonValue) -> Result<AttributeValue> {
    to_attribute_value(value).map_err(|e| Error::encode(e.to_string()))
}

/// Convert a returned item; data that has no plain JSON shape is a protocol error
pub fn item_from_wire(wire: WireItem) -> Result<Item> {
    from_item(wire).map_err(|e| Error::protocol(format!("unreadable item: {e}")))
}
