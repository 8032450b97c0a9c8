//! Result materialization

use crate::error::{Error, Result};
use crate::types::{Item, JsonValue};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Decode a buffer of items into the caller's record type.
///
/// Fails on the first item that does not fit, naming its position.
pub fn materialize<T: DeserializeOwned>(items: Vec<Item>) -> Result<Vec<T>> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value(JsonValue::Object(item))
                .map_err(|e| Error::decode(format!("item {index}: {e}")))
        })
        .collect()
}

/// Decode a single item into the caller's record type
pub fn materialize_one<T: DeserializeOwned>(item: Item) -> Result<T> {
    serde_json::from_value(JsonValue::Object(item)).map_err(|e| Error::decode(e.to_string()))
}

/// Encode a caller record as an item; the record must serialize to a JSON object
pub fn encode_record<T: Serialize>(record: &T) -> Result<Item> {
    match serde_json::to_value(record).map_err(|e| Error::encode(e.to_string()))? {
        JsonValue::Object(item) => Ok(item),
        other => Err(Error::encode(format!(
            "record must serialize to an object, got {}",
            kind_of(&other)
        ))),
    }
}

fn kind_of(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
