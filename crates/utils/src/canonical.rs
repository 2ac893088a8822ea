//! Stable-key JSON rendering used for signed payloads and stored blobs.
//!
//! Object keys are emitted in lexicographic order at every depth and no
//! insignificant whitespace is written, so the same logical document always
//! produces the same bytes regardless of how it was built.

use serde::Serialize;
use serde_json::{Map, Value};

/// Recursively rebuild `value` with object keys inserted in sorted order.
pub fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (key, child) in entries {
                sorted.insert(key, sort_keys(child));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Canonical string form of an already-parsed JSON value.
pub fn stringify_value(value: &Value) -> String {
    sort_keys(value.clone()).to_string()
}

/// Canonical string form of any serializable value.
pub fn stringify<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    let value = serde_json::to_value(value)?;
    Ok(sort_keys(value).to_string())
}

/// Canonical form of `value` with the top-level `omit` key removed.
///
/// Non-object values are rendered unchanged.
pub fn stringify_without(value: &Value, omit: &str) -> String {
    match value {
        Value::Object(map) => {
            let mut trimmed = map.clone();
            trimmed.remove(omit);
            stringify_value(&Value::Object(trimmed))
        }
        other => stringify_value(other),
    }
}
