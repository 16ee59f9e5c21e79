//! Deterministic JSON encoding used for every digest in the ledger.
//!
//! Objects are emitted with keys in lexicographic order and without any
//! whitespace. Numbers keep serde_json's shortest round-trip form, so a value
//! that is written out and parsed back encodes to the same bytes again.

use serde::Serialize;
use serde_json::{Map, Value};

/// Encode `value` as compact JSON with recursively sorted object keys.
pub fn to_canonical_vec<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<Vec<u8>> {
    let value = sort_keys(serde_json::to_value(value)?);
    serde_json::to_vec(&value)
}

pub fn to_canonical_string<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    let value = sort_keys(serde_json::to_value(value)?);
    serde_json::to_string(&value)
}

// serde_json's Map only sorts when `preserve_order` is off, and any crate in the
// build graph can switch that feature on.
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let sorted: Map<String, Value> = entries
                .into_iter()
                .map(|(k, v)| (k, sort_keys(v)))
                .collect();
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}
