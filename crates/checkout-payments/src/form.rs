//! Form Encoding
//!
//! Stripe's API takes `application/x-www-form-urlencoded` bodies with nested
//! structures written as bracketed keys: `line_items[0][price]=price_123`.

use serde::Serialize;
use serde_json::Value;

use crate::error::{PaymentError, Result};

/// Flatten a JSON object into bracketed key/value pairs.
///
/// - objects: `parent[key]`
/// - arrays: `parent[index]`
/// - strings as-is, numbers and booleans as their JSON text
/// - `null` is dropped, so are empty objects and arrays
///
/// A scalar at the root has no key and yields nothing.
pub fn flatten(value: &Value) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    if let Value::Object(map) = value {
        for (key, child) in map {
            flatten_into(key.clone(), child, &mut pairs);
        }
    }
    pairs
}

fn flatten_into(prefix: String, value: &Value, pairs: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::String(s) => pairs.push((prefix, s.clone())),
        Value::Bool(b) => pairs.push((prefix, b.to_string())),
        Value::Number(n) => pairs.push((prefix, n.to_string())),
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                flatten_into(format!("{prefix}[{index}]"), item, pairs);
            }
        }
        Value::Object(map) => {
            for (key, child) in map {
                flatten_into(format!("{prefix}[{key}]"), child, pairs);
            }
        }
    }
}

/// Serialize a typed value and flatten it
pub fn to_form<T: Serialize>(value: &T) -> Result<Vec<(String, String)>> {
    let value = serde_json::to_value(value)
        .map_err(|e| PaymentError::Config(format!("unencodable request: {e}")))?;
    Ok(flatten(&value))
}
