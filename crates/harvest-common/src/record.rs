//! Record utilities
//!
//! Records are the opaque JSON objects returned by a paginated endpoint. Nothing here
//! assumes a schema; the helpers only reshape records for tabular export.
//!
//! Flattening joins nested object keys with [`KEY_SEPARATOR`] and stores arrays as
//! embedded JSON text, so every flattened value is a scalar.

use crate::error::{CommonError, Result};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// One item returned by the remote service (an order, a user, an attachment...)
pub type Record = Value;

/// Separator used between nested keys in flattened column names
pub const KEY_SEPARATOR: char = '.';

/// Flatten a record into dotted keys.
///
/// Objects are walked recursively, arrays become JSON text, scalars are kept as-is.
/// A non-object input yields a single entry under the empty key. Empty nested objects
/// produce no columns.
pub fn flatten(record: &Value) -> BTreeMap<String, Value> {
    let mut out = BTreeMap::new();
    match record {
        Value::Object(map) => flatten_into(map, "", &mut out),
        other => {
            out.insert(String::new(), other.clone());
        },
    }
    out
}

fn flatten_into(map: &Map<String, Value>, prefix: &str, out: &mut BTreeMap<String, Value>) {
    for (key, value) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}{KEY_SEPARATOR}{key}")
        };

        match value {
            Value::Object(inner) => flatten_into(inner, &path, out),
            Value::Array(_) => {
                out.insert(path, Value::String(value.to_string()));
            },
            scalar => {
                out.insert(path, scalar.clone());
            },
        }
    }
}

/// Rebuild a nested object from dotted keys produced by [`flatten`].
///
/// Arrays are not restored; they stay JSON text. Fails when a key is used both as a
/// leaf and as a parent (e.g. `a` and `a.b`).
pub fn unflatten(flat: &BTreeMap<String, Value>) -> Result<Value> {
    let mut root = Map::new();

    for (key, value) in flat {
        let mut parts = key.split(KEY_SEPARATOR).peekable();
        let mut cursor = &mut root;

        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                if cursor.contains_key(part) {
                    return Err(CommonError::KeyCollision(key.clone()));
                }
                cursor.insert(part.to_string(), value.clone());
                break;
            }

            let child = cursor
                .entry(part.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            cursor = match child {
                Value::Object(inner) => inner,
                _ => return Err(CommonError::KeyCollision(key.clone())),
            };
        }
    }

    Ok(Value::Object(root))
}

/// Render a flattened value as a CSV cell.
///
/// `null` becomes an empty cell and strings are written without quotes.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Deterministic column order for a set of flattened keys: the identifier column
/// first (when present), then every other key in lexicographic order.
pub fn column_order<'a>(keys: impl IntoIterator<Item = &'a String>, id_field: &str) -> Vec<String> {
    let sorted: BTreeSet<&String> = keys.into_iter().collect();
    let mut columns = Vec::with_capacity(sorted.len());

    if sorted.iter().any(|k| k.as_str() == id_field) {
        columns.push(id_field.to_string());
    }
    columns.extend(
        sorted
            .into_iter()
            .filter(|k| k.as_str() != id_field)
            .cloned(),
    );
    columns
}
