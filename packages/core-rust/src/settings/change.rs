use std::collections::BTreeMap;
use std::sync::Arc;

use crate::schema::SchemaEntry;
use crate::types::Value;

/// One leaf transition produced by an update or reset.
#[derive(Debug, Clone)]
pub struct Change {
    pub entry: Arc<SchemaEntry>,
    pub previous: Value,
    pub next: Value,
}

impl Change {
    /// Path of the changed leaf.
    #[must_use]
    pub fn path(&self) -> &str {
        self.entry.path()
    }

    /// `{path, previous, next}` form, for event payloads and logs.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "path": self.path(),
            "previous": self.previous.to_json(),
            "next": self.next.to_json(),
        })
    }
}

/// Merges change records into one nested patch keyed by entry path.
#[must_use]
pub fn changes_to_patch(changes: &[Change]) -> Value {
    let mut patch = Value::Map(BTreeMap::new());
    for change in changes {
        patch.merge(&nest(change.path(), change.next.clone()));
    }
    patch
}

/// Builds `{a: {b: value}}` from `"a.b"`.
#[must_use]
pub fn nest(path: &str, value: Value) -> Value {
    path.rsplit('.').fold(value, |inner, key| {
        Value::Map(BTreeMap::from([(key.to_owned(), inner)]))
    })
}

/// Flattens nested maps into `(dotted path, leaf)` pairs. Arrays and
/// scalars are leaves; empty maps produce nothing.
#[must_use]
pub fn flatten(value: &Value) -> Vec<(String, Value)> {
    let mut out = Vec::new();
    if let Value::Map(map) = value {
        flatten_into(map, "", &mut out);
    }
    out
}

fn flatten_into(map: &BTreeMap<String, Value>, prefix: &str, out: &mut Vec<(String, Value)>) {
    for (key, value) in map {
        let path = format!("{prefix}{key}");
        match value {
            Value::Map(inner) => flatten_into(inner, &format!("{path}."), out),
            other => out.push((path, other.clone())),
        }
    }
}
