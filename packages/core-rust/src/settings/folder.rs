use std::collections::BTreeMap;

use indexmap::IndexMap;

use crate::schema::SchemaFolder;
use crate::types::Value;

/// Node of a settings document.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingsNode {
    Value(Value),
    Folder(SettingsFolder),
}

impl SettingsNode {
    #[must_use]
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            Self::Folder(_) => None,
        }
    }

    #[must_use]
    pub fn as_folder(&self) -> Option<&SettingsFolder> {
        match self {
            Self::Folder(folder) => Some(folder),
            Self::Value(_) => None,
        }
    }

    /// Plain value form; folders become nested maps.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Value(value) => value.clone(),
            Self::Folder(folder) => folder.to_value(),
        }
    }
}

/// Runtime document (or sub-document) mirroring a schema folder.
///
/// The keyset always matches the schema folder it was built from: values
/// change, keys never appear or disappear at runtime.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SettingsFolder {
    path: String,
    entries: IndexMap<String, SettingsNode>,
}

impl SettingsFolder {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            entries: IndexMap::new(),
        }
    }

    /// Dotted path of the schema folder this mirrors (empty for a root).
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Walks a dotted path. Any missing segment yields `None`.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&SettingsNode> {
        match path.split_once('.') {
            None => self.entries.get(path),
            Some((head, rest)) => match self.entries.get(head)? {
                SettingsNode::Folder(folder) => folder.get(rest),
                SettingsNode::Value(_) => None,
            },
        }
    }

    /// Leaf value at `path`, if it is a leaf.
    #[must_use]
    pub fn get_value(&self, path: &str) -> Option<&Value> {
        self.get(path).and_then(SettingsNode::as_value)
    }

    /// Nested folder at `path`, if it is a folder.
    #[must_use]
    pub fn get_folder(&self, path: &str) -> Option<&SettingsFolder> {
        self.get(path).and_then(SettingsNode::as_folder)
    }

    /// Like [`get`](Self::get) for several paths, with folders unwrapped to
    /// plain nested maps.
    #[must_use]
    pub fn pluck(&self, paths: &[&str]) -> Vec<Option<Value>> {
        paths
            .iter()
            .map(|path| self.get(path).map(SettingsNode::to_value))
            .collect()
    }

    /// Strips this folder's path prefix from an absolute path. Paths outside
    /// the folder are returned unchanged.
    #[must_use]
    pub fn relative<'a>(&self, path: &'a str) -> &'a str {
        if self.path.is_empty() {
            return path;
        }
        path.strip_prefix(self.path.as_str())
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(path)
    }

    /// Applies nested `data` to keys that exist in this folder. Unknown keys,
    /// and values whose shape does not match the node (map for a folder),
    /// are ignored.
    pub fn patch(&mut self, data: &Value) {
        let Value::Map(map) = data else {
            return;
        };
        for (key, value) in map {
            match self.entries.get_mut(key) {
                Some(SettingsNode::Folder(folder)) => {
                    if value.is_map() {
                        folder.patch(value);
                    }
                }
                Some(SettingsNode::Value(current)) => *current = value.clone(),
                None => {}
            }
        }
    }

    /// Plain nested-map form of the folder.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Map(
            self.entries
                .iter()
                .map(|(key, node)| (key.clone(), node.to_value()))
                .collect::<BTreeMap<_, _>>(),
        )
    }

    /// JSON form of the folder, keys in schema order.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.entries
                .iter()
                .map(|(key, node)| {
                    let json = match node {
                        SettingsNode::Value(value) => value.to_json(),
                        SettingsNode::Folder(folder) => folder.to_json(),
                    };
                    (key.clone(), json)
                })
                .collect(),
        )
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &SettingsNode> {
        self.entries.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SettingsNode)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Restores every value to the defaults of `schema`, which must be the
    /// schema folder this document mirrors.
    pub fn reset_to_defaults(&mut self, schema: &SchemaFolder) {
        let path = std::mem::take(&mut self.path);
        *self = schema.defaults().clone();
        self.path = path;
    }

    pub(crate) fn insert(&mut self, key: String, node: SettingsNode) {
        self.entries.insert(key, node);
    }

    pub(crate) fn remove(&mut self, key: &str) {
        self.entries.shift_remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SettingsFolder {
        let mut messages = SettingsFolder::new("messages");
        messages.insert("hello".into(), SettingsNode::Value(Value::Null));
        let mut root = SettingsFolder::new("");
        root.insert("count".into(), SettingsNode::Value(Value::Int(1)));
        root.insert("messages".into(), SettingsNode::Folder(messages));
        root
    }

    #[test]
    fn reset_to_defaults_restores_schema_defaults() {
        let mut schema = crate::schema::Schema::new();
        schema
            .add("count", "number", crate::schema::SchemaEntryOptions::new().default_value(3))
            .unwrap();
        let mut doc = schema.defaults().clone();
        doc.patch(&Value::from(serde_json::json!({"count": 9})));
        doc.reset_to_defaults(&schema);
        assert_eq!(doc.to_json(), serde_json::json!({"count": 3}));
    }

    #[test]
    fn get_walks_nested_folders() {
        let root = sample();
        assert_eq!(root.get_value("count"), Some(&Value::Int(1)));
        assert!(root.get_folder("messages").is_some());
        assert_eq!(root.get_value("messages.hello"), Some(&Value::Null));
        assert!(root.get("messages.nope").is_none());
        assert!(root.get("count.nope").is_none());
    }

    #[test]
    fn pluck_unwraps_folders() {
        let root = sample();
        let plucked = root.pluck(&["count", "messages", "missing"]);
        assert_eq!(plucked[0], Some(Value::Int(1)));
        assert_eq!(
            plucked[1].as_ref().map(Value::to_json),
            Some(serde_json::json!({"hello": null}))
        );
        assert_eq!(plucked[2], None);
    }

    #[test]
    fn patch_ignores_unknown_keys_and_shape_mismatches() {
        let mut root = sample();
        root.patch(&Value::from(serde_json::json!({
            "id": "123",
            "count": 65,
            "messages": {"hello": "world", "extra": true},
        })));
        assert_eq!(
            root.to_json(),
            serde_json::json!({"count": 65, "messages": {"hello": "world"}})
        );
        root.patch(&Value::from(serde_json::json!({"messages": 4})));
        assert_eq!(root.get_value("messages.hello"), Some(&Value::from("world")));
    }

    #[test]
    fn relative_strips_only_whole_segments() {
        let folder = SettingsFolder::new("messages");
        assert_eq!(folder.relative("messages.hello"), "hello");
        assert_eq!(folder.relative("hello"), "hello");
        assert_eq!(folder.relative("messagesx.hello"), "messagesx.hello");
        assert_eq!(SettingsFolder::new("").relative("a.b"), "a.b");
    }
}
