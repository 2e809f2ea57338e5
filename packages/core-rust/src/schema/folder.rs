use std::sync::Arc;

use indexmap::IndexMap;

use super::entry::{SchemaEntry, SchemaEntryOptions};
use crate::error::{EntryCheckError, SchemaError};
use crate::serializer::SerializerStore;
use crate::settings::{SettingsFolder, SettingsNode};

/// Child of a [`SchemaFolder`].
#[derive(Debug, Clone)]
pub enum SchemaNode {
    Entry(Arc<SchemaEntry>),
    Folder(SchemaFolder),
}

impl SchemaNode {
    #[must_use]
    pub fn as_entry(&self) -> Option<&Arc<SchemaEntry>> {
        match self {
            Self::Entry(entry) => Some(entry),
            Self::Folder(_) => None,
        }
    }

    #[must_use]
    pub fn as_folder(&self) -> Option<&SchemaFolder> {
        match self {
            Self::Folder(folder) => Some(folder),
            Self::Entry(_) => None,
        }
    }

    /// Dotted path from the schema root.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Entry(entry) => entry.path(),
            Self::Folder(folder) => folder.path(),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Entry(entry) => entry.to_json(),
            Self::Folder(folder) => folder.to_json(),
        }
    }
}

/// Ordered tree of schema entries and nested folders.
///
/// Keeps a defaults document ([`SchemaFolder::defaults`]) in step with every
/// structural change; new documents start as a copy of it.
#[derive(Debug, Clone)]
pub struct SchemaFolder {
    key: String,
    path: String,
    children: IndexMap<String, SchemaNode>,
    defaults: SettingsFolder,
}

impl SchemaFolder {
    pub(crate) fn root() -> Self {
        Self::child("", "")
    }

    fn child(parent_path: &str, key: &str) -> Self {
        let path = if parent_path.is_empty() {
            key.to_owned()
        } else {
            format!("{parent_path}.{key}")
        };
        Self {
            key: key.to_owned(),
            defaults: SettingsFolder::new(path.clone()),
            path,
            children: IndexMap::new(),
        }
    }

    /// Adds a leaf, or edits it when `key` already names one.
    ///
    /// # Errors
    ///
    /// Fails when `key` is invalid or already names a folder.
    pub fn add(
        &mut self,
        key: &str,
        type_name: &str,
        options: SchemaEntryOptions,
    ) -> Result<&mut Self, SchemaError> {
        validate_key(key)?;
        match self.children.get_mut(key) {
            Some(SchemaNode::Folder(_)) => {
                return Err(SchemaError::TypeConflict {
                    path: self.child_path(key),
                    expected: "entry",
                    found: "folder",
                });
            }
            Some(SchemaNode::Entry(entry)) => {
                Arc::make_mut(entry).edit(Some(type_name), options);
                let default = entry.default_value().clone();
                self.defaults
                    .insert(key.to_owned(), SettingsNode::Value(default));
            }
            None => {
                let entry = SchemaEntry::new(&self.path, key, type_name, options);
                self.defaults.insert(
                    key.to_owned(),
                    SettingsNode::Value(entry.default_value().clone()),
                );
                self.children
                    .insert(key.to_owned(), SchemaNode::Entry(Arc::new(entry)));
            }
        }
        Ok(self)
    }

    /// Adds a nested folder and runs `build` on it. Re-adding an existing
    /// folder runs `build` on the existing one.
    ///
    /// # Errors
    ///
    /// Fails when `key` is invalid or already names an entry, or when
    /// `build` fails.
    pub fn add_folder<F>(&mut self, key: &str, build: F) -> Result<&mut Self, SchemaError>
    where
        F: FnOnce(&mut SchemaFolder) -> Result<(), SchemaError>,
    {
        validate_key(key)?;
        if !self.children.contains_key(key) {
            let folder = SchemaFolder::child(&self.path, key);
            self.children
                .insert(key.to_owned(), SchemaNode::Folder(folder));
        }
        let conflict_path = self.child_path(key);
        let Some(SchemaNode::Folder(folder)) = self.children.get_mut(key) else {
            return Err(SchemaError::TypeConflict {
                path: conflict_path,
                expected: "folder",
                found: "entry",
            });
        };
        let result = build(folder);
        let defaults = folder.defaults.clone();
        self.defaults
            .insert(key.to_owned(), SettingsNode::Folder(defaults));
        result.map(|()| self)
    }

    /// Removes a child. Returns whether it existed.
    pub fn delete(&mut self, key: &str) -> bool {
        self.defaults.remove(key);
        self.children.shift_remove(key).is_some()
    }

    /// Resolves a dotted path through nested folders.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&SchemaNode> {
        match path.split_once('.') {
            None => self.children.get(path),
            Some((head, rest)) => match self.children.get(head)? {
                SchemaNode::Folder(folder) => folder.get(rest),
                SchemaNode::Entry(_) => None,
            },
        }
    }

    #[must_use]
    pub fn get_entry(&self, path: &str) -> Option<&Arc<SchemaEntry>> {
        self.get(path).and_then(SchemaNode::as_entry)
    }

    #[must_use]
    pub fn get_folder(&self, path: &str) -> Option<&SchemaFolder> {
        self.get(path).and_then(SchemaNode::as_folder)
    }

    /// Immediate child keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.children.keys().map(String::as_str)
    }

    /// Immediate children in insertion order.
    pub fn values(&self) -> impl Iterator<Item = &SchemaNode> {
        self.children.values()
    }

    /// Immediate `(key, child)` pairs in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &SchemaNode)> {
        self.children.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Every leaf below this folder, depth-first in insertion order.
    #[must_use]
    pub fn values_recursive(&self) -> Vec<&Arc<SchemaEntry>> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    /// Paths of every leaf below this folder, depth-first.
    #[must_use]
    pub fn keys_recursive(&self) -> Vec<&str> {
        self.values_recursive()
            .into_iter()
            .map(|entry| entry.path())
            .collect()
    }

    /// `(path, leaf)` pairs of every leaf below this folder, depth-first.
    #[must_use]
    pub fn entries_recursive(&self) -> Vec<(&str, &Arc<SchemaEntry>)> {
        self.values_recursive()
            .into_iter()
            .map(|entry| (entry.path(), entry))
            .collect()
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Arc<SchemaEntry>>) {
        for node in self.children.values() {
            match node {
                SchemaNode::Entry(entry) => out.push(entry),
                SchemaNode::Folder(folder) => folder.collect_leaves(out),
            }
        }
    }

    /// Runs [`SchemaEntry::check`] on every leaf.
    ///
    /// # Errors
    ///
    /// Returns one [`SchemaError::Check`] listing every problem found.
    pub fn check(&self, serializers: &SerializerStore) -> Result<(), SchemaError> {
        let problems: Vec<EntryCheckError> = self
            .values_recursive()
            .into_iter()
            .filter_map(|entry| entry.check(serializers).err())
            .flatten()
            .collect();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::Check { problems })
        }
    }

    /// Template document for this folder.
    #[must_use]
    pub fn defaults(&self) -> &SettingsFolder {
        &self.defaults
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Dotted path from the schema root (empty for the root).
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Number of immediate children.
    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Nested serialized description of the folder.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.children
                .iter()
                .map(|(key, node)| (key.clone(), node.to_json()))
                .collect(),
        )
    }

    fn child_path(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_owned()
        } else {
            format!("{}.{key}", self.path)
        }
    }
}

fn validate_key(key: &str) -> Result<(), SchemaError> {
    if key.is_empty() || key.contains('.') {
        Err(SchemaError::InvalidKey {
            key: key.to_owned(),
        })
    } else {
        Ok(())
    }
}
