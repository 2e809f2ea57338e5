use std::collections::BTreeMap;

use futures_util::future::{try_join_all, BoxFuture};
use futures_util::FutureExt;

use super::folder::SettingsFolder;
use super::DocumentContext;
use crate::error::SettingsError;
use crate::schema::{SchemaEntry, SchemaFolder, SchemaNode};
use crate::types::Value;

/// Resolves each path of `folder` through its serializer.
///
/// Leaves with `should_resolve` off come back raw. Array leaves resolve
/// element by element, dropping elements that resolve to null. Folders
/// resolve every descendant leaf into a nested map. Unknown paths yield
/// `None`.
///
/// # Errors
///
/// Fails when a serializer is missing or its `resolve` fails.
pub async fn resolve(
    schema: &SchemaFolder,
    folder: &SettingsFolder,
    paths: &[&str],
    doc: DocumentContext<'_>,
    extra: Option<&Value>,
) -> Result<Vec<Option<Value>>, SettingsError> {
    try_join_all(paths.iter().map(|path| async move {
        let relative = folder.relative(path);
        match schema.get(relative) {
            None => Ok(None),
            Some(SchemaNode::Entry(entry)) => {
                let stored = folder.get_value(relative).cloned().unwrap_or_default();
                resolve_entry(entry, stored, doc, extra).await.map(Some)
            }
            Some(SchemaNode::Folder(child)) => {
                resolve_folder(child, folder.get_folder(relative), doc, extra)
                    .await
                    .map(Some)
            }
        }
    }))
    .await
}

fn resolve_folder<'a>(
    schema: &'a SchemaFolder,
    folder: Option<&'a SettingsFolder>,
    doc: DocumentContext<'a>,
    extra: Option<&'a Value>,
) -> BoxFuture<'a, Result<Value, SettingsError>> {
    async move {
        let mut out = BTreeMap::new();
        for (key, node) in schema.entries() {
            let value = match node {
                SchemaNode::Entry(entry) => {
                    let stored = folder
                        .and_then(|f| f.get_value(key))
                        .cloned()
                        .unwrap_or_default();
                    resolve_entry(entry, stored, doc, extra).await?
                }
                SchemaNode::Folder(child) => {
                    resolve_folder(child, folder.and_then(|f| f.get_folder(key)), doc, extra)
                        .await?
                }
            };
            out.insert(key.to_owned(), value);
        }
        Ok(Value::Map(out))
    }
    .boxed()
}

async fn resolve_entry(
    entry: &SchemaEntry,
    stored: Value,
    doc: DocumentContext<'_>,
    extra: Option<&Value>,
) -> Result<Value, SettingsError> {
    if !entry.should_resolve() {
        return Ok(stored);
    }
    let serializer = entry
        .serializer()
        .or_else(|| doc.serializers.get(entry.type_name()))
        .ok_or_else(|| SettingsError::SerializerMissing {
            path: entry.path().to_owned(),
            type_name: entry.type_name().to_owned(),
        })?;
    let ctx = entry.context(doc.language, doc.target, extra);
    match stored {
        Value::Array(items) if entry.array() => {
            let resolved = try_join_all(items.iter().map(|item| serializer.resolve(item, &ctx))).await?;
            Ok(Value::Array(
                resolved.into_iter().filter(|value| !value.is_null()).collect(),
            ))
        }
        Value::Null => Ok(Value::Null),
        value => Ok(serializer.resolve(&value, &ctx).await?),
    }
}
