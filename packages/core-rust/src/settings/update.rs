//! Update and reset planning.
//!
//! [`Planner`] turns caller input into [`Change`] records against a snapshot
//! of a document folder. It performs validation, permission checks and array
//! merging but never touches storage: the caller persists the changes and
//! patches the live document afterwards.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use futures_util::future::try_join_all;

use super::change::{flatten, Change};
use super::folder::SettingsFolder;
use super::DocumentContext;
use crate::error::{ArrayPolicyError, KeyError, SettingsError, ValidationError};
use crate::schema::{SchemaEntry, SchemaFolder, SchemaNode};
use crate::serializer::{Serializer, SerializerContext};
use crate::types::{Target, Value};

/// How validated values merge into a stored array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArrayAction {
    /// Toggle: remove values already present, append the others.
    #[default]
    Auto,
    /// Append; fails if any value is already present.
    Add,
    /// Remove; fails if any value is missing.
    Remove,
    /// Replace the whole array.
    Overwrite,
}

impl FromStr for ArrayAction {
    type Err = ArrayPolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "add" => Ok(Self::Add),
            "remove" => Ok(Self::Remove),
            "overwrite" => Ok(Self::Overwrite),
            _ => Err(ArrayPolicyError::UnknownAction {
                action: s.to_owned(),
            }),
        }
    }
}

impl fmt::Display for ArrayAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Auto => "auto",
            Self::Add => "add",
            Self::Remove => "remove",
            Self::Overwrite => "overwrite",
        })
    }
}

/// Options for `update`.
#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    /// Reject leaves (and folders) that are not configurable.
    pub only_configurable: bool,
    pub array_action: ArrayAction,
    /// Position for indexed array edits.
    pub array_index: Option<usize>,
    /// Passed to serializers, filters and change notifications.
    pub extra: Option<Value>,
    /// Overrides the document's own target for serializer context.
    pub target: Option<Arc<dyn Target>>,
}

impl UpdateOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn only_configurable(mut self) -> Self {
        self.only_configurable = true;
        self
    }

    #[must_use]
    pub fn action(mut self, action: ArrayAction) -> Self {
        self.array_action = action;
        self
    }

    #[must_use]
    pub fn index(mut self, index: usize) -> Self {
        self.array_index = Some(index);
        self
    }

    #[must_use]
    pub fn extra(mut self, extra: impl Into<Value>) -> Self {
        self.extra = Some(extra.into());
        self
    }

    #[must_use]
    pub fn target(mut self, target: Arc<dyn Target>) -> Self {
        self.target = Some(target);
        self
    }
}

/// Options for `reset`.
#[derive(Debug, Clone, Default)]
pub struct ResetOptions {
    pub only_configurable: bool,
    pub extra: Option<Value>,
}

impl ResetOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn only_configurable(mut self) -> Self {
        self.only_configurable = true;
        self
    }

    #[must_use]
    pub fn extra(mut self, extra: impl Into<Value>) -> Self {
        self.extra = Some(extra.into());
        self
    }
}

/// Normalized `update` input: `(path, value)` pairs.
///
/// Built from a single pair, a list of pairs, or a (nested) map whose leaves
/// are flattened into dotted paths.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateInput(pub Vec<(String, Value)>);

impl<K: Into<String>, V: Into<Value>> From<(K, V)> for UpdateInput {
    fn from((path, value): (K, V)) -> Self {
        Self(vec![(path.into(), value.into())])
    }
}

impl<K: Into<String>, V: Into<Value>> From<Vec<(K, V)>> for UpdateInput {
    fn from(pairs: Vec<(K, V)>) -> Self {
        Self(
            pairs
                .into_iter()
                .map(|(path, value)| (path.into(), value.into()))
                .collect(),
        )
    }
}

impl From<Value> for UpdateInput {
    fn from(value: Value) -> Self {
        Self(flatten(&value))
    }
}

impl From<serde_json::Value> for UpdateInput {
    fn from(value: serde_json::Value) -> Self {
        Self::from(Value::from(value))
    }
}

/// Normalized `reset` selection. `None` selects every immediate key of the
/// folder being reset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResetPaths(pub Option<Vec<String>>);

impl ResetPaths {
    /// Every key of the folder.
    #[must_use]
    pub fn all() -> Self {
        Self(None)
    }
}

impl From<&str> for ResetPaths {
    fn from(path: &str) -> Self {
        Self(Some(vec![path.to_owned()]))
    }
}

impl From<String> for ResetPaths {
    fn from(path: String) -> Self {
        Self(Some(vec![path]))
    }
}

impl From<Vec<&str>> for ResetPaths {
    fn from(paths: Vec<&str>) -> Self {
        Self(Some(paths.into_iter().map(str::to_owned).collect()))
    }
}

impl From<Vec<String>> for ResetPaths {
    fn from(paths: Vec<String>) -> Self {
        Self(Some(paths))
    }
}

/// Selects the leaf paths of a nested map.
impl From<Value> for ResetPaths {
    fn from(value: Value) -> Self {
        Self(Some(flatten(&value).into_iter().map(|(path, _)| path).collect()))
    }
}

impl From<Option<Vec<String>>> for ResetPaths {
    fn from(paths: Option<Vec<String>>) -> Self {
        Self(paths)
    }
}

/// Computes change records for one folder of a document.
pub struct Planner<'a> {
    schema: &'a SchemaFolder,
    current: &'a SettingsFolder,
    doc: DocumentContext<'a>,
}

impl<'a> Planner<'a> {
    /// `schema` and `current` must describe the same folder.
    #[must_use]
    pub fn new(schema: &'a SchemaFolder, current: &'a SettingsFolder, doc: DocumentContext<'a>) -> Self {
        Self {
            schema,
            current,
            doc,
        }
    }

    /// Plans a reset of `paths` back to their defaults. Leaves already at
    /// their default produce no change.
    ///
    /// # Errors
    ///
    /// Unknown paths, and leaves or folders blocked by `only_configurable`.
    pub fn plan_reset(
        &self,
        paths: ResetPaths,
        options: &ResetOptions,
    ) -> Result<Vec<Change>, SettingsError> {
        let paths = paths
            .0
            .unwrap_or_else(|| self.schema.keys().map(str::to_owned).collect());
        let mut changes = Vec::new();
        for path in paths {
            match self.schema.get(self.current.relative(&path)) {
                None => return Err(KeyError::NotFound { path }.into()),
                Some(SchemaNode::Folder(folder)) => {
                    self.reset_folder(folder, options, &mut changes)?;
                }
                Some(SchemaNode::Entry(entry)) => {
                    if options.only_configurable && !entry.configurable() {
                        return Err(SettingsError::Unconfigurable { path });
                    }
                    self.push_reset(entry, &mut changes);
                }
            }
        }
        tracing::trace!(folder = %self.schema.path(), changes = changes.len(), "planned reset");
        Ok(changes)
    }

    fn reset_folder(
        &self,
        folder: &SchemaFolder,
        options: &ResetOptions,
        changes: &mut Vec<Change>,
    ) -> Result<(), SettingsError> {
        let mut non_configurable = 0_usize;
        let mut skipped = 0_usize;
        let mut processed = 0_usize;
        for entry in folder.values_recursive() {
            if options.only_configurable && !entry.configurable() {
                non_configurable += 1;
            } else if self.push_reset(entry, changes) {
                processed += 1;
            } else {
                skipped += 1;
            }
        }
        if processed == 0 && skipped == 0 && non_configurable > 0 {
            return Err(SettingsError::UnconfigurableFolder {
                path: folder.path().to_owned(),
            });
        }
        Ok(())
    }

    /// Pushes a change unless the leaf already holds its default.
    fn push_reset(&self, entry: &Arc<SchemaEntry>, changes: &mut Vec<Change>) -> bool {
        let previous = self.current_value(entry);
        let next = entry.default_value();
        if &previous == next {
            return false;
        }
        changes.push(Change {
            entry: Arc::clone(entry),
            previous,
            next: next.clone(),
        });
        true
    }

    /// Plans an update. Pairs are validated concurrently; the first failure
    /// aborts the whole call.
    ///
    /// # Errors
    ///
    /// Any key, permission, validation or array-policy failure.
    pub async fn plan_update(
        &self,
        input: UpdateInput,
        options: &UpdateOptions,
    ) -> Result<Vec<Change>, SettingsError> {
        let changes = try_join_all(
            input
                .0
                .into_iter()
                .map(|(path, value)| self.plan_pair(path, value, options)),
        )
        .await?;
        tracing::trace!(
            folder = %self.schema.path(),
            changes = changes.len(),
            action = %options.array_action,
            "planned update"
        );
        Ok(changes)
    }

    async fn plan_pair(
        &self,
        path: String,
        value: Value,
        options: &UpdateOptions,
    ) -> Result<Change, SettingsError> {
        let entry = match self.schema.get(self.current.relative(&path)) {
            None => return Err(KeyError::NotFound { path }.into()),
            Some(SchemaNode::Folder(folder)) => {
                let keys: Vec<String> = if options.only_configurable {
                    folder
                        .values()
                        .filter_map(SchemaNode::as_entry)
                        .filter(|entry| entry.configurable())
                        .map(|entry| entry.key().to_owned())
                        .collect()
                } else {
                    folder.keys().map(str::to_owned).collect()
                };
                return Err(if keys.is_empty() {
                    SettingsError::UnconfigurableFolder { path }
                } else {
                    KeyError::ChooseKey { path, keys }.into()
                });
            }
            Some(SchemaNode::Entry(entry)) => entry,
        };
        if options.only_configurable && !entry.configurable() {
            return Err(SettingsError::Unconfigurable { path });
        }

        let previous = self.current_value(entry);
        if value.is_null() {
            return Ok(Change {
                entry: Arc::clone(entry),
                previous,
                next: entry.default_value().clone(),
            });
        }

        let serializer = self.serializer_for(entry)?;
        let target = options.target.as_deref().or(self.doc.target);
        let ctx = entry.context(self.doc.language, target, options.extra.as_ref());

        let next = if entry.array() {
            let inputs = match value {
                Value::Array(items) => items,
                scalar => vec![scalar],
            };
            let validated = try_join_all(
                inputs
                    .iter()
                    .map(|item| validate_one(serializer.as_ref(), item, &ctx)),
            )
            .await?;
            let stored = previous.as_array().unwrap_or_default();
            merge_array(entry.path(), stored, validated, options)?
        } else {
            validate_one(serializer.as_ref(), &value, &ctx).await?
        };

        Ok(Change {
            entry: Arc::clone(entry),
            previous,
            next,
        })
    }

    fn serializer_for(&self, entry: &SchemaEntry) -> Result<Arc<dyn Serializer>, SettingsError> {
        entry
            .serializer()
            .or_else(|| self.doc.serializers.get(entry.type_name()))
            .cloned()
            .ok_or_else(|| SettingsError::SerializerMissing {
                path: entry.path().to_owned(),
                type_name: entry.type_name().to_owned(),
            })
    }

    fn current_value(&self, entry: &SchemaEntry) -> Value {
        self.current
            .get_value(self.current.relative(entry.path()))
            .cloned()
            .unwrap_or_default()
    }
}

async fn validate_one(
    serializer: &dyn Serializer,
    value: &Value,
    ctx: &SerializerContext<'_>,
) -> Result<Value, SettingsError> {
    let parsed = serializer.validate(value, ctx).await?;
    if let Some(filter) = ctx.entry.filter() {
        if filter(&parsed, ctx) {
            return Err(ValidationError::Filtered {
                path: ctx.entry.path().to_owned(),
                value: serializer.stringify(&parsed),
            }
            .into());
        }
    }
    Ok(parsed)
}

/// Applies an array action to a copy of `stored`.
fn merge_array(
    path: &str,
    stored: &[Value],
    values: Vec<Value>,
    options: &UpdateOptions,
) -> Result<Value, ArrayPolicyError> {
    let action = options.array_action;
    if action == ArrayAction::Overwrite {
        return Ok(Value::Array(values));
    }

    let mut next = stored.to_vec();
    if let Some(index) = options.array_index {
        let max = next.len() + 1;
        if index > max {
            return Err(ArrayPolicyError::IndexOutOfRange { index, max });
        }
        if action == ArrayAction::Add {
            let at = index.min(next.len());
            next.splice(at..at, values);
        } else if action == ArrayAction::Remove || values.first().is_some_and(Value::is_null) {
            if index < next.len() {
                next.remove(index);
            }
        } else if let Some(value) = values.into_iter().next() {
            if index < next.len() {
                next[index] = value;
            } else {
                next.push(value);
            }
        }
        return Ok(Value::Array(next));
    }

    for value in values {
        let position = next.iter().position(|existing| existing == &value);
        match (action, position) {
            (ArrayAction::Add, Some(_)) => {
                return Err(ArrayPolicyError::AlreadyExists {
                    path: path.to_owned(),
                    value: value.to_string(),
                });
            }
            (ArrayAction::Remove, None) => {
                return Err(ArrayPolicyError::DoesNotExist {
                    path: path.to_owned(),
                    value: value.to_string(),
                });
            }
            (ArrayAction::Remove | ArrayAction::Auto, Some(i)) => {
                next.remove(i);
            }
            _ => next.push(value),
        }
    }
    Ok(Value::Array(next))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::language::DefaultLanguage;
    use crate::schema::{Schema, SchemaEntryOptions};
    use crate::serializer::SerializerStore;

    fn schema() -> Schema {
        let mut schema = Schema::new();
        schema
            .add("count", "number", SchemaEntryOptions::new())
            .unwrap()
            .add("locked", "number", SchemaEntryOptions::new().configurable(false))
            .unwrap()
            .add("uses", "number", SchemaEntryOptions::new().array(true))
            .unwrap()
            .add(
                "word",
                "string",
                SchemaEntryOptions::new().filter(|value, _| value.as_str() == Some("bad")),
            )
            .unwrap()
            .add_folder("messages", |folder| {
                folder.add("hello", "string", SchemaEntryOptions::new())?;
                Ok(())
            })
            .unwrap()
            .add_folder("internal", |folder| {
                folder.add("secret", "any", SchemaEntryOptions::new())?;
                Ok(())
            })
            .unwrap();
        schema
    }

    struct Fixture {
        schema: Schema,
        serializers: SerializerStore,
        language: DefaultLanguage,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                schema: schema(),
                serializers: SerializerStore::with_builtins(),
                language: DefaultLanguage::new(),
            }
        }

        fn doc(&self) -> DocumentContext<'_> {
            DocumentContext {
                serializers: &self.serializers,
                language: &self.language,
                target: None,
            }
        }

        fn document(&self, data: serde_json::Value) -> SettingsFolder {
            let mut folder = self.schema.defaults().clone();
            folder.patch(&Value::from(data));
            folder
        }

        async fn update(
            &self,
            current: &SettingsFolder,
            input: impl Into<UpdateInput>,
            options: &UpdateOptions,
        ) -> Result<Vec<Change>, SettingsError> {
            Planner::new(&self.schema, current, self.doc())
                .plan_update(input.into(), options)
                .await
        }

        fn reset(
            &self,
            current: &SettingsFolder,
            paths: impl Into<ResetPaths>,
            options: &ResetOptions,
        ) -> Result<Vec<Change>, SettingsError> {
            Planner::new(&self.schema, current, self.doc()).plan_reset(paths.into(), options)
        }
    }

    fn next_of(changes: &[Change]) -> serde_json::Value {
        changes[0].next.to_json()
    }

    #[tokio::test]
    async fn scalar_update_records_previous_and_next() {
        let fx = Fixture::new();
        let doc = fx.document(serde_json::json!({}));
        let changes = fx.update(&doc, ("count", 6), &UpdateOptions::new()).await.unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path(), "count");
        assert_eq!(changes[0].previous, Value::Null);
        assert_eq!(changes[0].next, Value::Int(6));
    }

    #[tokio::test]
    async fn null_reverts_to_default() {
        let fx = Fixture::new();
        let doc = fx.document(serde_json::json!({"count": 3}));
        let changes = fx.update(&doc, ("count", Value::Null), &UpdateOptions::new()).await.unwrap();
        assert_eq!(changes[0].previous, Value::Int(3));
        assert_eq!(changes[0].next, Value::Null);
    }

    #[tokio::test]
    async fn nested_object_input_is_flattened() {
        let fx = Fixture::new();
        let doc = fx.document(serde_json::json!({}));
        let changes = fx
            .update(
                &doc,
                serde_json::json!({"count": 2, "messages": {"hello": "hi"}}),
                &UpdateOptions::new(),
            )
            .await
            .unwrap();
        let paths: Vec<_> = changes.iter().map(Change::path).collect();
        assert_eq!(paths, ["count", "messages.hello"]);
    }

    #[tokio::test]
    async fn unknown_keys_and_folders_are_rejected() {
        let fx = Fixture::new();
        let doc = fx.document(serde_json::json!({}));
        assert!(matches!(
            fx.update(&doc, ("nope", 1), &UpdateOptions::new()).await,
            Err(SettingsError::Key(KeyError::NotFound { .. }))
        ));
        match fx.update(&doc, ("messages", "x"), &UpdateOptions::new()).await {
            Err(SettingsError::Key(KeyError::ChooseKey { keys, .. })) => assert_eq!(keys, ["hello"]),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(matches!(
            fx.update(&doc, ("internal", 1), &UpdateOptions::new().only_configurable()).await,
            Err(SettingsError::UnconfigurableFolder { .. })
        ));
    }

    #[tokio::test]
    async fn folder_targets_list_sub_folders_unless_only_configurable() {
        let mut schema = Schema::new();
        schema
            .add_folder("roles", |roles| {
                roles.add_folder("admin", |admin| {
                    admin.add("id", "string", SchemaEntryOptions::new())?;
                    Ok(())
                })?;
                roles.add_folder("mod", |moderator| {
                    moderator.add("id", "string", SchemaEntryOptions::new())?;
                    Ok(())
                })?;
                Ok(())
            })
            .unwrap();
        let fx = Fixture {
            schema,
            ..Fixture::new()
        };
        let doc = fx.document(serde_json::json!({}));

        match fx.update(&doc, ("roles", "x"), &UpdateOptions::new()).await {
            Err(SettingsError::Key(KeyError::ChooseKey { keys, .. })) => {
                assert_eq!(keys, ["admin", "mod"]);
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(matches!(
            fx.update(&doc, ("roles", "x"), &UpdateOptions::new().only_configurable()).await,
            Err(SettingsError::UnconfigurableFolder { .. })
        ));
    }

    #[tokio::test]
    async fn unconfigurable_leaf_is_blocked_only_when_asked() {
        let fx = Fixture::new();
        let doc = fx.document(serde_json::json!({}));
        assert!(matches!(
            fx.update(&doc, ("locked", 4), &UpdateOptions::new().only_configurable()).await,
            Err(SettingsError::Unconfigurable { .. })
        ));
        assert!(fx.update(&doc, ("locked", 4), &UpdateOptions::new()).await.is_ok());
    }

    #[tokio::test]
    async fn filter_rejects_values() {
        let fx = Fixture::new();
        let doc = fx.document(serde_json::json!({}));
        assert!(matches!(
            fx.update(&doc, ("word", "bad"), &UpdateOptions::new()).await,
            Err(SettingsError::Validation(ValidationError::Filtered { .. }))
        ));
        assert!(fx.update(&doc, ("word", "good"), &UpdateOptions::new()).await.is_ok());
    }

    #[tokio::test]
    async fn one_invalid_pair_fails_the_call() {
        let fx = Fixture::new();
        let doc = fx.document(serde_json::json!({}));
        let result = fx
            .update(
                &doc,
                vec![("count", Value::Int(1)), ("uses", Value::from("x"))],
                &UpdateOptions::new(),
            )
            .await;
        assert!(matches!(result, Err(SettingsError::Validation(_))));
    }

    #[tokio::test]
    async fn array_auto_toggles() {
        let fx = Fixture::new();
        let doc = fx.document(serde_json::json!({"uses": [1, 2]}));
        let changes = fx
            .update(&doc, ("uses", vec![2, 3]), &UpdateOptions::new())
            .await
            .unwrap();
        assert_eq!(next_of(&changes), serde_json::json!([1, 3]));
    }

    #[tokio::test]
    async fn array_add_rejects_duplicates() {
        let fx = Fixture::new();
        let doc = fx.document(serde_json::json!({"uses": [1, 2, 4]}));
        let result = fx
            .update(&doc, ("uses", 4), &UpdateOptions::new().action(ArrayAction::Add))
            .await;
        assert!(matches!(
            result,
            Err(SettingsError::ArrayPolicy(ArrayPolicyError::AlreadyExists { .. }))
        ));
        assert_eq!(doc.get_value("uses"), Some(&Value::from(vec![1, 2, 4])));
    }

    #[tokio::test]
    async fn array_remove_requires_presence() {
        let fx = Fixture::new();
        let doc = fx.document(serde_json::json!({"uses": [1, 2]}));
        let opts = UpdateOptions::new().action(ArrayAction::Remove);
        assert!(matches!(
            fx.update(&doc, ("uses", 5), &opts).await,
            Err(SettingsError::ArrayPolicy(ArrayPolicyError::DoesNotExist { .. }))
        ));
        let changes = fx.update(&doc, ("uses", 1), &opts).await.unwrap();
        assert_eq!(next_of(&changes), serde_json::json!([2]));
    }

    #[tokio::test]
    async fn array_overwrite_ignores_index() {
        let fx = Fixture::new();
        let doc = fx.document(serde_json::json!({"uses": [1, 2]}));
        let opts = UpdateOptions::new().action(ArrayAction::Overwrite).index(40);
        let changes = fx.update(&doc, ("uses", vec![9]), &opts).await.unwrap();
        assert_eq!(next_of(&changes), serde_json::json!([9]));
    }

    #[tokio::test]
    async fn indexed_array_edits() {
        let fx = Fixture::new();
        let doc = fx.document(serde_json::json!({"uses": [1, 2, 3]}));

        let add = UpdateOptions::new().action(ArrayAction::Add).index(1);
        let changes = fx.update(&doc, ("uses", vec![7, 8]), &add).await.unwrap();
        assert_eq!(next_of(&changes), serde_json::json!([1, 7, 8, 2, 3]));

        let remove = UpdateOptions::new().action(ArrayAction::Remove).index(0);
        let changes = fx.update(&doc, ("uses", 0), &remove).await.unwrap();
        assert_eq!(next_of(&changes), serde_json::json!([2, 3]));

        let assign = UpdateOptions::new().index(2);
        let changes = fx.update(&doc, ("uses", 9), &assign).await.unwrap();
        assert_eq!(next_of(&changes), serde_json::json!([1, 2, 9]));

        let append = UpdateOptions::new().index(3);
        let changes = fx.update(&doc, ("uses", 9), &append).await.unwrap();
        assert_eq!(next_of(&changes), serde_json::json!([1, 2, 3, 9]));

        let too_far = UpdateOptions::new().index(5);
        assert!(matches!(
            fx.update(&doc, ("uses", 9), &too_far).await,
            Err(SettingsError::ArrayPolicy(ArrayPolicyError::IndexOutOfRange { index: 5, max: 4 }))
        ));
    }

    #[test]
    fn reset_skips_leaves_already_at_default() {
        let fx = Fixture::new();
        let doc = fx.document(serde_json::json!({"messages": {"hello": "world"}}));
        let changes = fx.reset(&doc, ResetPaths::all(), &ResetOptions::new()).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path(), "messages.hello");
        assert_eq!(changes[0].previous, Value::from("world"));
        assert_eq!(changes[0].next, Value::Null);
    }

    #[test]
    fn reset_accepts_single_paths_and_maps() {
        let fx = Fixture::new();
        let doc = fx.document(serde_json::json!({"count": 1, "uses": [1]}));
        assert_eq!(fx.reset(&doc, "count", &ResetOptions::new()).unwrap().len(), 1);
        let selected = Value::from(serde_json::json!({"count": true, "uses": true}));
        assert_eq!(fx.reset(&doc, selected, &ResetOptions::new()).unwrap().len(), 2);
        assert!(matches!(
            fx.reset(&doc, "nope", &ResetOptions::new()),
            Err(SettingsError::Key(KeyError::NotFound { .. }))
        ));
    }

    #[test]
    fn reset_permission_checks() {
        let fx = Fixture::new();
        let doc = fx.document(serde_json::json!({"locked": 3, "internal": {"secret": 1}}));
        let only = ResetOptions::new().only_configurable();
        assert!(matches!(
            fx.reset(&doc, "locked", &only),
            Err(SettingsError::Unconfigurable { .. })
        ));
        assert!(matches!(
            fx.reset(&doc, "internal", &only),
            Err(SettingsError::UnconfigurableFolder { .. })
        ));
        assert_eq!(fx.reset(&doc, "internal", &ResetOptions::new()).unwrap().len(), 1);
    }

    #[test]
    fn reset_of_folder_at_defaults_is_not_an_error() {
        let fx = Fixture::new();
        let doc = fx.document(serde_json::json!({}));
        assert!(fx
            .reset(&doc, "messages", &ResetOptions::new().only_configurable())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn planner_resolves_paths_relative_to_a_nested_folder() {
        let fx = Fixture::new();
        let doc = fx.document(serde_json::json!({"messages": {"hello": "world"}}));
        let messages_schema = fx.schema.get_folder("messages").unwrap();
        let messages_doc = doc.get_folder("messages").unwrap();
        let planner = Planner::new(messages_schema, messages_doc, fx.doc());
        for path in ["hello", "messages.hello"] {
            let changes = planner.plan_reset(path.into(), &ResetOptions::new()).unwrap();
            assert_eq!(changes[0].path(), "messages.hello");
        }
    }

    #[test]
    fn array_action_parses_case_insensitively() {
        assert_eq!("ADD".parse::<ArrayAction>().unwrap(), ArrayAction::Add);
        assert!(matches!(
            "merge".parse::<ArrayAction>(),
            Err(ArrayPolicyError::UnknownAction { .. })
        ));
    }

    proptest! {
        #[test]
        fn auto_is_self_inverse(
            stored in proptest::collection::btree_set(-5i64..5, 0..6),
            input in proptest::collection::btree_set(-5i64..5, 1..4),
        ) {
            let stored: Vec<Value> = stored.into_iter().map(Value::Int).collect();
            let values: Vec<Value> = input.into_iter().map(Value::Int).collect();
            let options = UpdateOptions::new();
            let once = merge_array("uses", &stored, values.clone(), &options).unwrap();
            let twice = merge_array("uses", once.as_array().unwrap(), values, &options).unwrap();
            let mut expected = stored.clone();
            let mut actual = twice.as_array().unwrap().to_vec();
            expected.sort_by_key(Value::to_string);
            actual.sort_by_key(Value::to_string);
            prop_assert_eq!(actual, expected);
        }
    }
}
