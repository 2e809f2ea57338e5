//! Root settings documents and folder views.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use settingsgate_core::settings::{changes_to_patch, resolve};
use settingsgate_core::{
    Change, ExistenceStatus, KeyError, NotReadyReason, Planner, ResetOptions, ResetPaths,
    SchemaFolder, SettingsError, SettingsFolder, SettingsNode, Target, UpdateInput, UpdateOptions,
    Value,
};
use tracing::Instrument;

use crate::gateway::GatewayInner;
use crate::observer::{SettingsObserver, UpdateContext};

struct DocState {
    status: ExistenceStatus,
    data: SettingsFolder,
    /// Bumped when a backend write starts and again when it lands. A fetch
    /// that saw a different value is older than the write and is dropped.
    writes: u64,
}

/// Settings document of one entity.
///
/// Created by a [`Gateway`](crate::Gateway) with the schema defaults and
/// status `Unsynchronized`. Writes are refused until a sync has completed.
/// Concurrent writes to the same document are not serialized: the backend
/// keeps the last write, and in-memory patches apply in completion order.
pub struct Settings {
    id: String,
    target: Arc<dyn Target>,
    gateway: Arc<GatewayInner>,
    /// `false` for copies made by [`Settings::duplicate`].
    attached: bool,
    state: RwLock<DocState>,
}

impl Settings {
    pub(crate) fn new(gateway: Arc<GatewayInner>, target: Arc<dyn Target>, id: String) -> Self {
        let data = gateway.schema.defaults().clone();
        Self {
            id,
            target,
            gateway,
            attached: true,
            state: RwLock::new(DocState {
                status: ExistenceStatus::Unsynchronized,
                data,
                writes: 0,
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn target(&self) -> &Arc<dyn Target> {
        &self.target
    }

    /// Name of the gateway (and backend table) this document belongs to.
    #[must_use]
    pub fn gateway_name(&self) -> &str {
        &self.gateway.name
    }

    #[must_use]
    pub fn status(&self) -> ExistenceStatus {
        self.state.read().status
    }

    /// `false` for detached copies, which are read-only.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    // -----------------------------------------------------------------------
    // Read path
    // -----------------------------------------------------------------------

    /// Node at a dotted path; `None` when any segment is missing.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<SettingsNode> {
        self.state.read().data.get(path).cloned()
    }

    #[must_use]
    pub fn get_value(&self, path: &str) -> Option<Value> {
        self.state.read().data.get_value(path).cloned()
    }

    /// Plain values at each path, folders unwrapped into nested maps.
    #[must_use]
    pub fn pluck(&self, paths: &[&str]) -> Vec<Option<Value>> {
        self.state.read().data.pluck(paths)
    }

    /// Runs `f` against the document without cloning it.
    pub fn with_data<R>(&self, f: impl FnOnce(&SettingsFolder) -> R) -> R {
        f(&self.state.read().data)
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        self.state.read().data.to_value()
    }

    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        self.state.read().data.to_json()
    }

    /// Resolves each path through its serializer.
    ///
    /// # Errors
    ///
    /// A missing serializer or a failing `resolve`.
    pub async fn resolve(
        &self,
        paths: &[&str],
        extra: Option<&Value>,
    ) -> Result<Vec<Option<Value>>, SettingsError> {
        self.resolve_at("", paths, extra).await
    }

    /// View of the nested folder at `path`.
    ///
    /// # Errors
    ///
    /// `KeyError::NotFound` when `path` is not a folder.
    pub fn folder(&self, path: &str) -> Result<FolderView<'_>, SettingsError> {
        self.schema_folder(path)?;
        Ok(FolderView {
            settings: self,
            path: path.to_owned(),
        })
    }

    // -----------------------------------------------------------------------
    // Write path
    // -----------------------------------------------------------------------

    /// Validates and persists new values.
    ///
    /// `input` is one `(path, value)` pair, a list of pairs, or a nested map.
    /// A null value resets its leaf to the default. Returns the change
    /// records that were written.
    ///
    /// # Errors
    ///
    /// `NotReady` before the first sync, any planning failure, or the
    /// backend write failure. Nothing is written when planning fails.
    pub async fn update(
        &self,
        input: impl Into<UpdateInput>,
        options: UpdateOptions,
    ) -> Result<Vec<Change>, SettingsError> {
        self.update_at("", input.into(), options).await
    }

    /// Resets `paths` (all keys for [`ResetPaths::all`]) to their defaults.
    ///
    /// # Errors
    ///
    /// Same as [`update`](Self::update).
    pub async fn reset(
        &self,
        paths: impl Into<ResetPaths>,
        options: ResetOptions,
    ) -> Result<Vec<Change>, SettingsError> {
        self.reset_at("", paths.into(), options).await
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Loads the backend row when `force` is set or the document was never
    /// synced. Concurrent syncs of one id share a single backend read.
    ///
    /// # Errors
    ///
    /// `NotReady` for detached copies, or the backend read failure.
    pub async fn sync(&self, force: bool) -> Result<ExistenceStatus, SettingsError> {
        self.ensure_attached()?;
        let status = self.status();
        if !force && status != ExistenceStatus::Unsynchronized {
            return Ok(status);
        }

        let generation = self.state.read().writes;
        let row = self
            .gateway
            .requests
            .fetch(&self.id)
            .await
            .map_err(|err| SettingsError::Backend(err.into()))?;

        let status = if row.is_some() {
            ExistenceStatus::Exists
        } else {
            ExistenceStatus::NotExists
        };
        {
            let mut state = self.state.write();
            if state.writes != generation {
                tracing::debug!(
                    gateway = %self.gateway.name,
                    id = %self.id,
                    "dropping a read that predates a write"
                );
                return Ok(state.status);
            }
            match &row {
                Some(data) => state.data.patch(data),
                None => state.data.reset_to_defaults(&self.gateway.schema),
            }
            state.status = status;
        }
        tracing::debug!(gateway = %self.gateway.name, id = %self.id, %status, "synchronized");
        if row.is_some() {
            self.gateway.observers.on_sync(self);
        }
        Ok(status)
    }

    /// Deletes the backend row, if any, and restores the defaults.
    ///
    /// # Errors
    ///
    /// `NotReady` for detached copies, or a backend failure.
    pub async fn destroy(&self) -> Result<(), SettingsError> {
        self.ensure_attached()?;
        if self.status() == ExistenceStatus::Unsynchronized {
            self.sync(true).await?;
        }
        let exists = {
            let mut state = self.state.write();
            state.writes += 1;
            state.status == ExistenceStatus::Exists
        };
        if exists {
            let provider = self.gateway.provider()?;
            let span = tracing::debug_span!(
                "settings_delete",
                gateway = %self.gateway.name,
                id = %self.id
            );
            provider
                .delete(&self.gateway.name, &self.id)
                .instrument(span)
                .await?;
            self.gateway.observers.on_delete(self);
        }
        let mut state = self.state.write();
        state.data.reset_to_defaults(&self.gateway.schema);
        state.status = ExistenceStatus::NotExists;
        state.writes += 1;
        Ok(())
    }

    /// Detached, read-only copy with the same id, target, status and values.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        let state = self.state.read();
        Self {
            id: self.id.clone(),
            target: Arc::clone(&self.target),
            gateway: Arc::clone(&self.gateway),
            attached: false,
            state: RwLock::new(DocState {
                status: state.status,
                data: state.data.clone(),
                writes: 0,
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Internals shared with FolderView
    // -----------------------------------------------------------------------

    fn ensure_attached(&self) -> Result<(), SettingsError> {
        if self.attached {
            Ok(())
        } else {
            Err(self.not_ready(NotReadyReason::Detached))
        }
    }

    fn ensure_ready(&self) -> Result<(), SettingsError> {
        self.ensure_attached()?;
        if self.status() == ExistenceStatus::Unsynchronized {
            return Err(self.not_ready(NotReadyReason::Unsynchronized));
        }
        Ok(())
    }

    fn not_ready(&self, reason: NotReadyReason) -> SettingsError {
        SettingsError::NotReady {
            id: self.id.clone(),
            reason,
        }
    }

    fn schema_folder(&self, path: &str) -> Result<&SchemaFolder, SettingsError> {
        if path.is_empty() {
            let root: &SchemaFolder = &self.gateway.schema;
            return Ok(root);
        }
        self.gateway.schema.get_folder(path).ok_or_else(|| {
            KeyError::NotFound {
                path: path.to_owned(),
            }
            .into()
        })
    }

    /// Copy of the folder at `path`, so planning can await without a lock.
    fn snapshot(&self, path: &str) -> Result<SettingsFolder, SettingsError> {
        let state = self.state.read();
        let folder = if path.is_empty() {
            Some(&state.data)
        } else {
            state.data.get_folder(path)
        };
        folder.cloned().ok_or_else(|| {
            KeyError::NotFound {
                path: path.to_owned(),
            }
            .into()
        })
    }

    async fn resolve_at(
        &self,
        folder_path: &str,
        paths: &[&str],
        extra: Option<&Value>,
    ) -> Result<Vec<Option<Value>>, SettingsError> {
        let schema = self.schema_folder(folder_path)?;
        let snapshot = self.snapshot(folder_path)?;
        let doc = self.gateway.document_context(Some(self.target.as_ref()));
        resolve(schema, &snapshot, paths, doc, extra).await
    }

    async fn update_at(
        &self,
        folder_path: &str,
        input: UpdateInput,
        options: UpdateOptions,
    ) -> Result<Vec<Change>, SettingsError> {
        self.ensure_ready()?;
        let schema = self.schema_folder(folder_path)?;
        let snapshot = self.snapshot(folder_path)?;
        let doc = self.gateway.document_context(Some(self.target.as_ref()));
        let changes = Planner::new(schema, &snapshot, doc)
            .plan_update(input, &options)
            .await?;
        self.persist(changes, options.extra.as_ref()).await
    }

    async fn reset_at(
        &self,
        folder_path: &str,
        paths: ResetPaths,
        options: ResetOptions,
    ) -> Result<Vec<Change>, SettingsError> {
        self.ensure_ready()?;
        let schema = self.schema_folder(folder_path)?;
        let snapshot = self.snapshot(folder_path)?;
        let doc = self.gateway.document_context(Some(self.target.as_ref()));
        let changes = Planner::new(schema, &snapshot, doc).plan_reset(paths, &options)?;
        self.persist(changes, options.extra.as_ref()).await
    }

    /// Writes `changes` as one patch, then applies it in memory and
    /// notifies observers.
    async fn persist(
        &self,
        changes: Vec<Change>,
        extra: Option<&Value>,
    ) -> Result<Vec<Change>, SettingsError> {
        if changes.is_empty() {
            return Ok(changes);
        }
        let patch = changes_to_patch(&changes);
        let provider = self.gateway.provider()?;
        let creating = {
            let mut state = self.state.write();
            state.writes += 1;
            state.status != ExistenceStatus::Exists
        };
        let table = self.gateway.name.as_str();

        let span = tracing::debug_span!(
            "settings_write",
            gateway = %table,
            id = %self.id,
            changes = changes.len(),
            create = creating
        );
        async {
            if creating {
                provider.create(table, &self.id, &patch).await
            } else {
                provider.update(table, &self.id, &patch).await
            }
        }
        .instrument(span)
        .await?;

        {
            let mut state = self.state.write();
            state.data.patch(&patch);
            state.status = ExistenceStatus::Exists;
            state.writes += 1;
        }

        let ctx = UpdateContext {
            changes: &changes,
            extra,
        };
        if creating {
            self.gateway.observers.on_create(self, &patch, &ctx);
        } else {
            self.gateway.observers.on_update(self, &patch, &ctx);
        }
        Ok(changes)
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("gateway", &self.gateway.name)
            .field("id", &self.id)
            .field("status", &self.status())
            .field("attached", &self.attached)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// FolderView
// ---------------------------------------------------------------------------

/// A nested folder of a [`Settings`] document.
///
/// Paths given to a view are relative to its folder; absolute paths inside
/// the folder are accepted too. Writes go through the owning document.
pub struct FolderView<'a> {
    settings: &'a Settings,
    path: String,
}

impl FolderView<'_> {
    /// Absolute path of the folder.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        self.settings
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<SettingsNode> {
        self.settings.with_data(|data| {
            let folder = data.get_folder(&self.path)?;
            folder.get(folder.relative(path)).cloned()
        })
    }

    #[must_use]
    pub fn get_value(&self, path: &str) -> Option<Value> {
        self.get(path).and_then(|node| node.as_value().cloned())
    }

    #[must_use]
    pub fn pluck(&self, paths: &[&str]) -> Vec<Option<Value>> {
        self.settings.with_data(|data| match data.get_folder(&self.path) {
            Some(folder) => {
                let relative: Vec<&str> = paths.iter().map(|path| folder.relative(path)).collect();
                folder.pluck(&relative)
            }
            None => vec![None; paths.len()],
        })
    }

    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        self.settings.with_data(|data| {
            data.get_folder(&self.path)
                .map_or(serde_json::Value::Null, SettingsFolder::to_json)
        })
    }

    /// # Errors
    ///
    /// See [`Settings::resolve`].
    pub async fn resolve(
        &self,
        paths: &[&str],
        extra: Option<&Value>,
    ) -> Result<Vec<Option<Value>>, SettingsError> {
        self.settings.resolve_at(&self.path, paths, extra).await
    }

    /// # Errors
    ///
    /// See [`Settings::update`].
    pub async fn update(
        &self,
        input: impl Into<UpdateInput>,
        options: UpdateOptions,
    ) -> Result<Vec<Change>, SettingsError> {
        self.settings
            .update_at(&self.path, input.into(), options)
            .await
    }

    /// Resets paths of this folder; [`ResetPaths::all`] resets every key of
    /// the folder.
    ///
    /// # Errors
    ///
    /// See [`Settings::reset`].
    pub async fn reset(
        &self,
        paths: impl Into<ResetPaths>,
        options: ResetOptions,
    ) -> Result<Vec<Change>, SettingsError> {
        self.settings
            .reset_at(&self.path, paths.into(), options)
            .await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use settingsgate_core::{
        ArrayAction, ArrayPolicyError, EntityRef, Schema, SchemaEntryOptions, SchemaError,
    };

    use super::*;
    use crate::config::GatewayConfig;
    use crate::observer::SettingsEvent;
    use crate::test_support::{harness, harness_with, Harness};
    use crate::traits::Provider;

    fn scenario_schema(schema: &mut Schema) -> Result<(), SchemaError> {
        schema
            .add("count", "number", SchemaEntryOptions::new())?
            .add("uses", "number", SchemaEntryOptions::new().array(true))?
            .add("locked", "number", SchemaEntryOptions::new().configurable(false))?
            .add_folder("messages", |folder| {
                folder.add("hello", "string", SchemaEntryOptions::new())?;
                Ok(())
            })?;
        Ok(())
    }

    async fn synced(h: &Harness, id: &str) -> Arc<Settings> {
        let settings = h.gateway.acquire(&EntityRef::new(id));
        settings.sync(false).await.unwrap();
        settings
    }

    async fn stored(h: &Harness, id: &str) -> serde_json::Value {
        h.provider
            .inner()
            .get("settings", id)
            .await
            .unwrap()
            .map_or(serde_json::Value::Null, |row| row.to_json())
    }

    #[tokio::test]
    async fn new_documents_hold_schema_defaults() {
        let h = harness(scenario_schema).await;
        let settings = h.gateway.acquire(&EntityRef::new("1"));
        assert_eq!(settings.status(), ExistenceStatus::Unsynchronized);
        assert_eq!(
            settings.to_json(),
            serde_json::json!({"count": null, "uses": [], "locked": null, "messages": {"hello": null}})
        );
    }

    #[tokio::test]
    async fn writes_before_sync_are_refused() {
        let h = harness(scenario_schema).await;
        let settings = h.gateway.acquire(&EntityRef::new("1"));
        let err = settings
            .update(("count", 1), UpdateOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SettingsError::NotReady {
                reason: NotReadyReason::Unsynchronized,
                ..
            }
        ));
        assert_eq!(h.provider.writes(), 0);
    }

    #[tokio::test]
    async fn first_write_creates_the_row() {
        let h = harness(scenario_schema).await;
        let mut events = h.gateway.subscribe_events();
        let settings = synced(&h, "1").await;
        assert_eq!(settings.status(), ExistenceStatus::NotExists);

        let changes = settings.update(("count", 6), UpdateOptions::new()).await.unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].previous, Value::Null);
        assert_eq!(changes[0].next, Value::Int(6));
        assert_eq!(settings.status(), ExistenceStatus::Exists);
        assert_eq!(settings.get_value("count"), Some(Value::Int(6)));
        assert_eq!(stored(&h, "1").await["count"], serde_json::json!(6));

        settings.update(("count", 7), UpdateOptions::new()).await.unwrap();
        let kinds: Vec<&'static str> = [events.recv().await.unwrap(), events.recv().await.unwrap()]
            .iter()
            .map(|event| match event {
                SettingsEvent::Create { .. } => "create",
                SettingsEvent::Update { .. } => "update",
                _ => "other",
            })
            .collect();
        assert_eq!(kinds, ["create", "update"]);
    }

    #[tokio::test]
    async fn duplicate_add_leaves_array_untouched() {
        let h = harness(scenario_schema).await;
        let settings = synced(&h, "1").await;
        settings
            .update(("uses", serde_json::json!([1, 2, 4])), UpdateOptions::new())
            .await
            .unwrap();
        let writes = h.provider.writes();

        let err = settings
            .update(("uses", 4), UpdateOptions::new().action(ArrayAction::Add))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SettingsError::ArrayPolicy(ArrayPolicyError::AlreadyExists { .. })
        ));
        assert_eq!(
            settings.get_value("uses").map(|v| v.to_json()),
            Some(serde_json::json!([1, 2, 4]))
        );
        assert_eq!(h.provider.writes(), writes);
    }

    #[tokio::test]
    async fn reset_writes_the_default_back() {
        let h = harness(scenario_schema).await;
        let settings = synced(&h, "1").await;
        settings
            .update(("messages.hello", "world"), UpdateOptions::new())
            .await
            .unwrap();

        let changes = settings
            .reset("messages.hello", ResetOptions::new())
            .await
            .unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].previous, Value::from("world"));
        assert_eq!(changes[0].next, Value::Null);
        assert_eq!(stored(&h, "1").await["messages"]["hello"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn reset_at_default_writes_nothing() {
        let h = harness(scenario_schema).await;
        let settings = synced(&h, "1").await;
        let changes = settings.reset(ResetPaths::all(), ResetOptions::new()).await.unwrap();
        assert!(changes.is_empty());
        assert_eq!(h.provider.writes(), 0);
        assert_eq!(settings.status(), ExistenceStatus::NotExists);
    }

    #[tokio::test]
    async fn reset_then_to_json_matches_defaults() {
        let h = harness(scenario_schema).await;
        let settings = synced(&h, "1").await;
        settings
            .update(
                serde_json::json!({"count": 3, "uses": [9], "messages": {"hello": "hi"}}),
                UpdateOptions::new(),
            )
            .await
            .unwrap();
        settings.reset(ResetPaths::all(), ResetOptions::new()).await.unwrap();
        assert_eq!(settings.to_json(), h.gateway.schema().defaults().to_json());
    }

    #[tokio::test]
    async fn only_configurable_blocks_locked_leaves() {
        let h = harness(scenario_schema).await;
        let settings = synced(&h, "1").await;
        let err = settings
            .update(("locked", 4), UpdateOptions::new().only_configurable())
            .await
            .unwrap_err();
        assert!(matches!(err, SettingsError::Unconfigurable { .. }));
        assert_eq!(h.provider.writes(), 0);
    }

    #[tokio::test]
    async fn sync_patches_an_existing_row() {
        let h = harness(scenario_schema).await;
        h.provider
            .inner()
            .create(
                "settings",
                "7",
                &Value::from(serde_json::json!({"count": 2, "messages": {"hello": "hey"}})),
            )
            .await
            .unwrap();
        let mut events = h.gateway.subscribe_events();

        let settings = synced(&h, "7").await;
        assert_eq!(settings.status(), ExistenceStatus::Exists);
        assert_eq!(settings.get_value("messages.hello"), Some(Value::from("hey")));
        assert!(matches!(events.recv().await.unwrap(), SettingsEvent::Sync { .. }));

        // Existing rows are updated, not created.
        settings.update(("count", 3), UpdateOptions::new()).await.unwrap();
        assert_eq!(stored(&h, "7").await["count"], serde_json::json!(3));
    }

    #[tokio::test]
    async fn forced_sync_of_a_missing_row_restores_defaults() {
        let h = harness(scenario_schema).await;
        let settings = synced(&h, "1").await;
        settings.update(("count", 5), UpdateOptions::new()).await.unwrap();
        h.provider.inner().delete("settings", "1").await.unwrap();

        assert_eq!(settings.sync(true).await.unwrap(), ExistenceStatus::NotExists);
        assert_eq!(settings.to_json(), h.gateway.schema().defaults().to_json());
    }

    #[tokio::test]
    async fn reads_that_predate_a_write_are_dropped() {
        let h = harness(scenario_schema).await;
        let settings = synced(&h, "1").await;
        let reads = h.provider.reads();

        // The read sees no row, then stalls until after the first write.
        let gate = h.provider.hold_next_read();
        let background = tokio::spawn({
            let settings = Arc::clone(&settings);
            async move { settings.sync(true).await }
        });
        while h.provider.reads() == reads {
            tokio::task::yield_now().await;
        }
        settings.update(("count", 1), UpdateOptions::new()).await.unwrap();
        gate.notify_one();

        assert_eq!(background.await.unwrap().unwrap(), ExistenceStatus::Exists);
        assert_eq!(settings.status(), ExistenceStatus::Exists);
        assert_eq!(settings.get_value("count"), Some(Value::Int(1)));

        settings.update(("count", 2), UpdateOptions::new()).await.unwrap();
        assert_eq!(stored(&h, "1").await["count"], serde_json::json!(2));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn background_sync_never_undoes_a_write() {
        let h = harness_with(GatewayConfig::default(), scenario_schema).await;
        for i in 0..100 {
            let id = i.to_string();
            let settings = h.gateway.acquire(&EntityRef::new(id.as_str()));
            settings.sync(false).await.unwrap();
            settings.update(("count", 1), UpdateOptions::new()).await.unwrap();
            h.gateway.sync().await;
            settings.update(("count", 2), UpdateOptions::new()).await.unwrap();
            assert_eq!(settings.status(), ExistenceStatus::Exists);
            assert_eq!(stored(&h, &id).await["count"], serde_json::json!(2));
        }
    }

    #[tokio::test]
    async fn destroy_deletes_and_restores_defaults() {
        let h = harness(scenario_schema).await;
        let settings = synced(&h, "1").await;
        settings.update(("count", 5), UpdateOptions::new()).await.unwrap();

        settings.destroy().await.unwrap();
        assert_eq!(settings.status(), ExistenceStatus::NotExists);
        assert_eq!(settings.get_value("count"), Some(Value::Null));
        assert_eq!(stored(&h, "1").await, serde_json::Value::Null);
    }

    #[tokio::test]
    async fn duplicates_are_detached() {
        let h = harness(scenario_schema).await;
        let settings = synced(&h, "1").await;
        settings.update(("count", 5), UpdateOptions::new()).await.unwrap();

        let copy = settings.duplicate();
        assert!(!copy.is_attached());
        assert_eq!(copy.id(), "1");
        assert_eq!(copy.status(), ExistenceStatus::Exists);
        assert_eq!(copy.to_json(), settings.to_json());
        assert!(matches!(
            copy.update(("count", 1), UpdateOptions::new()).await,
            Err(SettingsError::NotReady {
                reason: NotReadyReason::Detached,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn folder_views_work_relative_to_their_folder() {
        let h = harness(scenario_schema).await;
        let settings = synced(&h, "1").await;
        let messages = settings.folder("messages").unwrap();
        assert_eq!(messages.path(), "messages");

        messages.update(("hello", "hi"), UpdateOptions::new()).await.unwrap();
        assert_eq!(messages.get_value("hello"), Some(Value::from("hi")));
        assert_eq!(messages.get_value("messages.hello"), Some(Value::from("hi")));
        assert_eq!(messages.pluck(&["hello"]), [Some(Value::from("hi"))]);
        assert_eq!(messages.to_json(), serde_json::json!({"hello": "hi"}));

        let changes = messages.reset(ResetPaths::all(), ResetOptions::new()).await.unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(settings.get_value("messages.hello"), Some(Value::Null));

        assert!(settings.folder("count").is_err());
        assert!(settings.folder("nope").is_err());
    }

    #[tokio::test]
    async fn resolve_reads_through_serializers() {
        let h = harness(scenario_schema).await;
        let settings = synced(&h, "1").await;
        settings.update(("count", 2), UpdateOptions::new()).await.unwrap();
        let resolved = settings.resolve(&["count", "messages"], None).await.unwrap();
        assert_eq!(resolved[0], Some(Value::Int(2)));
        assert_eq!(
            resolved[1].as_ref().map(Value::to_json),
            Some(serde_json::json!({"hello": null}))
        );
    }
}
