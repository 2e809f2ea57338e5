//! Per-schema document cache and its backend coordination.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use settingsgate_core::{DocumentContext, ExistenceStatus, Schema, SettingsError, Target, Value};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::context::GatewayContext;
use crate::observer::{CompositeObserver, EventBroadcaster, SettingsEvent};
use crate::request_handler::{BatchFetcher, RequestHandler};
use crate::settings::Settings;
use crate::traits::Provider;

/// Failure of a background sync started by [`Gateway::acquire`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("background sync of {gateway}/{id} failed: {message}")]
pub struct SyncFailure {
    pub gateway: String,
    pub id: String,
    pub message: String,
}

pub type SyncHandle = JoinHandle<Result<ExistenceStatus, SettingsError>>;

// ---------------------------------------------------------------------------
// GatewayInner
// ---------------------------------------------------------------------------

/// State shared between a gateway and its documents.
pub(crate) struct GatewayInner {
    pub(crate) name: String,
    pub(crate) schema: Arc<Schema>,
    pub(crate) provider_name: String,
    pub(crate) context: Arc<GatewayContext>,
    pub(crate) requests: RequestHandler,
    /// Context observers plus the event broadcaster.
    pub(crate) observers: CompositeObserver,
    errors: broadcast::Sender<SyncFailure>,
    events: broadcast::Sender<SettingsEvent>,
}

impl GatewayInner {
    pub(crate) fn provider(&self) -> Result<Arc<dyn Provider>, SettingsError> {
        self.context
            .providers()
            .get(&self.provider_name)
            .ok_or_else(|| SettingsError::ProviderMissing {
                gateway: self.name.clone(),
                provider: self.provider_name.clone(),
            })
    }

    pub(crate) fn document_context<'a>(
        &'a self,
        target: Option<&'a dyn Target>,
    ) -> DocumentContext<'a> {
        DocumentContext {
            serializers: self.context.serializers(),
            language: self.context.language(),
            target,
        }
    }
}

/// Reads rows of one table through whichever provider is registered under
/// the gateway's provider name at call time.
struct TableFetcher {
    context: Arc<GatewayContext>,
    provider_name: String,
    table: String,
}

impl TableFetcher {
    fn provider(&self) -> anyhow::Result<Arc<dyn Provider>> {
        self.context
            .providers()
            .get(&self.provider_name)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "the gateway {} could not find the provider {}",
                    self.table,
                    self.provider_name
                )
            })
    }
}

#[async_trait]
impl BatchFetcher for TableFetcher {
    async fn fetch_one(&self, id: &str) -> anyhow::Result<Option<Value>> {
        self.provider()?.get(&self.table, id).await
    }

    async fn fetch_many(&self, ids: &[String]) -> anyhow::Result<Vec<(String, Value)>> {
        self.provider()?.get_all(&self.table, Some(ids)).await
    }
}

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

/// Cache of [`Settings`] documents sharing one schema and backend table.
///
/// Documents are created on first access and stay cached for the lifetime
/// of the gateway.
pub struct Gateway {
    inner: Arc<GatewayInner>,
    cache: DashMap<String, Arc<Settings>>,
    ready: AtomicBool,
}

impl Gateway {
    /// Gateway named `name` using the context's default provider. The
    /// schema is frozen.
    #[must_use]
    pub fn new(context: Arc<GatewayContext>, name: impl Into<String>, schema: Schema) -> Self {
        let provider = context.providers().default_name();
        Self::with_provider(context, name, schema, provider)
    }

    #[must_use]
    pub fn with_provider(
        context: Arc<GatewayContext>,
        name: impl Into<String>,
        mut schema: Schema,
        provider: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let provider_name = provider.into();
        schema.freeze();

        let config = Arc::clone(context.config());
        let fetcher = TableFetcher {
            context: Arc::clone(&context),
            provider_name: provider_name.clone(),
            table: name.clone(),
        };
        let requests = RequestHandler::new(
            Arc::new(fetcher),
            Duration::from_millis(config.batch_window_ms),
        );
        let (errors, _) = broadcast::channel(config.error_channel_capacity.max(1));
        let (events, _) = broadcast::channel(config.event_channel_capacity.max(1));
        let mut observers = context.observers().clone();
        observers.add(Arc::new(EventBroadcaster::new(events.clone())));

        Self {
            inner: Arc::new(GatewayInner {
                name,
                schema: Arc::new(schema),
                provider_name,
                context,
                requests,
                observers,
                errors,
                events,
            }),
            cache: DashMap::new(),
            ready: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.inner.schema
    }

    #[must_use]
    pub fn provider_name(&self) -> &str {
        &self.inner.provider_name
    }

    #[must_use]
    pub fn context(&self) -> &Arc<GatewayContext> {
        &self.inner.context
    }

    /// The backend provider, if registered.
    ///
    /// # Errors
    ///
    /// `ProviderMissing` when no provider is registered under the name.
    pub fn provider(&self) -> Result<Arc<dyn Provider>, SettingsError> {
        self.inner.provider()
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Number of cached documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Ids of cached documents, in no particular order.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.cache.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Background sync failures.
    #[must_use]
    pub fn subscribe_errors(&self) -> broadcast::Receiver<SyncFailure> {
        self.inner.errors.subscribe()
    }

    /// Sync, create, update and delete notifications of every document.
    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<SettingsEvent> {
        self.inner.events.subscribe()
    }

    // -----------------------------------------------------------------------
    // Cache
    // -----------------------------------------------------------------------

    /// Cached document for `id`. Never touches the backend.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<Settings>> {
        self.cache.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Cached document for the target's id, created on a miss.
    pub fn acquire<T: Target + Clone>(&self, target: &T) -> Arc<Settings> {
        self.acquire_with_handle(target).0
    }

    /// Like [`acquire`](Self::acquire), also returning the background sync
    /// started for a newly created document.
    pub fn acquire_with_handle<T: Target + Clone>(
        &self,
        target: &T,
    ) -> (Arc<Settings>, Option<SyncHandle>) {
        let id = target.id();
        let settings = match self.cache.entry(id) {
            Entry::Occupied(entry) => return (Arc::clone(entry.get()), None),
            Entry::Vacant(entry) => {
                let id = entry.key().clone();
                let target: Arc<dyn Target> = Arc::new(target.clone());
                let settings = Arc::new(Settings::new(Arc::clone(&self.inner), target, id));
                entry.insert(Arc::clone(&settings));
                settings
            }
        };
        let handle = self.start_sync(&settings);
        (settings, handle)
    }

    /// Creates a document for `target`, replacing any cached one, and starts
    /// its background sync.
    pub fn create(&self, target: Arc<dyn Target>) -> (Arc<Settings>, Option<SyncHandle>) {
        let id = target.id();
        let settings = Arc::new(Settings::new(Arc::clone(&self.inner), target, id.clone()));
        self.cache.insert(id, Arc::clone(&settings));
        let handle = self.start_sync(&settings);
        (settings, handle)
    }

    /// Spawns a forced sync unless the schema is empty, syncing on acquire
    /// is disabled, or no Tokio runtime is running. Failures go to the
    /// error channel.
    fn start_sync(&self, settings: &Arc<Settings>) -> Option<SyncHandle> {
        if self.inner.schema.is_empty() || !self.inner.context.config().sync_on_acquire {
            return None;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::debug!(gateway = %self.inner.name, id = %settings.id(), "no runtime, sync deferred");
            return None;
        };

        let settings = Arc::clone(settings);
        let errors = self.inner.errors.clone();
        let span = tracing::debug_span!(
            "background_sync",
            gateway = %self.inner.name,
            id = %settings.id()
        );
        Some(runtime.spawn(
            async move {
                let result = settings.sync(true).await;
                if let Err(err) = &result {
                    tracing::warn!(error = %err, "background sync failed");
                    // Nobody listening is fine.
                    let _ = errors.send(SyncFailure {
                        gateway: settings.gateway_name().to_owned(),
                        id: settings.id().to_owned(),
                        message: err.to_string(),
                    });
                }
                result
            }
            .instrument(span),
        ))
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// One-time setup: checks every schema entry, then makes sure the
    /// backend table and its columns exist.
    ///
    /// # Errors
    ///
    /// `AlreadyInitialized` on a second call, `ProviderMissing`, the
    /// aggregated schema check failure, or a backend failure. A failed init
    /// may be retried.
    pub async fn init(&self) -> Result<(), SettingsError> {
        if self.ready.swap(true, Ordering::AcqRel) {
            return Err(SettingsError::AlreadyInitialized {
                gateway: self.inner.name.clone(),
            });
        }
        let span = tracing::info_span!("gateway_init", gateway = %self.inner.name);
        let result = self.run_init().instrument(span).await;
        if result.is_err() {
            self.ready.store(false, Ordering::Release);
        }
        result
    }

    async fn run_init(&self) -> Result<(), SettingsError> {
        let provider = self.inner.provider()?;
        self.inner.schema.check(self.inner.context.serializers())?;

        let table = self.inner.name.as_str();
        if !provider.has_table(table).await? {
            tracing::info!(table, "creating table");
            provider.create_table(table).await?;
        }

        // Column-less (NoSQL) backends report no columns.
        let columns = provider.get_columns(table).await?;
        if !columns.is_empty() {
            let missing: Vec<_> = self
                .inner
                .schema
                .values_recursive()
                .into_iter()
                .filter(|entry| !columns.iter().any(|column| column == entry.path()))
                .collect();
            for entry in &missing {
                tracing::info!(table, column = %entry.path(), "adding column");
            }
            futures_util::future::try_join_all(
                missing.iter().map(|entry| provider.add_column(table, entry)),
            )
            .await?;
        }
        tracing::info!(entries = self.inner.schema.keys_recursive().len(), "gateway ready");
        Ok(())
    }

    /// Waits until every fetch requested so far has resolved.
    pub async fn sync(&self) -> &Self {
        self.inner.requests.wait().await;
        self
    }

    /// `{name, provider, schema}`.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.inner.name,
            "provider": self.inner.provider_name,
            "schema": self.inner.schema.to_json(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
