//! Shared fixtures for the crate's unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use settingsgate_core::{Schema, SchemaEntry, SchemaError, Value};
use tokio::sync::Notify;

use crate::config::GatewayConfig;
use crate::context::GatewayContext;
use crate::gateway::Gateway;
use crate::provider::MemoryProvider;
use crate::traits::Provider;

/// [`MemoryProvider`] registered as `"memory"` that counts backend calls.
#[derive(Default)]
pub(crate) struct CountingProvider {
    inner: MemoryProvider,
    single_reads: AtomicUsize,
    batched_reads: AtomicUsize,
    writes: AtomicUsize,
    held_read: Mutex<Option<Arc<Notify>>>,
}

impl CountingProvider {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn inner(&self) -> &MemoryProvider {
        &self.inner
    }

    /// `get` plus `get_all` calls.
    pub(crate) fn reads(&self) -> usize {
        self.single_reads.load(Ordering::SeqCst) + self.batched_reads()
    }

    pub(crate) fn batched_reads(&self) -> usize {
        self.batched_reads.load(Ordering::SeqCst)
    }

    /// `create`, `update`, `replace` and `delete` calls.
    pub(crate) fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Makes the next read load its row, then wait for the returned
    /// notify before answering.
    pub(crate) fn hold_next_read(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.held_read.lock() = Some(Arc::clone(&gate));
        gate
    }

    fn wrote(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }

    async fn release(&self) {
        let gate = self.held_read.lock().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }
}

#[async_trait]
impl Provider for CountingProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn has_table(&self, table: &str) -> anyhow::Result<bool> {
        self.inner.has_table(table).await
    }

    async fn create_table(&self, table: &str) -> anyhow::Result<()> {
        self.inner.create_table(table).await
    }

    async fn delete_table(&self, table: &str) -> anyhow::Result<()> {
        self.inner.delete_table(table).await
    }

    async fn get_columns(&self, table: &str) -> anyhow::Result<Vec<String>> {
        self.inner.get_columns(table).await
    }

    async fn add_column(&self, table: &str, entry: &SchemaEntry) -> anyhow::Result<()> {
        self.inner.add_column(table, entry).await
    }

    async fn get(&self, table: &str, id: &str) -> anyhow::Result<Option<Value>> {
        self.single_reads.fetch_add(1, Ordering::SeqCst);
        let row = self.inner.get(table, id).await?;
        self.release().await;
        Ok(row)
    }

    async fn get_all(
        &self,
        table: &str,
        ids: Option<&[String]>,
    ) -> anyhow::Result<Vec<(String, Value)>> {
        self.batched_reads.fetch_add(1, Ordering::SeqCst);
        let rows = self.inner.get_all(table, ids).await?;
        self.release().await;
        Ok(rows)
    }

    async fn get_keys(&self, table: &str) -> anyhow::Result<Vec<String>> {
        self.inner.get_keys(table).await
    }

    async fn has(&self, table: &str, id: &str) -> anyhow::Result<bool> {
        self.inner.has(table, id).await
    }

    async fn create(&self, table: &str, id: &str, data: &Value) -> anyhow::Result<()> {
        self.wrote();
        self.inner.create(table, id, data).await
    }

    async fn update(&self, table: &str, id: &str, data: &Value) -> anyhow::Result<()> {
        self.wrote();
        self.inner.update(table, id, data).await
    }

    async fn replace(&self, table: &str, id: &str, data: &Value) -> anyhow::Result<()> {
        self.wrote();
        self.inner.replace(table, id, data).await
    }

    async fn delete(&self, table: &str, id: &str) -> anyhow::Result<()> {
        self.wrote();
        self.inner.delete(table, id).await
    }
}

pub(crate) struct Harness {
    pub(crate) gateway: Gateway,
    pub(crate) provider: Arc<CountingProvider>,
}

/// Initialized gateway named `"settings"` over a [`CountingProvider`], with
/// background syncs off so tests drive syncing themselves.
pub(crate) async fn harness<F>(build: F) -> Harness
where
    F: FnOnce(&mut Schema) -> Result<(), SchemaError>,
{
    let config = GatewayConfig {
        sync_on_acquire: false,
        ..GatewayConfig::default()
    };
    harness_with(config, build).await
}

pub(crate) async fn harness_with<F>(config: GatewayConfig, build: F) -> Harness
where
    F: FnOnce(&mut Schema) -> Result<(), SchemaError>,
{
    let provider = Arc::new(CountingProvider::new());
    let context = GatewayContext::builder()
        .config(config)
        .provider_arc(Arc::clone(&provider) as Arc<dyn Provider>)
        .build();
    let mut schema = Schema::new();
    build(&mut schema).expect("test schema is valid");
    let gateway = Gateway::new(context, "settings", schema);
    gateway.init().await.expect("gateway initializes");
    Harness { gateway, provider }
}

pub(crate) async fn memory_gateway<F>(build: F) -> Gateway
where
    F: FnOnce(&mut Schema) -> Result<(), SchemaError>,
{
    harness(build).await.gateway
}
