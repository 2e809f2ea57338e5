//! Provider registry and bundled providers.

mod memory;
mod null;

pub use memory::MemoryProvider;
pub use null::NullProvider;

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;

use crate::traits::Provider;

// ---------------------------------------------------------------------------
// ProviderStore
// ---------------------------------------------------------------------------

/// Registry of providers by name.
///
/// Providers are initialized in registration order and shut down in reverse
/// order. Gateways that do not name a provider use the default one.
pub struct ProviderStore {
    by_name: DashMap<String, Arc<dyn Provider>>,
    /// Registration order for deterministic init/shutdown sequencing.
    order: RwLock<Vec<String>>,
    default_name: RwLock<String>,
}

impl ProviderStore {
    /// Creates an empty store whose default provider is `default_name`.
    #[must_use]
    pub fn new(default_name: impl Into<String>) -> Self {
        Self {
            by_name: DashMap::new(),
            order: RwLock::new(Vec::new()),
            default_name: RwLock::new(default_name.into()),
        }
    }

    /// Registers a provider under its own name, replacing any provider
    /// already registered under that name.
    pub fn register<P: Provider + 'static>(&self, provider: P) -> Arc<dyn Provider> {
        self.register_arc(Arc::new(provider))
    }

    pub fn register_arc(&self, provider: Arc<dyn Provider>) -> Arc<dyn Provider> {
        let name = provider.name().to_owned();
        if self.by_name.insert(name.clone(), Arc::clone(&provider)).is_none() {
            self.order.write().push(name);
        }
        provider
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.by_name.get(name).map(|entry| Arc::clone(entry.value()))
    }

    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// The default provider, if one is registered under the default name.
    #[must_use]
    pub fn default_provider(&self) -> Option<Arc<dyn Provider>> {
        self.get(&self.default_name.read())
    }

    #[must_use]
    pub fn default_name(&self) -> String {
        self.default_name.read().clone()
    }

    pub fn set_default(&self, name: impl Into<String>) {
        *self.default_name.write() = name.into();
    }

    /// Names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.order.read().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Initializes every provider in registration order.
    ///
    /// # Errors
    ///
    /// Returns the first provider `init()` failure.
    pub async fn init_all(&self) -> anyhow::Result<()> {
        for name in self.names() {
            if let Some(provider) = self.get(&name) {
                tracing::debug!(provider = %name, "initializing provider");
                provider.init().await?;
            }
        }
        Ok(())
    }

    /// Shuts every provider down in reverse registration order.
    ///
    /// # Errors
    ///
    /// Returns the first provider `shutdown()` failure.
    pub async fn shutdown_all(&self) -> anyhow::Result<()> {
        for name in self.names().iter().rev() {
            if let Some(provider) = self.get(name) {
                tracing::debug!(provider = %name, "shutting down provider");
                provider.shutdown().await?;
            }
        }
        Ok(())
    }
}

impl Default for ProviderStore {
    fn default() -> Self {
        Self::new("memory")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
