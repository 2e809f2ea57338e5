//! Collaborators shared by every gateway of an application.

use std::sync::Arc;

use settingsgate_core::{DefaultLanguage, Language, SerializerStore};

use crate::config::GatewayConfig;
use crate::observer::{CompositeObserver, SettingsObserver};
use crate::provider::{MemoryProvider, ProviderStore};
use crate::traits::Provider;

/// Providers, serializers, language and observers handed to gateways.
///
/// Shared as `Arc<GatewayContext>`. Providers may still be registered after
/// construction; serializers and observers are fixed once built.
pub struct GatewayContext {
    providers: ProviderStore,
    serializers: SerializerStore,
    language: Arc<dyn Language>,
    observers: CompositeObserver,
    config: Arc<GatewayConfig>,
}

impl GatewayContext {
    #[must_use]
    pub fn builder() -> GatewayContextBuilder {
        GatewayContextBuilder::default()
    }

    /// Default context with a [`MemoryProvider`] registered.
    #[must_use]
    pub fn in_memory() -> Arc<Self> {
        Self::builder().provider(MemoryProvider::new()).build()
    }

    #[must_use]
    pub fn providers(&self) -> &ProviderStore {
        &self.providers
    }

    #[must_use]
    pub fn serializers(&self) -> &SerializerStore {
        &self.serializers
    }

    #[must_use]
    pub fn language(&self) -> &dyn Language {
        self.language.as_ref()
    }

    #[must_use]
    pub fn observers(&self) -> &CompositeObserver {
        &self.observers
    }

    #[must_use]
    pub fn config(&self) -> &Arc<GatewayConfig> {
        &self.config
    }
}

/// Builder for [`GatewayContext`].
pub struct GatewayContextBuilder {
    config: GatewayConfig,
    serializers: SerializerStore,
    language: Arc<dyn Language>,
    providers: Vec<Arc<dyn Provider>>,
    observers: CompositeObserver,
}

impl Default for GatewayContextBuilder {
    fn default() -> Self {
        Self {
            config: GatewayConfig::default(),
            serializers: SerializerStore::with_builtins(),
            language: Arc::new(DefaultLanguage::new()),
            providers: Vec::new(),
            observers: CompositeObserver::default(),
        }
    }
}

impl GatewayContextBuilder {
    #[must_use]
    pub fn config(mut self, config: GatewayConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the serializer store (built-ins are registered by default).
    #[must_use]
    pub fn serializers(mut self, serializers: SerializerStore) -> Self {
        self.serializers = serializers;
        self
    }

    #[must_use]
    pub fn language(mut self, language: Arc<dyn Language>) -> Self {
        self.language = language;
        self
    }

    #[must_use]
    pub fn provider<P: Provider + 'static>(self, provider: P) -> Self {
        self.provider_arc(Arc::new(provider))
    }

    #[must_use]
    pub fn provider_arc(mut self, provider: Arc<dyn Provider>) -> Self {
        self.providers.push(provider);
        self
    }

    #[must_use]
    pub fn observer(mut self, observer: Arc<dyn SettingsObserver>) -> Self {
        self.observers.add(observer);
        self
    }

    #[must_use]
    pub fn build(self) -> Arc<GatewayContext> {
        let providers = ProviderStore::new(self.config.default_provider.clone());
        for provider in self.providers {
            providers.register_arc(provider);
        }
        Arc::new(GatewayContext {
            providers,
            serializers: self.serializers,
            language: self.language,
            observers: self.observers,
            config: Arc::new(self.config),
        })
    }
}
