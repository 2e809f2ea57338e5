//! Registry of gateways sharing one [`GatewayContext`].

use std::sync::Arc;

use futures_util::future::{join_all, try_join_all};
use indexmap::IndexMap;
use parking_lot::RwLock;
use settingsgate_core::{Schema, SettingsError};
use tracing::Instrument;

use crate::context::GatewayContext;
use crate::gateway::Gateway;

/// Named gateways, in registration order.
pub struct GatewayDriver {
    context: Arc<GatewayContext>,
    gateways: RwLock<IndexMap<String, Arc<Gateway>>>,
}

impl GatewayDriver {
    #[must_use]
    pub fn new(context: Arc<GatewayContext>) -> Self {
        Self {
            context,
            gateways: RwLock::new(IndexMap::new()),
        }
    }

    #[must_use]
    pub fn context(&self) -> &Arc<GatewayContext> {
        &self.context
    }

    /// Registers `gateway` under its name, replacing a gateway of the same
    /// name.
    pub fn register(&self, gateway: Gateway) -> Arc<Gateway> {
        let gateway = Arc::new(gateway);
        self.gateways
            .write()
            .insert(gateway.name().to_owned(), Arc::clone(&gateway));
        gateway
    }

    /// Builds and registers a gateway on the driver's context with the
    /// default provider.
    pub fn add(&self, name: impl Into<String>, schema: Schema) -> Arc<Gateway> {
        self.register(Gateway::new(Arc::clone(&self.context), name, schema))
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<Gateway>> {
        self.gateways.read().get(name).cloned()
    }

    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.gateways.read().keys().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.gateways.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.gateways.read().is_empty()
    }

    fn all(&self) -> Vec<Arc<Gateway>> {
        self.gateways.read().values().cloned().collect()
    }

    /// Initializes the providers, then every gateway concurrently.
    ///
    /// # Errors
    ///
    /// The first provider or gateway failure.
    pub async fn init(&self) -> Result<(), SettingsError> {
        let gateways = self.all();
        let span = tracing::info_span!("driver_init", gateways = gateways.len());
        async {
            self.context.providers().init_all().await?;
            try_join_all(gateways.iter().map(|gateway| gateway.init())).await?;
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Waits for the pending fetches of every gateway.
    pub async fn sync(&self) {
        let gateways = self.all();
        join_all(gateways.iter().map(|gateway| gateway.sync())).await;
    }

    /// Shuts the providers down in reverse registration order.
    ///
    /// # Errors
    ///
    /// The first provider failure.
    pub async fn shutdown(&self) -> Result<(), SettingsError> {
        tracing::info!(gateways = self.len(), "shutting down");
        self.context.providers().shutdown_all().await?;
        Ok(())
    }

    /// Gateway name to gateway JSON.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.gateways
                .read()
                .iter()
                .map(|(name, gateway)| (name.clone(), gateway.to_json()))
                .collect(),
        )
    }
}
