//! Settings gateway: per-entity document cache, request coalescing, pluggable
//! providers and change notifications on top of `settingsgate-core`.

pub mod config;
pub mod context;
pub mod driver;
pub mod gateway;
pub mod observer;
pub mod provider;
pub mod request_handler;
pub mod settings;
pub mod telemetry;
pub mod traits;

#[cfg(test)]
mod test_support;

pub use config::GatewayConfig;
pub use context::{GatewayContext, GatewayContextBuilder};
pub use driver::GatewayDriver;
pub use gateway::{Gateway, SyncFailure, SyncHandle};
pub use observer::{
    CompositeObserver, EventBroadcaster, SettingsEvent, SettingsObserver, UpdateContext,
};
pub use provider::{MemoryProvider, NullProvider, ProviderStore};
pub use request_handler::{BatchFetcher, FetchError, RequestHandler};
pub use settings::{FolderView, Settings};
pub use traits::Provider;
