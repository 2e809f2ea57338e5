//! Settings observers, the composite fan-out, and the broadcast event stream.
//!
//! Observers are notified after a write succeeded and the in-memory document
//! was patched. They never take part in the write itself.

use std::sync::Arc;

use serde::Serialize;
use settingsgate_core::{Change, Value};
use tokio::sync::broadcast;

use crate::settings::Settings;

/// Details of one persisted update or reset.
#[derive(Debug, Clone, Copy)]
pub struct UpdateContext<'a> {
    pub changes: &'a [Change],
    /// Caller-supplied extra context passed to the update.
    pub extra: Option<&'a Value>,
}

/// Observer of document lifecycle events.
///
/// Used as `Arc<dyn SettingsObserver>`.
pub trait SettingsObserver: Send + Sync {
    /// Called after a sync found a backend row and patched it in.
    fn on_sync(&self, settings: &Settings);

    /// Called after the first write created the backend row.
    fn on_create(&self, settings: &Settings, patch: &Value, ctx: &UpdateContext<'_>);

    /// Called after a write to an existing backend row.
    fn on_update(&self, settings: &Settings, patch: &Value, ctx: &UpdateContext<'_>);

    /// Called after the backend row was deleted.
    fn on_delete(&self, settings: &Settings);
}

/// Composite observer that fans out to multiple observers.
#[derive(Default, Clone)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn SettingsObserver>>,
}

impl CompositeObserver {
    #[must_use]
    pub fn new(observers: Vec<Arc<dyn SettingsObserver>>) -> Self {
        Self { observers }
    }

    pub fn add(&mut self, observer: Arc<dyn SettingsObserver>) {
        self.observers.push(observer);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl SettingsObserver for CompositeObserver {
    fn on_sync(&self, settings: &Settings) {
        for observer in &self.observers {
            observer.on_sync(settings);
        }
    }

    fn on_create(&self, settings: &Settings, patch: &Value, ctx: &UpdateContext<'_>) {
        for observer in &self.observers {
            observer.on_create(settings, patch, ctx);
        }
    }

    fn on_update(&self, settings: &Settings, patch: &Value, ctx: &UpdateContext<'_>) {
        for observer in &self.observers {
            observer.on_update(settings, patch, ctx);
        }
    }

    fn on_delete(&self, settings: &Settings) {
        for observer in &self.observers {
            observer.on_delete(settings);
        }
    }
}

// ---------------------------------------------------------------------------
// Broadcast events
// ---------------------------------------------------------------------------

/// Owned, serializable form of an observer notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SettingsEvent {
    Sync {
        gateway: String,
        id: String,
        data: serde_json::Value,
    },
    Create {
        gateway: String,
        id: String,
        patch: serde_json::Value,
        changes: Vec<serde_json::Value>,
        extra: Option<serde_json::Value>,
    },
    Update {
        gateway: String,
        id: String,
        patch: serde_json::Value,
        changes: Vec<serde_json::Value>,
        extra: Option<serde_json::Value>,
    },
    Delete {
        gateway: String,
        id: String,
    },
}

impl SettingsEvent {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Sync { id, .. }
            | Self::Create { id, .. }
            | Self::Update { id, .. }
            | Self::Delete { id, .. } => id,
        }
    }
}

/// Observer that republishes notifications on a broadcast channel.
///
/// Sends never block; with no subscribers the event is dropped.
pub struct EventBroadcaster {
    tx: broadcast::Sender<SettingsEvent>,
}

impl EventBroadcaster {
    #[must_use]
    pub fn new(tx: broadcast::Sender<SettingsEvent>) -> Self {
        Self { tx }
    }

    fn send(&self, event: SettingsEvent) {
        // Err only means nobody is listening.
        let _ = self.tx.send(event);
    }

    fn write_parts(
        patch: &Value,
        ctx: &UpdateContext<'_>,
    ) -> (serde_json::Value, Vec<serde_json::Value>, Option<serde_json::Value>) {
        (
            patch.to_json(),
            ctx.changes.iter().map(Change::to_json).collect(),
            ctx.extra.map(Value::to_json),
        )
    }
}

impl SettingsObserver for EventBroadcaster {
    fn on_sync(&self, settings: &Settings) {
        self.send(SettingsEvent::Sync {
            gateway: settings.gateway_name().to_owned(),
            id: settings.id().to_owned(),
            data: settings.to_json(),
        });
    }

    fn on_create(&self, settings: &Settings, patch: &Value, ctx: &UpdateContext<'_>) {
        let (patch, changes, extra) = Self::write_parts(patch, ctx);
        self.send(SettingsEvent::Create {
            gateway: settings.gateway_name().to_owned(),
            id: settings.id().to_owned(),
            patch,
            changes,
            extra,
        });
    }

    fn on_update(&self, settings: &Settings, patch: &Value, ctx: &UpdateContext<'_>) {
        let (patch, changes, extra) = Self::write_parts(patch, ctx);
        self.send(SettingsEvent::Update {
            gateway: settings.gateway_name().to_owned(),
            id: settings.id().to_owned(),
            patch,
            changes,
            extra,
        });
    }

    fn on_delete(&self, settings: &Settings) {
        self.send(SettingsEvent::Delete {
            gateway: settings.gateway_name().to_owned(),
            id: settings.id().to_owned(),
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
