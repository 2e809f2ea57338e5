//! Gateway configuration.

use serde::Deserialize;

/// Settings shared by every gateway built from one [`GatewayContext`](crate::GatewayContext).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GatewayConfig {
    /// Provider used by gateways that do not name one.
    pub default_provider: String,
    /// How long queued fetches wait before being flushed as one batch.
    /// `0` flushes on the next scheduler tick.
    pub batch_window_ms: u64,
    /// Capacity of each gateway's background sync error channel.
    pub error_channel_capacity: usize,
    /// Capacity of each gateway's settings event channel.
    pub event_channel_capacity: usize,
    /// Start a background sync when `acquire` creates a document.
    pub sync_on_acquire: bool,
}

impl GatewayConfig {
    /// Parses a JSON config document. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed JSON or unknown fields.
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            default_provider: "memory".to_string(),
            batch_window_ms: 0,
            error_channel_capacity: 64,
            event_channel_capacity: 256,
            sync_on_acquire: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_documents_fill_defaults() {
        let config = GatewayConfig::from_json_str(r#"{"batch_window_ms": 5}"#).unwrap();
        assert_eq!(config.batch_window_ms, 5);
        assert_eq!(config.default_provider, "memory");
        assert!(config.sync_on_acquire);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(GatewayConfig::from_json_str(r#"{"batch_windw_ms": 5}"#).is_err());
    }

    #[test]
    fn empty_document_equals_default() {
        assert_eq!(GatewayConfig::from_json_str("{}").unwrap(), GatewayConfig::default());
    }
}
