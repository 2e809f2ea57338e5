use async_trait::async_trait;
use settingsgate_core::{SchemaEntry, Value};

/// Pluggable persistence backend for settings documents.
///
/// One gateway maps to one table; rows are keyed by entity id and hold the
/// document as a nested map. Reads of missing rows return `None` or omit
/// the row instead of failing. Column hooks only matter for SQL backends:
/// the defaults report no columns and do nothing.
///
/// Implementations: [`MemoryProvider`](crate::provider::MemoryProvider),
/// [`NullProvider`](crate::provider::NullProvider).
#[async_trait]
pub trait Provider: Send + Sync {
    /// Unique name the provider is registered under.
    fn name(&self) -> &str;

    /// One-time setup (connect, run migrations).
    async fn init(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Release resources and close connections.
    async fn shutdown(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn has_table(&self, table: &str) -> anyhow::Result<bool>;

    async fn create_table(&self, table: &str) -> anyhow::Result<()>;

    async fn delete_table(&self, table: &str) -> anyhow::Result<()>;

    /// Column names of a table. NoSQL backends report none.
    async fn get_columns(&self, _table: &str) -> anyhow::Result<Vec<String>> {
        Ok(Vec::new())
    }

    /// Adds the column backing `entry` (named by its path).
    async fn add_column(&self, _table: &str, _entry: &SchemaEntry) -> anyhow::Result<()> {
        Ok(())
    }

    async fn remove_column(&self, _table: &str, _columns: &[String]) -> anyhow::Result<()> {
        Ok(())
    }

    /// Alters the column backing `entry` after a schema edit.
    async fn update_column(&self, _table: &str, _entry: &SchemaEntry) -> anyhow::Result<()> {
        Ok(())
    }

    /// Loads one row.
    async fn get(&self, table: &str, id: &str) -> anyhow::Result<Option<Value>>;

    /// Loads several rows, or the whole table when `ids` is `None`. Missing
    /// ids are omitted.
    async fn get_all(
        &self,
        table: &str,
        ids: Option<&[String]>,
    ) -> anyhow::Result<Vec<(String, Value)>>;

    async fn get_keys(&self, table: &str) -> anyhow::Result<Vec<String>>;

    async fn has(&self, table: &str, id: &str) -> anyhow::Result<bool>;

    /// Inserts a new row.
    async fn create(&self, table: &str, id: &str, data: &Value) -> anyhow::Result<()>;

    /// Deep-merges `data` into an existing row.
    async fn update(&self, table: &str, id: &str, data: &Value) -> anyhow::Result<()>;

    /// Replaces an existing row wholesale.
    async fn replace(&self, table: &str, id: &str, data: &Value) -> anyhow::Result<()>;

    async fn delete(&self, table: &str, id: &str) -> anyhow::Result<()>;

    /// Returns `true` for providers that persist nothing.
    fn is_null(&self) -> bool {
        false
    }
}
