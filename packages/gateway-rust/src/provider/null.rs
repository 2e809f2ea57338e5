//! No-op [`Provider`].

use async_trait::async_trait;
use settingsgate_core::Value;

use crate::traits::Provider;

/// Provider that persists nothing.
///
/// Every table exists, writes succeed without side effects and reads come
/// back empty, so documents behind it always sync to `NotExists`.
pub struct NullProvider;

#[async_trait]
impl Provider for NullProvider {
    fn name(&self) -> &str {
        "null"
    }

    async fn has_table(&self, _table: &str) -> anyhow::Result<bool> {
        Ok(true)
    }

    async fn create_table(&self, _table: &str) -> anyhow::Result<()> {
        Ok(())
    }

    async fn delete_table(&self, _table: &str) -> anyhow::Result<()> {
        Ok(())
    }

    async fn get(&self, _table: &str, _id: &str) -> anyhow::Result<Option<Value>> {
        Ok(None)
    }

    async fn get_all(
        &self,
        _table: &str,
        _ids: Option<&[String]>,
    ) -> anyhow::Result<Vec<(String, Value)>> {
        Ok(Vec::new())
    }

    async fn get_keys(&self, _table: &str) -> anyhow::Result<Vec<String>> {
        Ok(Vec::new())
    }

    async fn has(&self, _table: &str, _id: &str) -> anyhow::Result<bool> {
        Ok(false)
    }

    async fn create(&self, _table: &str, _id: &str, _data: &Value) -> anyhow::Result<()> {
        Ok(())
    }

    async fn update(&self, _table: &str, _id: &str, _data: &Value) -> anyhow::Result<()> {
        Ok(())
    }

    async fn replace(&self, _table: &str, _id: &str, _data: &Value) -> anyhow::Result<()> {
        Ok(())
    }

    async fn delete(&self, _table: &str, _id: &str) -> anyhow::Result<()> {
        Ok(())
    }

    fn is_null(&self) -> bool {
        true
    }
}
