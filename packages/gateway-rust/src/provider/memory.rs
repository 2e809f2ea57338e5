//! In-memory [`Provider`] backed by [`DashMap`].
//!
//! Tables live for the lifetime of the provider. Suitable for tests,
//! development, and ephemeral deployments; [`MemoryProvider::snapshot`] and
//! [`MemoryProvider::restore`] dump and reload the rows as `MsgPack`.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use dashmap::DashMap;
use settingsgate_core::{SchemaEntry, Value};

use crate::traits::Provider;

#[derive(Debug, Default)]
struct Table {
    rows: BTreeMap<String, Value>,
    /// `Some` when the provider emulates a column-based backend. New tables
    /// start with an `id` column.
    columns: Option<BTreeSet<String>>,
}

/// In-memory table store.
///
/// Rows are stored as maps with an `id` field added on create. With
/// [`MemoryProvider::with_columns`] the provider also tracks a column set per
/// table, which makes gateways run their column migration step against it.
pub struct MemoryProvider {
    name: String,
    tables: DashMap<String, Table>,
    track_columns: bool,
}

impl MemoryProvider {
    /// Creates an empty provider named `"memory"`.
    #[must_use]
    pub fn new() -> Self {
        Self::named("memory")
    }

    /// Creates an empty provider with a custom registration name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: DashMap::new(),
            track_columns: false,
        }
    }

    /// Tracks table columns like a SQL backend would.
    #[must_use]
    pub fn with_columns(mut self) -> Self {
        self.track_columns = true;
        self
    }

    /// Serializes every table's rows as `MsgPack`.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn snapshot(&self) -> anyhow::Result<Vec<u8>> {
        let dump: BTreeMap<String, BTreeMap<String, Value>> = self
            .tables
            .iter()
            .map(|table| (table.key().clone(), table.value().rows.clone()))
            .collect();
        rmp_serde::to_vec_named(&dump).context("encoding memory provider snapshot")
    }

    /// Replaces all rows with a dump produced by [`snapshot`](Self::snapshot).
    /// Existing tables not present in the dump are kept empty.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding fails.
    pub fn restore(&self, bytes: &[u8]) -> anyhow::Result<()> {
        let dump: BTreeMap<String, BTreeMap<String, Value>> =
            rmp_serde::from_slice(bytes).context("decoding memory provider snapshot")?;
        for mut table in self.tables.iter_mut() {
            table.rows.clear();
        }
        for (name, rows) in dump {
            self.tables.entry(name).or_insert_with(|| self.empty_table()).rows = rows;
        }
        Ok(())
    }

    fn empty_table(&self) -> Table {
        Table {
            rows: BTreeMap::new(),
            columns: self
                .track_columns
                .then(|| BTreeSet::from(["id".to_owned()])),
        }
    }

    fn table_missing(table: &str) -> anyhow::Error {
        anyhow!("table {table} does not exist")
    }
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for MemoryProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn has_table(&self, table: &str) -> anyhow::Result<bool> {
        Ok(self.tables.contains_key(table))
    }

    async fn create_table(&self, table: &str) -> anyhow::Result<()> {
        if self.tables.contains_key(table) {
            bail!("table {table} already exists");
        }
        self.tables.insert(table.to_owned(), self.empty_table());
        Ok(())
    }

    async fn delete_table(&self, table: &str) -> anyhow::Result<()> {
        self.tables
            .remove(table)
            .map(|_| ())
            .ok_or_else(|| Self::table_missing(table))
    }

    async fn get_columns(&self, table: &str) -> anyhow::Result<Vec<String>> {
        let entry = self
            .tables
            .get(table)
            .ok_or_else(|| Self::table_missing(table))?;
        Ok(entry
            .columns
            .as_ref()
            .map(|columns| columns.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn add_column(&self, table: &str, entry: &SchemaEntry) -> anyhow::Result<()> {
        let mut t = self
            .tables
            .get_mut(table)
            .ok_or_else(|| Self::table_missing(table))?;
        if let Some(columns) = t.columns.as_mut() {
            columns.insert(entry.path().to_owned());
        }
        Ok(())
    }

    async fn remove_column(&self, table: &str, columns: &[String]) -> anyhow::Result<()> {
        let mut t = self
            .tables
            .get_mut(table)
            .ok_or_else(|| Self::table_missing(table))?;
        if let Some(existing) = t.columns.as_mut() {
            for column in columns {
                existing.remove(column);
            }
        }
        Ok(())
    }

    async fn update_column(&self, table: &str, entry: &SchemaEntry) -> anyhow::Result<()> {
        let t = self
            .tables
            .get(table)
            .ok_or_else(|| Self::table_missing(table))?;
        match t.columns.as_ref() {
            Some(columns) if !columns.contains(entry.path()) => {
                bail!("column {} does not exist in table {table}", entry.path())
            }
            _ => Ok(()),
        }
    }

    async fn get(&self, table: &str, id: &str) -> anyhow::Result<Option<Value>> {
        Ok(self
            .tables
            .get(table)
            .and_then(|t| t.rows.get(id).cloned()))
    }

    async fn get_all(
        &self,
        table: &str,
        ids: Option<&[String]>,
    ) -> anyhow::Result<Vec<(String, Value)>> {
        let Some(t) = self.tables.get(table) else {
            return Ok(Vec::new());
        };
        Ok(match ids {
            None => t
                .rows
                .iter()
                .map(|(id, row)| (id.clone(), row.clone()))
                .collect(),
            Some(ids) => ids
                .iter()
                .filter_map(|id| t.rows.get(id).map(|row| (id.clone(), row.clone())))
                .collect(),
        })
    }

    async fn get_keys(&self, table: &str) -> anyhow::Result<Vec<String>> {
        Ok(self
            .tables
            .get(table)
            .map(|t| t.rows.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn has(&self, table: &str, id: &str) -> anyhow::Result<bool> {
        Ok(self
            .tables
            .get(table)
            .is_some_and(|t| t.rows.contains_key(id)))
    }

    async fn create(&self, table: &str, id: &str, data: &Value) -> anyhow::Result<()> {
        let mut t = self
            .tables
            .get_mut(table)
            .ok_or_else(|| Self::table_missing(table))?;
        if t.rows.contains_key(id) {
            bail!("row {id} already exists in table {table}");
        }
        let mut row = Value::Map(BTreeMap::from([("id".to_owned(), Value::from(id))]));
        row.merge(data);
        t.rows.insert(id.to_owned(), row);
        Ok(())
    }

    async fn update(&self, table: &str, id: &str, data: &Value) -> anyhow::Result<()> {
        let mut t = self
            .tables
            .get_mut(table)
            .ok_or_else(|| Self::table_missing(table))?;
        let row = t
            .rows
            .get_mut(id)
            .ok_or_else(|| anyhow!("row {id} does not exist in table {table}"))?;
        row.merge(data);
        Ok(())
    }

    async fn replace(&self, table: &str, id: &str, data: &Value) -> anyhow::Result<()> {
        let mut t = self
            .tables
            .get_mut(table)
            .ok_or_else(|| Self::table_missing(table))?;
        let row = t
            .rows
            .get_mut(id)
            .ok_or_else(|| anyhow!("row {id} does not exist in table {table}"))?;
        let mut replacement = Value::Map(BTreeMap::from([("id".to_owned(), Value::from(id))]));
        replacement.merge(data);
        *row = replacement;
        Ok(())
    }

    async fn delete(&self, table: &str, id: &str) -> anyhow::Result<()> {
        let mut t = self
            .tables
            .get_mut(table)
            .ok_or_else(|| Self::table_missing(table))?;
        t.rows
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| anyhow!("row {id} does not exist in table {table}"))
    }
}
