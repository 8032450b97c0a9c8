//! In-memory store emulation
//!
//! Rows are kept per table in insertion order. A page is computed as:
//! key condition, stable order by the table's sort key (base table only),
//! the next `limit` rows from the cursor offset, then filter and projection.

use super::{extract_key, ItemStore};
use crate::config::{TableConfig, TableRegistry};
use crate::error::{Error, Result};
use crate::pagination::{Cursor, PageFetcher, RawPage};
use crate::query::{compare_values, matches_condition, matches_key, project, values_equal, QuerySpec};
use crate::types::Item;
use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tokio::sync::RwLock;
use tracing::{debug, trace};

/// In-memory backend used for tests and offline work
#[derive(Debug, Default)]
pub struct LocalStore {
    tables: RwLock<HashMap<String, Vec<Item>>>,
}

impl LocalStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a table with items, replacing its current contents
    #[must_use]
    pub fn with_table_items(mut self, table: impl Into<String>, items: Vec<Item>) -> Self {
        self.tables.get_mut().insert(table.into(), items);
        self
    }

    /// Seed a table from a file holding a JSON array of objects
    pub fn with_preloaded_items(self, table: impl Into<String>, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                Error::Io(e)
            }
        })?;

        let items: Vec<Item> = serde_json::from_str(&content).map_err(|e| {
            Error::config(format!(
                "Seed file '{}' must hold a JSON array of objects: {e}",
                path.display()
            ))
        })?;

        let table = table.into();
        debug!(table = %table, items = items.len(), path = %path.display(), "Preloaded local table");
        Ok(self.with_table_items(table, items))
    }

    /// Create a store with every registered table, seeded where a seed file is set
    pub fn from_registry(registry: &TableRegistry) -> Result<Self> {
        registry.iter().try_fold(Self::new(), |store, table| match &table.seed_file {
            Some(path) => store.with_preloaded_items(&table.table_name, path),
            None => Ok(store.with_table_items(&table.table_name, Vec::new())),
        })
    }

    /// Number of items stored in a table
    pub async fn len(&self, table: &str) -> usize {
        self.tables.read().await.get(table).map_or(0, Vec::len)
    }

    /// Whether a table holds no items
    pub async fn is_empty(&self, table: &str) -> bool {
        self.len(table).await == 0
    }
}

fn matches_all(key: &Item, item: &Item) -> bool {
    key.iter()
        .all(|(field, expected)| item.get(field).is_some_and(|v| values_equal(v, expected)))
}

fn order_by(field: &str, a: &Item, b: &Item) -> Ordering {
    match (a.get(field), b.get(field)) {
        (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[async_trait]
impl PageFetcher for LocalStore {
    async fn fetch_page(
        &self,
        table: &TableConfig,
        spec: &QuerySpec,
        cursor: Option<&Cursor>,
        limit: Option<u32>,
    ) -> Result<RawPage> {
        let offset = cursor.map(Cursor::offset).transpose()?.unwrap_or(0);

        let tables = self.tables.read().await;
        let rows = tables.get(&table.table_name).map_or(&[][..], Vec::as_slice);

        let mut matched: Vec<&Item> = rows
            .iter()
            .filter(|item| matches_key(spec.key_condition(), item))
            .collect();
        if spec.index().is_none() {
            if let Some(sort_field) = table.sort_key_field.as_deref() {
                matched.sort_by(|a, b| order_by(sort_field, a, b));
            }
        }

        let start = offset.min(matched.len());
        let end = match limit {
            Some(limit) if limit > 0 => start.saturating_add(limit as usize).min(matched.len()),
            _ => matched.len(),
        };

        let items: Vec<Item> = matched[start..end]
            .iter()
            .filter(|item| spec.filter().map_or(true, |f| matches_condition(f, item)))
            .map(|item| match spec.projection() {
                Some(fields) => project(item, fields),
                None => (*item).clone(),
            })
            .collect();

        let next_cursor = (end < matched.len()).then(|| Cursor::from_offset(end));
        trace!(
            table = %table.table_name,
            offset = start,
            evaluated = end - start,
            returned = items.len(),
            "Local page"
        );

        Ok(RawPage::new(items, next_cursor))
    }
}

#[async_trait]
impl ItemStore for LocalStore {
    async fn get_item(&self, table: &TableConfig, key: &Item) -> Result<Option<Item>> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(&table.table_name)
            .and_then(|rows| rows.iter().find(|item| matches_all(key, item)))
            .cloned())
    }

    async fn put_item(&self, table: &TableConfig, item: Item) -> Result<()> {
        let key = extract_key(table, &item)?;
        let mut tables = self.tables.write().await;
        let rows = tables.entry(table.table_name.clone()).or_default();

        match rows.iter_mut().find(|existing| matches_all(&key, existing)) {
            Some(existing) => *existing = item,
            None => rows.push(item),
        }
        Ok(())
    }

    async fn batch_get_items(&self, table: &TableConfig, keys: &[Item]) -> Result<Vec<Item>> {
        let tables = self.tables.read().await;
        let Some(rows) = tables.get(&table.table_name) else {
            return Ok(Vec::new());
        };

        Ok(keys
            .iter()
            .filter_map(|key| rows.iter().find(|item| matches_all(key, item)))
            .cloned()
            .collect())
    }
}
