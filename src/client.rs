//! Store client
//!
//! Caller-facing operations over a table registry and a backend. Single-item
//! operations go straight to the backend's `ItemStore`; every multi-page read
//! goes through the `QueryAggregator`.

use crate::backend::{open_backend, Backend, LocalStore};
use crate::config::{load_config, StoreConfig, TableConfig, TableRegistry};
use crate::decode::{encode_record, materialize, materialize_one};
use crate::engine::{CancellationToken, QueryAggregator, QueryOptions, QueryOutput};
use crate::error::{Error, Result};
use crate::pagination::resolve_page_cap;
use crate::query::{KeyCondition, QuerySpec};
use crate::types::{describe_key, Item, JsonValue};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Client for one store, bound to an explicit table registry
#[derive(Clone)]
pub struct StoreClient {
    registry: Arc<TableRegistry>,
    backend: Arc<dyn Backend>,
}

impl std::fmt::Debug for StoreClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreClient")
            .field("tables", &self.registry.len())
            .finish_non_exhaustive()
    }
}

impl StoreClient {
    /// Create a client over any backend
    pub fn new(registry: TableRegistry, backend: Arc<dyn Backend>) -> Self {
        Self {
            registry: Arc::new(registry),
            backend,
        }
    }

    /// Create a client over an in-memory store
    pub fn local(registry: TableRegistry, store: LocalStore) -> Self {
        Self::new(registry, Arc::new(store))
    }

    /// Create a client from a validated store config
    pub async fn from_config(config: &StoreConfig) -> Result<Self> {
        let registry = config.registry()?;
        let backend = open_backend(config).await?;
        info!(
            backend = ?config.backend,
            tables = registry.len(),
            "Store client ready"
        );
        Ok(Self::new(registry, backend))
    }

    /// Load a YAML config file and create a client from it
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_config(&load_config(path)?).await
    }

    /// Registered tables
    pub fn registry(&self) -> &TableRegistry {
        &self.registry
    }

    fn table(&self, name: &str) -> Result<&TableConfig> {
        self.registry.get(name)
    }

    // ========================================================================
    // Single-item operations
    // ========================================================================

    /// Store a record, replacing any record with the same primary key
    pub async fn save<T: Serialize>(&self, table: &str, record: &T) -> Result<()> {
        let table = self.table(table)?;
        let item = encode_record(record)?;
        debug!(table = %table.table_name, "Saving item");
        self.backend.put_item(table, item).await
    }

    /// Fetch the record with the given partition key
    pub async fn get_one<T: DeserializeOwned>(
        &self,
        table: &str,
        partition_key: impl Into<JsonValue>,
    ) -> Result<T> {
        let table = self.table(table)?;
        let mut key = Item::new();
        key.insert(table.partition_key_field.clone(), partition_key.into());
        self.get_by_key(table, key).await
    }

    /// Fetch the record with the given partition and sort key
    pub async fn get_one_with_sort<T: DeserializeOwned>(
        &self,
        table: &str,
        partition_key: impl Into<JsonValue>,
        sort_key: impl Into<JsonValue>,
    ) -> Result<T> {
        let table = self.table(table)?;
        let key = composite_key(table, partition_key.into(), sort_key.into())?;
        self.get_by_key(table, key).await
    }

    async fn get_by_key<T: DeserializeOwned>(&self, table: &TableConfig, key: Item) -> Result<T> {
        debug!(table = %table.table_name, key = %describe_key(&key), "Getting item");
        match self.backend.get_item(table, &key).await? {
            Some(item) => materialize_one(item),
            None => Err(Error::not_found(&table.table_name, describe_key(&key))),
        }
    }

    /// Fetch several records by partition and sort key; missing keys are skipped
    pub async fn batch_get_with_sort<T: DeserializeOwned>(
        &self,
        table: &str,
        keys: &[(JsonValue, JsonValue)],
    ) -> Result<Vec<T>> {
        let table = self.table(table)?;
        let keys = keys
            .iter()
            .map(|(pk, sk)| composite_key(table, pk.clone(), sk.clone()))
            .collect::<Result<Vec<_>>>()?;

        debug!(table = %table.table_name, keys = keys.len(), "Batch getting items");
        materialize(self.backend.batch_get_items(table, &keys).await?)
    }

    // ========================================================================
    // Partition queries
    // ========================================================================

    /// First record of a partition, reading a single page of at most `limit` items
    pub async fn query_one<T: DeserializeOwned>(
        &self,
        table: &str,
        partition_key: impl Into<JsonValue>,
        limit: u32,
    ) -> Result<T> {
        let config = self.table(table)?;
        let partition_key = partition_key.into();
        let spec = QuerySpec::new(
            table,
            KeyCondition::partition(&config.partition_key_field, partition_key.clone()),
        );

        let page = self
            .backend
            .fetch_page(config, &spec, None, (limit > 0).then_some(limit))
            .await?;

        match page.items.into_iter().next() {
            Some(item) => materialize_one(item),
            None => Err(not_found_in_partition(config, partition_key)),
        }
    }

    /// All records of a partition, up to `limit` (0 = all)
    pub async fn query_multiple<T: DeserializeOwned>(
        &self,
        table: &str,
        partition_key: impl Into<JsonValue>,
        limit: u32,
    ) -> Result<Vec<T>> {
        let config = self.table(table)?;
        let partition_key = partition_key.into();
        let spec = QuerySpec::new(
            table,
            KeyCondition::partition(&config.partition_key_field, partition_key.clone()),
        );

        let output = self
            .query::<T>(&spec, &QueryOptions::new().with_max_items(limit))
            .await?;
        if output.records.is_empty() {
            return Err(not_found_in_partition(config, partition_key));
        }
        Ok(output.records)
    }

    // ========================================================================
    // Aggregated queries
    // ========================================================================

    /// Run a query to completion under the given bounds
    pub async fn query<T: DeserializeOwned>(
        &self,
        spec: &QuerySpec,
        options: &QueryOptions,
    ) -> Result<QueryOutput<T>> {
        let table = self.table(spec.table())?;
        QueryAggregator::new(&*self.backend, table, spec)
            .with_options(options)
            .run()
            .await?
            .materialize()
    }

    /// Run a query that aborts when `token` is cancelled
    pub async fn query_with_cancel<T: DeserializeOwned>(
        &self,
        spec: &QuerySpec,
        options: &QueryOptions,
        token: &CancellationToken,
    ) -> Result<QueryOutput<T>> {
        let table = self.table(spec.table())?;
        QueryAggregator::new(&*self.backend, table, spec)
            .with_options(options)
            .with_cancellation(token)
            .run()
            .await?
            .materialize()
    }

    /// Query where the effective page cap also bounds the item count.
    ///
    /// With `page_number > 0` only that page is returned.
    pub async fn query_expression<T: DeserializeOwned>(
        &self,
        spec: &QuerySpec,
        page_size: u32,
        page_number: u32,
    ) -> Result<Vec<T>> {
        let table = self.table(spec.table())?;
        let options = capped_options(table, page_size, page_number);
        Ok(self.query::<T>(spec, &options).await?.records)
    }

    /// Index query with the same bounds as [`Self::query_expression`].
    ///
    /// An empty `index` falls back to the table's configured global index.
    pub async fn query_gsi<T: DeserializeOwned>(
        &self,
        spec: &QuerySpec,
        index: &str,
        page_size: u32,
        page_desired: u32,
    ) -> Result<Vec<T>> {
        let table = self.table(spec.table())?;
        let index = if index.is_empty() {
            table.global_index.as_deref().ok_or_else(|| {
                Error::config(format!(
                    "Table '{}' has no global_index and none was given",
                    table.table_name
                ))
            })?
        } else {
            index
        };

        let spec = spec.clone().with_index(index);
        let options = capped_options(table, page_size, page_desired);
        Ok(self.query::<T>(&spec, &options).await?.records)
    }
}

fn capped_options(table: &TableConfig, page_size: u32, page_number: u32) -> QueryOptions {
    let cap = resolve_page_cap(table.max_page_size, Some(page_size));
    QueryOptions {
        page_size: Some(page_size),
        max_items: cap,
        max_pages: page_number,
    }
}

fn composite_key(table: &TableConfig, partition_key: JsonValue, sort_key: JsonValue) -> Result<Item> {
    let sort_field = table.sort_key_field.as_ref().ok_or_else(|| {
        Error::config(format!("Table '{}' has no sort_key_field", table.table_name))
    })?;

    let mut key = Item::new();
    key.insert(table.partition_key_field.clone(), partition_key);
    key.insert(sort_field.clone(), sort_key);
    Ok(key)
}

fn not_found_in_partition(table: &TableConfig, partition_key: JsonValue) -> Error {
    let mut key = Item::new();
    key.insert(table.partition_key_field.clone(), partition_key);
    Error::not_found(&table.table_name, describe_key(&key))
}
