//! Store backends
//!
//! Supports: in-memory local emulation, the managed store through the AWS SDK
//!
//! # Overview
//!
//! Both backends implement the paged query primitive (`PageFetcher`) and the
//! single-item operations (`ItemStore`). The aggregator is written once against
//! `PageFetcher` and behaves identically on either backend.

mod local;
mod rate_limit;
mod remote;

pub use local::LocalStore;
pub use rate_limit::{RateLimiter, RateLimiterConfig};
pub use remote::RemoteStore;

use crate::config::{StoreConfig, TableConfig};
use crate::error::{Error, Result};
use crate::pagination::PageFetcher;
use crate::types::{BackendKind, Item};
use async_trait::async_trait;
use std::sync::Arc;

/// Single-item operations, outside the paging engine
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Fetch the first item whose attributes match every attribute of `key`
    async fn get_item(&self, table: &TableConfig, key: &Item) -> Result<Option<Item>>;

    /// Store an item, replacing any item with the same primary key
    async fn put_item(&self, table: &TableConfig, item: Item) -> Result<()>;

    /// Fetch several items by primary key; missing keys are skipped
    async fn batch_get_items(&self, table: &TableConfig, keys: &[Item]) -> Result<Vec<Item>>;
}

/// Everything the client needs from a backend
pub trait Backend: PageFetcher + ItemStore {}

impl<T: PageFetcher + ItemStore + ?Sized> Backend for T {}

/// Build the backend a store config asks for
pub async fn open_backend(config: &StoreConfig) -> Result<Arc<dyn Backend>> {
    match config.backend {
        BackendKind::Local => {
            let registry = config.registry()?;
            Ok(Arc::new(LocalStore::from_registry(&registry)?))
        }
        BackendKind::Remote => Ok(Arc::new(RemoteStore::connect(config).await?)),
    }
}

/// Primary key attributes of an item
pub(crate) fn extract_key(table: &TableConfig, item: &Item) -> Result<Item> {
    table
        .key_fields()
        .map(|field| {
            item.get(field)
                .map(|value| (field.to_string(), value.clone()))
                .ok_or_else(|| {
                    Error::encode(format!(
                        "item is missing key attribute '{field}' of table '{}'",
                        table.table_name
                    ))
                })
        })
        .collect()
}
