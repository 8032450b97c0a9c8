//! Configuration types

use crate::backend::RateLimiterConfig;
use crate::error::{Error, Result};
use crate::types::BackendKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// Table Config
// ============================================================================

/// Static description of one logical table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    /// Table name in the store
    pub table_name: String,

    /// Partition key attribute
    #[serde(alias = "primary_key_field")]
    pub partition_key_field: String,

    /// Sort key attribute, if the table has one
    #[serde(default)]
    pub sort_key_field: Option<String>,

    /// Default page cap (0 = let the store decide)
    #[serde(default)]
    pub max_page_size: u32,

    /// Default secondary index for index queries
    #[serde(default)]
    pub global_index: Option<String>,

    /// JSON array file used to seed the local backend
    #[serde(default)]
    pub seed_file: Option<PathBuf>,
}

impl TableConfig {
    /// Create a table with a partition key only
    pub fn new(table_name: impl Into<String>, partition_key_field: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            partition_key_field: partition_key_field.into(),
            sort_key_field: None,
            max_page_size: 0,
            global_index: None,
            seed_file: None,
        }
    }

    /// Set the sort key attribute
    #[must_use]
    pub fn with_sort_key(mut self, field: impl Into<String>) -> Self {
        self.sort_key_field = Some(field.into());
        self
    }

    /// Set the default page cap
    #[must_use]
    pub fn with_max_page_size(mut self, size: u32) -> Self {
        self.max_page_size = size;
        self
    }

    /// Set the default secondary index
    #[must_use]
    pub fn with_global_index(mut self, index: impl Into<String>) -> Self {
        self.global_index = Some(index.into());
        self
    }

    /// Set the seed file for the local backend
    #[must_use]
    pub fn with_seed_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.seed_file = Some(path.into());
        self
    }

    /// Attributes that make up the primary key
    pub fn key_fields(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.partition_key_field.as_str()).chain(self.sort_key_field.as_deref())
    }
}

// ============================================================================
// Table Registry
// ============================================================================

/// Read-only lookup of table configurations by logical name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRegistry {
    tables: BTreeMap<String, TableConfig>,
}

impl TableRegistry {
    /// Build a registry, rejecting empty and duplicate names
    pub fn new(tables: impl IntoIterator<Item = TableConfig>) -> Result<Self> {
        let mut registry = BTreeMap::new();
        for table in tables {
            if table.table_name.is_empty() {
                return Err(Error::config("Table name cannot be empty"));
            }
            if table.partition_key_field.is_empty() {
                return Err(Error::config(format!(
                    "Table '{}' partition_key_field cannot be empty",
                    table.table_name
                )));
            }
            if registry.contains_key(&table.table_name) {
                return Err(Error::config(format!(
                    "Duplicate table name: {}",
                    table.table_name
                )));
            }
            registry.insert(table.table_name.clone(), table);
        }
        Ok(Self { tables: registry })
    }

    /// Look up a table, failing with `UnknownTable`
    pub fn get(&self, table: &str) -> Result<&TableConfig> {
        self.tables
            .get(table)
            .ok_or_else(|| Error::unknown_table(table))
    }

    /// Whether a table is registered
    pub fn contains(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    /// Iterate over all tables in name order
    pub fn iter(&self) -> impl Iterator<Item = &TableConfig> {
        self.tables.values()
    }

    /// Number of registered tables
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Whether no tables are registered
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

// ============================================================================
// Remote Settings
// ============================================================================

/// Retry, timeout and pacing settings for the remote backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteSettings {
    /// Whole-operation timeout in seconds, retries included
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries after the first attempt, for SDK calls and for unprocessed batch keys
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// First retry delay in milliseconds; doubles per retry
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Retry delay ceiling in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Client-side request pacing; omitted means unpaced
    #[serde(default)]
    pub rate_limit: Option<RateLimiterConfig>,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    100
}

fn default_max_backoff_ms() -> u64 {
    20_000
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            rate_limit: None,
        }
    }
}

impl RemoteSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    /// Delay before retry number `attempt` (0-based), capped at `max_backoff`
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt);
        Duration::from_millis(
            self.initial_backoff_ms
                .saturating_mul(factor)
                .min(self.max_backoff_ms),
        )
    }
}

/// Fixed credentials, for local emulators and tests.
///
/// When omitted the SDK's default credential chain applies.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    #[serde(default)]
    pub session_token: Option<String>,
}

impl std::fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Store Config
// ============================================================================

/// Complete store configuration loaded from YAML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Which backend to use
    #[serde(default)]
    pub backend: BackendKind,

    /// Endpoint override (DynamoDB Local, LocalStack); omitted means the
    /// regional endpoint the SDK resolves
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Region; omitted means the SDK's region chain
    #[serde(default)]
    pub region: Option<String>,

    /// Fixed credentials (remote backend)
    #[serde(default)]
    pub credentials: Option<StaticCredentials>,

    /// Retry, timeout and pacing settings (remote backend)
    #[serde(default)]
    pub remote: RemoteSettings,

    /// Table definitions
    #[serde(default)]
    pub tables: Vec<TableConfig>,
}

impl StoreConfig {
    /// Build the table registry from this config
    pub fn registry(&self) -> Result<TableRegistry> {
        TableRegistry::new(self.tables.iter().cloned())
    }
}
