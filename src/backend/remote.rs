//! Remote store backend
//!
//! Runs `Query`, `GetItem`, `PutItem` and `BatchGetItem` through the AWS SDK.
//! Signing, endpoint resolution and retries of throttled or failed calls are
//! the SDK's. Items cross the boundary through `serde_dynamo`.

use super::rate_limit::RateLimiter;
use super::{extract_key, ItemStore};
use crate::config::{RemoteSettings, StoreConfig, TableConfig};
use crate::decode::{item_from_wire, item_to_wire, value_to_wire, WireItem};
use crate::error::{Error, Result};
use crate::pagination::{Cursor, PageFetcher, RawPage};
use crate::query::{compile, QuerySpec};
use crate::types::{Item, JsonValue};
use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::config::retry::RetryConfig;
use aws_sdk_dynamodb::config::timeout::TimeoutConfig;
use aws_sdk_dynamodb::config::{Credentials, Region};
use aws_sdk_dynamodb::types::{KeysAndAttributes, ReturnConsumedCapacity};
use aws_sdk_dynamodb::Client;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Maximum keys per batch get request
const BATCH_GET_LIMIT: usize = 100;

/// Region used when neither the config nor the environment names one
const FALLBACK_REGION: &str = "us-east-1";

/// Backend talking to the managed store (or a compatible local endpoint)
#[derive(Debug, Clone)]
pub struct RemoteStore {
    client: Client,
    settings: RemoteSettings,
    limiter: Option<RateLimiter>,
}

impl RemoteStore {
    /// Wrap an existing SDK client
    pub fn new(client: Client, settings: RemoteSettings) -> Self {
        let limiter = settings.rate_limit.as_ref().map(RateLimiter::new);
        Self {
            client,
            settings,
            limiter,
        }
    }

    /// Build an SDK client from a store config and wrap it
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let settings = &config.remote;
        let region = RegionProviderChain::first_try(config.region.clone().map(Region::new))
            .or_default_provider()
            .or_else(Region::new(FALLBACK_REGION));

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(region)
            .retry_config(
                RetryConfig::standard()
                    .with_max_attempts(settings.max_retries.saturating_add(1))
                    .with_initial_backoff(settings.initial_backoff())
                    .with_max_backoff(settings.max_backoff()),
            )
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(settings.timeout())
                    .build(),
            );
        if let Some(endpoint) = config.endpoint.as_deref() {
            loader = loader.endpoint_url(endpoint);
        }
        if let Some(credentials) = &config.credentials {
            loader = loader.credentials_provider(Credentials::new(
                &credentials.access_key_id,
                &credentials.secret_access_key,
                credentials.session_token.clone(),
                None,
                "dynaquery",
            ));
        }

        let sdk_config = loader.load().await;
        debug!(
            endpoint = config.endpoint.as_deref().unwrap_or("(resolved)"),
            region = ?sdk_config.region(),
            "Opened remote store"
        );
        Ok(Self::new(Client::new(&sdk_config), settings.clone()))
    }

    async fn pace(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.acquire().await;
        }
    }
}

/// Last-evaluated key as a cursor; an empty key ends the query
fn cursor_from_key(key: Option<WireItem>) -> Result<Option<Cursor>> {
    match key {
        Some(key) if !key.is_empty() => {
            let key = item_from_wire(key)?;
            Ok(Some(Cursor::encode(&JsonValue::Object(key))))
        }
        _ => Ok(None),
    }
}

fn key_from_cursor(cursor: &Cursor) -> Result<WireItem> {
    match cursor.decode()? {
        JsonValue::Object(key) => item_to_wire(&key),
        _ => Err(Error::invalid_cursor("not a key")),
    }
}

#[async_trait]
impl PageFetcher for RemoteStore {
    async fn fetch_page(
        &self,
        table: &TableConfig,
        spec: &QuerySpec,
        cursor: Option<&Cursor>,
        limit: Option<u32>,
    ) -> Result<RawPage> {
        let compiled = compile(spec);
        let values = compiled
            .values
            .iter()
            .map(|(placeholder, value)| Ok((placeholder.clone(), value_to_wire(value)?)))
            .collect::<Result<HashMap<_, _>>>()?;
        let start_key = cursor.map(key_from_cursor).transpose()?;

        self.pace().await;
        let output = self
            .client
            .query()
            .table_name(&table.table_name)
            .set_index_name(spec.index().map(str::to_string))
            .key_condition_expression(compiled.key_condition)
            .set_filter_expression(compiled.filter)
            .set_projection_expression(compiled.projection)
            .set_expression_attribute_names(Some(compiled.names.into_iter().collect()))
            .set_expression_attribute_values(Some(values))
            .set_limit(
                limit
                    .filter(|l| *l > 0)
                    .map(|l| i32::try_from(l).unwrap_or(i32::MAX)),
            )
            .set_exclusive_start_key(start_key)
            .return_consumed_capacity(ReturnConsumedCapacity::Total)
            .send()
            .await?;

        let items = output
            .items
            .unwrap_or_default()
            .into_iter()
            .map(item_from_wire)
            .collect::<Result<Vec<_>>>()?;
        let capacity = output
            .consumed_capacity
            .and_then(|c| c.capacity_units)
            .unwrap_or(0.0);

        Ok(
            RawPage::new(items, cursor_from_key(output.last_evaluated_key)?)
                .with_consumed_capacity(capacity),
        )
    }
}

#[async_trait]
impl ItemStore for RemoteStore {
    async fn get_item(&self, table: &TableConfig, key: &Item) -> Result<Option<Item>> {
        self.pace().await;
        let output = self
            .client
            .get_item()
            .table_name(&table.table_name)
            .set_key(Some(item_to_wire(key)?))
            .send()
            .await?;

        output
            .item
            .filter(|item| !item.is_empty())
            .map(item_from_wire)
            .transpose()
    }

    async fn put_item(&self, table: &TableConfig, item: Item) -> Result<()> {
        extract_key(table, &item)?;
        self.pace().await;
        self.client
            .put_item()
            .table_name(&table.table_name)
            .set_item(Some(item_to_wire(&item)?))
            .send()
            .await?;
        Ok(())
    }

    async fn batch_get_items(&self, table: &TableConfig, keys: &[Item]) -> Result<Vec<Item>> {
        let max_retries = self.settings.max_retries;
        let mut found = Vec::with_capacity(keys.len());

        for chunk in keys.chunks(BATCH_GET_LIMIT) {
            let mut pending = chunk
                .iter()
                .map(item_to_wire)
                .collect::<Result<Vec<_>>>()?;
            let mut attempt = 0;

            while !pending.is_empty() {
                let request = KeysAndAttributes::builder()
                    .set_keys(Some(pending))
                    .build()
                    .map_err(|e| Error::encode(e.to_string()))?;

                self.pace().await;
                let output = self
                    .client
                    .batch_get_item()
                    .request_items(&table.table_name, request)
                    .send()
                    .await?;

                let items = output
                    .responses
                    .and_then(|mut responses| responses.remove(&table.table_name))
                    .unwrap_or_default();
                for item in items {
                    found.push(item_from_wire(item)?);
                }

                pending = output
                    .unprocessed_keys
                    .and_then(|mut unprocessed| unprocessed.remove(&table.table_name))
                    .map(|k| k.keys)
                    .unwrap_or_default();

                if !pending.is_empty() {
                    if attempt >= max_retries {
                        return Err(Error::store(
                            "UnprocessedKeys",
                            format!(
                                "{} key(s) still unprocessed after {} retries",
                                pending.len(),
                                max_retries
                            ),
                        ));
                    }
                    let delay = self.settings.retry_delay(attempt);
                    warn!(
                        table = %table.table_name,
                        pending = pending.len(),
                        attempt = attempt + 1,
                        ?delay,
                        "Re-requesting unprocessed keys"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }

        Ok(found)
    }
}
