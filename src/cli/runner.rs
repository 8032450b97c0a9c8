//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat, SortOp};
use crate::client::StoreClient;
use crate::config::{load_config, StoreConfig, TableConfig};
use crate::engine::{QueryOptions, QueryOutput};
use crate::error::{Error, Result, ResultExt};
use crate::query::{KeyCondition, QuerySpec};
use crate::types::{BackendKind, Item, JsonValue};
use serde_json::json;
use std::fs;
use std::path::Path;
use tracing::debug;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Tables => self.tables(),
            Commands::Get { table, pk, sk } => self.get(table, pk, sk.as_deref()).await,
            Commands::Put { table, item, file } => {
                self.put(table, item.as_deref(), file.as_deref()).await
            }
            Commands::Query {
                table,
                pk,
                pk_field,
                sk_field,
                sort_op,
                sort_value,
                index,
                project,
                page_size,
                max_items,
                page,
            } => {
                let key = KeyArgs {
                    pk_field: pk_field.as_deref(),
                    pk,
                    sk_field: sk_field.as_deref(),
                    sort_op: *sort_op,
                    sort_value,
                };
                let spec = self.build_query(table, &key, index.as_deref(), project)?;
                let options = QueryOptions {
                    page_size: *page_size,
                    max_items: *max_items,
                    max_pages: *page,
                };
                self.query(&spec, &options).await
            }
        }
    }

    /// Load the store configuration
    fn load_config(&self) -> Result<StoreConfig> {
        debug!(path = %self.cli.config.display(), "Loading store config");
        load_config(&self.cli.config)
    }

    /// Open a client over the configured backend
    async fn open_client(&self) -> Result<StoreClient> {
        StoreClient::from_config(&self.load_config()?).await
    }

    fn tables(&self) -> Result<()> {
        let config = self.load_config()?;
        let registry = config.registry()?;
        let tables: Vec<&TableConfig> = registry.iter().collect();
        self.output(&json!({
            "backend": config.backend,
            "tables": tables,
        }));
        Ok(())
    }

    async fn get(&self, table: &str, pk: &str, sk: Option<&str>) -> Result<()> {
        let client = self.open_client().await?;
        let item: Item = match sk {
            Some(sk) => {
                client
                    .get_one_with_sort(table, parse_value(pk), parse_value(sk))
                    .await?
            }
            None => client.get_one(table, parse_value(pk)).await?,
        };
        self.output(&JsonValue::Object(item));
        Ok(())
    }

    async fn put(&self, table: &str, item: Option<&str>, file: Option<&Path>) -> Result<()> {
        let config = self.load_config()?;
        // Local tables are rebuilt from seed files by every command
        if config.backend == BackendKind::Local {
            return Err(Error::config(
                "put requires the remote backend; local tables do not outlive the command, \
                 add items to the table's seed_file instead",
            ));
        }

        let raw = match (item, file) {
            (Some(inline), _) => inline.to_string(),
            (None, Some(path)) => fs::read_to_string(path)
                .with_context(|| format!("Failed to read items file '{}'", path.display()))?,
            (None, None) => return Err(Error::config("Provide --item or --file")),
        };
        let items = parse_items(&raw)?;

        let client = StoreClient::from_config(&config).await?;
        for item in &items {
            client.save(table, item).await?;
        }
        self.output(&json!({ "table": table, "saved": items.len() }));
        Ok(())
    }

    /// Build a query from command-line arguments
    fn build_query(
        &self,
        table: &str,
        key: &KeyArgs<'_>,
        index: Option<&str>,
        project: &[String],
    ) -> Result<QuerySpec> {
        let config = self.load_config()?;
        let registry = config.registry()?;
        let table_config = registry.get(table)?;

        let mut spec = QuerySpec::new(table, key_condition(table_config, key)?);
        if let Some(index) = index {
            spec = spec.with_index(index);
        }
        if !project.is_empty() {
            spec = spec.with_projection(project.iter().cloned());
        }
        Ok(spec)
    }

    async fn query(&self, spec: &QuerySpec, options: &QueryOptions) -> Result<()> {
        let client = self.open_client().await?;
        let output: QueryOutput<Item> = client.query(spec, options).await?;
        self.output(&json!({
            "items": output.records,
            "stats": output.stats,
        }));
        Ok(())
    }

    /// Output a value
    fn output(&self, value: &JsonValue) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(value).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
            }
        }
    }
}

/// Parse a command-line value as JSON, falling back to a plain string
pub(crate) fn parse_value(raw: &str) -> JsonValue {
    serde_json::from_str(raw).unwrap_or_else(|_| JsonValue::String(raw.to_string()))
}

/// Parse a JSON object or an array of JSON objects
fn parse_items(raw: &str) -> Result<Vec<Item>> {
    match serde_json::from_str::<JsonValue>(raw).context("Items are not valid JSON")? {
        JsonValue::Object(item) => Ok(vec![item]),
        JsonValue::Array(values) => values
            .into_iter()
            .enumerate()
            .map(|(index, value)| match value {
                JsonValue::Object(item) => Ok(item),
                _ => Err(Error::config(format!("item {index} is not a JSON object"))),
            })
            .collect(),
        _ => Err(Error::config("Items must be a JSON object or an array of objects")),
    }
}

/// Key arguments of the `query` command
struct KeyArgs<'a> {
    pk_field: Option<&'a str>,
    pk: &'a str,
    sk_field: Option<&'a str>,
    sort_op: Option<SortOp>,
    sort_value: &'a [String],
}

/// Key condition over the partition key and optional sort key.
///
/// Attribute names default to the table's own keys.
fn key_condition(table: &TableConfig, args: &KeyArgs<'_>) -> Result<KeyCondition> {
    let pk_field = args.pk_field.unwrap_or(&table.partition_key_field);
    let key = KeyCondition::partition(pk_field, parse_value(args.pk));
    let Some(op) = args.sort_op else {
        return Ok(key);
    };

    let field = args
        .sk_field
        .or(table.sort_key_field.as_deref())
        .ok_or_else(|| {
            Error::config(format!("Table '{}' has no sort_key_field", table.table_name))
        })?;
    let sort_value = args.sort_value;
    let value = |i: usize| {
        sort_value
            .get(i)
            .map(|v| parse_value(v))
            .ok_or_else(|| Error::config(format!("--sort-op {op:?} needs {} value(s)", i + 1)))
    };

    Ok(match op {
        SortOp::Eq => key.sort_eq(field, value(0)?),
        SortOp::Lt => key.sort_lt(field, value(0)?),
        SortOp::Le => key.sort_le(field, value(0)?),
        SortOp::Gt => key.sort_gt(field, value(0)?),
        SortOp::Ge => key.sort_ge(field, value(0)?),
        SortOp::Between => key.sort_between(field, value(0)?, value(1)?),
        SortOp::BeginsWith => {
            let prefix = sort_value
                .first()
                .ok_or_else(|| Error::config("--sort-op begins-with needs a prefix"))?;
            key.sort_begins_with(field, prefix.clone())
        }
    })
}
