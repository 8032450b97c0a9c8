//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Paged queries and item lookups against a key/value store
#[derive(Parser, Debug)]
#[command(name = "dynaquery")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Store configuration file (YAML)
    #[arg(short, long, global = true, default_value = "store.yaml")]
    pub config: PathBuf,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
///
/// Key values are parsed as JSON when possible (`42`, `true`), otherwise taken
/// as strings. Quote a JSON string (`'"42"'`) to force a string.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List registered tables
    Tables,

    /// Fetch one item by primary key
    Get {
        /// Table name
        table: String,

        /// Partition key value
        #[arg(long)]
        pk: String,

        /// Sort key value
        #[arg(long)]
        sk: Option<String>,
    },

    /// Store items, replacing any with the same primary key
    Put {
        /// Table name
        table: String,

        /// Inline item JSON
        #[arg(long, conflicts_with = "file")]
        item: Option<String>,

        /// File holding a JSON object or an array of objects
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Query a partition with optional bounds
    Query {
        /// Table name
        table: String,

        /// Partition key value
        #[arg(long)]
        pk: String,

        /// Partition attribute, when it differs from the table's (index queries)
        #[arg(long)]
        pk_field: Option<String>,

        /// Sort attribute, when it differs from the table's (index queries)
        #[arg(long)]
        sk_field: Option<String>,

        /// Sort key operator
        #[arg(long, requires = "sort_value")]
        sort_op: Option<SortOp>,

        /// Sort key operand (twice for `between`)
        #[arg(long, num_args = 1..=2)]
        sort_value: Vec<String>,

        /// Secondary index to query
        #[arg(long)]
        index: Option<String>,

        /// Attributes to return (comma-separated)
        #[arg(long, value_delimiter = ',')]
        project: Vec<String>,

        /// Page cap override (0 = table default)
        #[arg(long)]
        page_size: Option<u32>,

        /// Maximum items to return (0 = unbounded)
        #[arg(long, default_value = "0")]
        max_items: u32,

        /// Return only this page (1-based, 0 = all pages)
        #[arg(long, default_value = "0")]
        page: u32,
    },
}

/// Sort key operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SortOp {
    /// Equal
    Eq,
    /// Less than
    Lt,
    /// Less than or equal
    Le,
    /// Greater than
    Gt,
    /// Greater than or equal
    Ge,
    /// Inclusive range
    Between,
    /// String prefix
    BeginsWith,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Compact JSON
    Json,
    /// Indented JSON
    Pretty,
}
