//! Store configuration module
//!
//! Table definitions and store connection settings, loaded once from YAML
//! and passed explicitly to the client. Nothing here is process-wide.
//!
//! # Example
//!
//! ```yaml
//! backend: remote
//! endpoint: http://localhost:8000
//! region: eu-west-1
//! remote:
//!   max_retries: 5
//!   rate_limit:
//!     requests_per_second: 50
//! tables:
//!   - table_name: person
//!     partition_key_field: id
//!     sort_key_field: name
//!     max_page_size: 25
//! ```

mod parser;
mod types;

pub use parser::{load_config, load_config_from_str, validate_config};
pub use types::{RemoteSettings, StaticCredentials, StoreConfig, TableConfig, TableRegistry};

#[cfg(test)]
mod tests;
