//! Error types for dynaquery
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//!
//! The variants fall into the families callers need to tell apart:
//! fetch failures (the store call failed), `NotFound` (single-item lookups),
//! `Decode` (the store answered but the data does not fit the target type)
//! and configuration errors (unknown tables, invalid config files).

use aws_sdk_dynamodb::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use thiserror::Error;

/// Store error codes that signal throttling and are worth retrying
const THROTTLING_CODES: &[&str] = &[
    "ProvisionedThroughputExceededException",
    "ThrottlingException",
    "RequestLimitExceeded",
    "InternalServerError",
];

/// The main error type for dynaquery
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Table '{table}' is not registered")]
    UnknownTable { table: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Fetch Errors
    // ============================================================================
    #[error("Store request failed: {message}")]
    Transport { message: String },

    #[error("Store rejected request ({code}): {message}")]
    Store { code: String, message: String },

    #[error("Malformed store response: {message}")]
    Protocol { message: String },

    #[error("Invalid continuation cursor: {message}")]
    InvalidCursor { message: String },

    #[error("Query cancelled after {pages_fetched} page(s)")]
    Cancelled { pages_fetched: u32 },

    // ============================================================================
    // Lookup and Decoding Errors
    // ============================================================================
    #[error("No item found in table '{table}' for key {key}")]
    NotFound { table: String, key: String },

    #[error("Failed to decode item: {message}")]
    Decode { message: String },

    #[error("Failed to encode record: {message}")]
    Encode { message: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an unknown table error
    pub fn unknown_table(table: impl Into<String>) -> Self {
        Self::UnknownTable {
            table: table.into(),
        }
    }

    /// Create a transport error (the request never got a store answer)
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a store error from a store error code and message
    pub fn store(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Store {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Create a protocol error
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Create an invalid cursor error
    pub fn invalid_cursor(message: impl Into<String>) -> Self {
        Self::InvalidCursor {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(table: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotFound {
            table: table.into(),
            key: key.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create an encode error
    pub fn encode(message: impl Into<String>) -> Self {
        Self::Encode {
            message: message.into(),
        }
    }

    /// Check if retrying the whole operation may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport { .. } => true,
            Error::Store { code, .. } => THROTTLING_CODES.contains(&code.as_str()),
            _ => false,
        }
    }

    /// Check if this error came from the page-fetch / store call itself
    pub fn is_fetch_error(&self) -> bool {
        matches!(
            self,
            Error::Transport { .. }
                | Error::Store { .. }
                | Error::Protocol { .. }
                | Error::InvalidCursor { .. }
        )
    }

    /// Check if this is a `NotFound` error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Check if this is a decoding error
    pub fn is_decode_error(&self) -> bool {
        matches!(self, Error::Decode { .. })
    }

    /// Check if this is a configuration error
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Error::Config { .. } | Error::UnknownTable { .. } | Error::YamlParse(_)
        )
    }
}

/// SDK failures: service answers keep their error code, the rest are transport errors
impl<E, R> From<SdkError<E, R>> for Error
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    fn from(err: SdkError<E, R>) -> Self {
        match err {
            SdkError::ServiceError(service) => {
                let inner = service.err();
                Error::store(
                    inner.code().unwrap_or("Unknown"),
                    inner.message().unwrap_or_default(),
                )
            }
            other => Error::transport(DisplayErrorContext(&other).to_string()),
        }
    }
}

/// Result type alias for dynaquery
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("test message");
        assert_eq!(err.to_string(), "Configuration error: test message");

        let err = Error::unknown_table("person");
        assert_eq!(err.to_string(), "Table 'person' is not registered");

        let err = Error::transport("dispatch failure");
        assert_eq!(err.to_string(), "Store request failed: dispatch failure");

        let err = Error::not_found("person", "id=1");
        assert_eq!(
            err.to_string(),
            "No item found in table 'person' for key id=1"
        );
    }

    #[test]
    fn test_is_retryable() {
        assert!(Error::transport("connection refused").is_retryable());
        assert!(Error::store("ProvisionedThroughputExceededException", "slow down").is_retryable());
        assert!(Error::store("ThrottlingException", "slow down").is_retryable());

        assert!(!Error::store("ValidationException", "bad key").is_retryable());
        assert!(!Error::config("test").is_retryable());
    }

    #[test]
    fn test_error_families_are_distinct() {
        let fetch = Error::store("ResourceNotFoundException", "no table");
        assert!(fetch.is_fetch_error());
        assert!(!fetch.is_decode_error());

        let decode = Error::decode("missing field `name`");
        assert!(decode.is_decode_error());
        assert!(!decode.is_fetch_error());

        let missing = Error::not_found("person", "id=9");
        assert!(missing.is_not_found());
        assert!(!missing.is_fetch_error());

        assert!(Error::unknown_table("ghost").is_config_error());
        assert!(!Error::Cancelled { pages_fetched: 2 }.is_fetch_error());
    }

    #[test]
    fn test_result_context() {
        let result: Result<()> = Err(Error::config("inner"));
        let with_context = result.context("outer");
        assert!(with_context
            .unwrap_err()
            .to_string()
            .contains("outer: Configuration error: inner"));
    }
}
