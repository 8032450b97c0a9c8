//! Tests for config module

use super::*;
use crate::backend::RateLimiterConfig;
use crate::types::BackendKind;
use pretty_assertions::assert_eq;
use std::io::Write;
use std::time::Duration;

const REMOTE_YAML: &str = r#"
backend: remote
endpoint: http://localhost:8000
region: eu-west-1
credentials:
  access_key_id: local
  secret_access_key: local-secret
remote:
  timeout_secs: 5
  max_retries: 2
  rate_limit:
    requests_per_second: 50
tables:
  - table_name: person
    primary_key_field: id
    sort_key_field: name
    max_page_size: 25
  - table_name: orders
    partition_key_field: customer
    global_index: by_status
"#;

// ============================================================================
// Parsing Tests
// ============================================================================

#[test]
fn test_load_remote_config() {
    let config = load_config_from_str(REMOTE_YAML).unwrap();

    assert_eq!(config.backend, BackendKind::Remote);
    assert_eq!(config.endpoint.as_deref(), Some("http://localhost:8000"));
    assert_eq!(config.region.as_deref(), Some("eu-west-1"));

    let credentials = config.credentials.clone().unwrap();
    assert_eq!(credentials.access_key_id, "local");
    assert_eq!(credentials.session_token, None);
    assert!(!format!("{credentials:?}").contains("local-secret"));

    assert_eq!(config.remote.timeout(), Duration::from_secs(5));
    assert_eq!(config.remote.max_retries, 2);
    assert_eq!(config.remote.initial_backoff_ms, 100);
    assert_eq!(config.remote.rate_limit, Some(RateLimiterConfig::new(50, 10)));
    assert_eq!(config.tables.len(), 2);

    let person = &config.tables[0];
    assert_eq!(person.partition_key_field, "id");
    assert_eq!(person.sort_key_field.as_deref(), Some("name"));
    assert_eq!(person.max_page_size, 25);

    let orders = &config.tables[1];
    assert_eq!(orders.max_page_size, 0);
    assert_eq!(orders.global_index.as_deref(), Some("by_status"));
}

#[test]
fn test_local_config_defaults() {
    let config = load_config_from_str(
        "tables:\n  - table_name: person\n    partition_key_field: id\n",
    )
    .unwrap();

    assert_eq!(config.backend, BackendKind::Local);
    assert!(config.endpoint.is_none());
    assert!(config.credentials.is_none());
    assert_eq!(config.remote, RemoteSettings::default());
}

#[test]
fn test_retry_delay_doubles_up_to_ceiling() {
    let settings = RemoteSettings {
        initial_backoff_ms: 100,
        max_backoff_ms: 350,
        ..RemoteSettings::default()
    };

    assert_eq!(settings.retry_delay(0), Duration::from_millis(100));
    assert_eq!(settings.retry_delay(1), Duration::from_millis(200));
    assert_eq!(settings.retry_delay(2), Duration::from_millis(350));
    assert_eq!(settings.retry_delay(40), Duration::from_millis(350));
}

// ============================================================================
// Validation Tests
// ============================================================================

#[test]
fn test_remote_without_endpoint_uses_sdk_resolution() {
    let config = load_config_from_str(
        "backend: remote\nregion: eu-west-1\ntables:\n  - table_name: person\n    partition_key_field: id\n",
    )
    .unwrap();
    assert!(config.endpoint.is_none());

    let err = load_config_from_str(
        "backend: remote\nregion: ''\ntables:\n  - table_name: person\n    partition_key_field: id\n",
    )
    .unwrap_err();
    assert!(err.to_string().contains("Region cannot be empty"));
}

#[test]
fn test_rejects_bad_endpoint() {
    let err = load_config_from_str(
        "backend: remote\nendpoint: not a url\ntables:\n  - table_name: person\n    partition_key_field: id\n",
    )
    .unwrap_err();
    assert!(matches!(err, crate::error::Error::InvalidUrl(_)));

    let err = load_config_from_str(
        "backend: remote\nendpoint: ftp://store\ntables:\n  - table_name: person\n    partition_key_field: id\n",
    )
    .unwrap_err();
    assert!(err.to_string().contains("http or https"));
}

#[test]
fn test_rejects_duplicate_and_empty_tables() {
    let err = load_config_from_str(
        "tables:\n  - table_name: person\n    partition_key_field: id\n  - table_name: person\n    partition_key_field: id\n",
    )
    .unwrap_err();
    assert!(err.to_string().contains("Duplicate table name"));

    let err = load_config_from_str("tables: []\n").unwrap_err();
    assert!(err.is_config_error());

    let err = load_config_from_str(
        "tables:\n  - table_name: person\n    partition_key_field: \"\"\n",
    )
    .unwrap_err();
    assert!(err.to_string().contains("partition_key_field"));
}

#[test]
fn test_rejects_malformed_yaml() {
    let err = load_config_from_str("tables: [").unwrap_err();
    assert!(err.is_config_error());
}

// ============================================================================
// File Loading Tests
// ============================================================================

#[test]
fn test_load_config_resolves_seed_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.yaml");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(
        file,
        "tables:\n  - table_name: person\n    partition_key_field: id\n    seed_file: people.json"
    )
    .unwrap();

    let config = load_config(&path).unwrap();
    assert_eq!(
        config.tables[0].seed_file.as_deref(),
        Some(dir.path().join("people.json").as_path())
    );
}

#[test]
fn test_load_config_missing_file() {
    let err = load_config("/definitely/not/here.yaml").unwrap_err();
    assert!(matches!(err, crate::error::Error::FileNotFound { .. }));
}

// ============================================================================
// Registry Tests
// ============================================================================

#[test]
fn test_registry_lookup() {
    let registry = TableRegistry::new([
        TableConfig::new("person", "id").with_sort_key("name"),
        TableConfig::new("orders", "customer").with_max_page_size(10),
    ])
    .unwrap();

    assert_eq!(registry.len(), 2);
    assert!(registry.contains("person"));
    assert_eq!(registry.get("orders").unwrap().max_page_size, 10);
    assert_eq!(
        registry.iter().map(|t| t.table_name.as_str()).collect::<Vec<_>>(),
        vec!["orders", "person"]
    );

    let err = registry.get("ghost").unwrap_err();
    assert!(err.is_config_error());
    assert_eq!(err.to_string(), "Table 'ghost' is not registered");
}

#[test]
fn test_table_key_fields() {
    let table = TableConfig::new("person", "id").with_sort_key("name");
    assert_eq!(table.key_fields().collect::<Vec<_>>(), vec!["id", "name"]);

    let table = TableConfig::new("person", "id");
    assert_eq!(table.key_fields().collect::<Vec<_>>(), vec!["id"]);
}
