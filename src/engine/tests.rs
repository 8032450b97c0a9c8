//! Tests for engine module

use super::*;
use crate::backend::LocalStore;
use crate::pagination::Cursor;
use crate::query::{Condition, KeyCondition};
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde::Deserialize;
use serde_json::json;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

fn item(value: serde_json::Value) -> Item {
    value.as_object().cloned().unwrap()
}

fn table() -> TableConfig {
    TableConfig::new("person", "team")
        .with_sort_key("rank")
        .with_max_page_size(2)
}

fn store() -> LocalStore {
    LocalStore::new().with_table_items(
        "person",
        vec![
            item(json!({"team": "a", "rank": 3, "name": "Carla", "age": 41})),
            item(json!({"team": "a", "rank": 1, "name": "Ana", "age": 25})),
            item(json!({"team": "b", "rank": 1, "name": "Bob", "age": 33})),
            item(json!({"team": "a", "rank": 2, "name": "Ben", "age": 37})),
            item(json!({"team": "a", "rank": 5, "name": "Eve", "age": 29})),
            item(json!({"team": "a", "rank": 4, "name": "Dan", "age": 52})),
        ],
    )
}

fn team(value: &str) -> QuerySpec {
    QuerySpec::new("person", KeyCondition::partition("team", value))
}

fn names(items: &[Item]) -> Vec<&str> {
    items.iter().map(|i| i["name"].as_str().unwrap()).collect()
}

/// Records every request before delegating
struct Recording<F> {
    inner: F,
    requests: Mutex<Vec<(Option<Cursor>, Option<u32>)>>,
}

impl<F> Recording<F> {
    fn new(inner: F) -> Self {
        Self {
            inner,
            requests: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<(Option<Cursor>, Option<u32>)> {
        self.requests.lock().unwrap().clone()
    }

    fn limits(&self) -> Vec<Option<u32>> {
        self.requests().into_iter().map(|(_, limit)| limit).collect()
    }
}

#[async_trait]
impl<F: PageFetcher> PageFetcher for Recording<F> {
    async fn fetch_page(
        &self,
        table: &TableConfig,
        spec: &QuerySpec,
        cursor: Option<&Cursor>,
        limit: Option<u32>,
    ) -> Result<RawPage> {
        self.requests.lock().unwrap().push((cursor.cloned(), limit));
        self.inner.fetch_page(table, spec, cursor, limit).await
    }
}

/// Serves pages from the local store, failing on the given call
struct FailingOn {
    inner: LocalStore,
    fail_on: u32,
    calls: AtomicU32,
}

#[async_trait]
impl PageFetcher for FailingOn {
    async fn fetch_page(
        &self,
        table: &TableConfig,
        spec: &QuerySpec,
        cursor: Option<&Cursor>,
        limit: Option<u32>,
    ) -> Result<RawPage> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.fail_on {
            return Err(Error::store("ProvisionedThroughputExceededException", "slow down"));
        }
        self.inner.fetch_page(table, spec, cursor, limit).await
    }
}

/// Serves the first page, then never answers
struct StallsAfterFirst {
    inner: LocalStore,
    calls: AtomicU32,
}

#[async_trait]
impl PageFetcher for StallsAfterFirst {
    async fn fetch_page(
        &self,
        table: &TableConfig,
        spec: &QuerySpec,
        cursor: Option<&Cursor>,
        limit: Option<u32>,
    ) -> Result<RawPage> {
        if self.calls.fetch_add(1, Ordering::SeqCst) > 0 {
            std::future::pending::<()>().await;
        }
        self.inner.fetch_page(table, spec, cursor, limit).await
    }
}

/// Ignores the requested limit and always returns three items
struct OversizedPages;

#[async_trait]
impl PageFetcher for OversizedPages {
    async fn fetch_page(
        &self,
        _table: &TableConfig,
        _spec: &QuerySpec,
        cursor: Option<&Cursor>,
        _limit: Option<u32>,
    ) -> Result<RawPage> {
        let offset = cursor.map(Cursor::offset).transpose()?.unwrap_or(0);
        let items = (offset..offset + 3)
            .map(|n| item(json!({"team": "a", "rank": n, "name": format!("p{n}")})))
            .collect();
        Ok(RawPage::new(items, Some(Cursor::from_offset(offset + 3))).with_consumed_capacity(0.5))
    }
}

// ============================================================================
// Unbounded
// ============================================================================

#[tokio::test]
async fn test_unbounded_fetches_every_page() {
    let fetcher = Recording::new(store());
    let table = table();
    let spec = team("a");

    let result = QueryAggregator::new(&fetcher, &table, &spec).run().await.unwrap();

    assert_eq!(names(&result.items), vec!["Ana", "Ben", "Carla", "Dan", "Eve"]);
    assert_eq!(result.stats.pages, 3);
    assert_eq!(result.stats.items_fetched, 5);
    assert_eq!(result.stats.items_returned, 5);
    assert_eq!(result.stats.termination, Termination::Exhausted);
    assert_eq!(fetcher.limits(), vec![Some(2), Some(2), Some(2)]);
}

#[tokio::test]
async fn test_cursor_handed_to_next_request() {
    let fetcher = Recording::new(store());
    let table = table();
    let spec = team("a");

    QueryAggregator::new(&fetcher, &table, &spec).run().await.unwrap();

    let cursors: Vec<_> = fetcher.requests().into_iter().map(|(c, _)| c).collect();
    assert_eq!(
        cursors,
        vec![None, Some(Cursor::from_offset(2)), Some(Cursor::from_offset(4))]
    );
}

#[tokio::test]
async fn test_unbounded_run_is_repeatable() {
    let store = store();
    let table = table();
    let spec = team("a");

    let first = QueryAggregator::new(&store, &table, &spec).run().await.unwrap();
    let second = QueryAggregator::new(&store, &table, &spec).run().await.unwrap();

    assert_eq!(first.items, second.items);
    assert_eq!(first.stats.pages, second.stats.pages);
}

#[tokio::test]
async fn test_first_page_exhausted() {
    let fetcher = Recording::new(store());
    let table = table();
    let spec = team("b");

    let result = QueryAggregator::new(&fetcher, &table, &spec).run().await.unwrap();

    assert_eq!(names(&result.items), vec!["Bob"]);
    assert_eq!(result.stats.pages, 1);
    assert_eq!(result.stats.termination, Termination::Exhausted);
}

#[tokio::test]
async fn test_no_matches_returns_empty() {
    let store = store();
    let table = table();
    let spec = team("z");

    let result = QueryAggregator::new(&store, &table, &spec).run().await.unwrap();

    assert!(result.items.is_empty());
    assert_eq!(result.stats.pages, 1);
}

#[tokio::test]
async fn test_no_page_cap_sends_no_limit() {
    let fetcher = Recording::new(store());
    let table = TableConfig::new("person", "team").with_sort_key("rank");
    let spec = team("a");

    let result = QueryAggregator::new(&fetcher, &table, &spec).run().await.unwrap();

    assert_eq!(result.items.len(), 5);
    assert_eq!(fetcher.limits(), vec![None]);
}

#[tokio::test]
async fn test_page_size_override_replaces_table_cap() {
    let fetcher = Recording::new(store());
    let table = table();
    let spec = team("a");
    let options = QueryOptions::new().with_page_size(5);

    let result = QueryAggregator::new(&fetcher, &table, &spec)
        .with_options(&options)
        .run()
        .await
        .unwrap();

    assert_eq!(result.stats.pages, 1);
    assert_eq!(fetcher.limits(), vec![Some(5)]);
}

// ============================================================================
// Item Bound
// ============================================================================

#[tokio::test]
async fn test_item_bound_shrinks_last_request() {
    let fetcher = Recording::new(store());
    let table = table();
    let spec = team("a");
    let options = QueryOptions::new().with_max_items(3);

    let result = QueryAggregator::new(&fetcher, &table, &spec)
        .with_options(&options)
        .run()
        .await
        .unwrap();

    assert_eq!(names(&result.items), vec!["Ana", "Ben", "Carla"]);
    assert_eq!(result.stats.pages, 2);
    assert_eq!(result.stats.termination, Termination::ItemBound);
    assert_eq!(fetcher.limits(), vec![Some(2), Some(1)]);
}

#[tokio::test]
async fn test_item_bound_smaller_than_cap_clamps_first_request() {
    let fetcher = Recording::new(store());
    let table = table();
    let spec = team("a");
    let options = QueryOptions::new().with_max_items(1);

    let result = QueryAggregator::new(&fetcher, &table, &spec)
        .with_options(&options)
        .run()
        .await
        .unwrap();

    assert_eq!(names(&result.items), vec!["Ana"]);
    assert_eq!(fetcher.limits(), vec![Some(1)]);
}

#[tokio::test]
async fn test_item_bound_counts_filtered_items() {
    let fetcher = Recording::new(store());
    let table = table();
    let spec = team("a").with_filter(Condition::gt("age", 30));
    let options = QueryOptions::new().with_max_items(2);

    let result = QueryAggregator::new(&fetcher, &table, &spec)
        .with_options(&options)
        .run()
        .await
        .unwrap();

    assert_eq!(names(&result.items), vec!["Ben", "Carla"]);
    assert_eq!(result.stats.pages, 2);
    assert_eq!(fetcher.limits(), vec![Some(2), Some(1)]);
}

#[tokio::test]
async fn test_item_bound_beyond_results_exhausts() {
    let store = store();
    let table = table();
    let spec = team("a");
    let options = QueryOptions::new().with_max_items(50);

    let result = QueryAggregator::new(&store, &table, &spec)
        .with_options(&options)
        .run()
        .await
        .unwrap();

    assert_eq!(result.items.len(), 5);
    assert_eq!(result.stats.termination, Termination::Exhausted);
}

#[tokio::test]
async fn test_item_bound_truncates_oversized_pages() {
    let table = table();
    let spec = team("a");
    let options = QueryOptions::new().with_max_items(4);

    let result = QueryAggregator::new(&OversizedPages, &table, &spec)
        .with_options(&options)
        .run()
        .await
        .unwrap();

    assert_eq!(names(&result.items), vec!["p0", "p1", "p2", "p3"]);
    assert_eq!(result.stats.pages, 2);
    assert_eq!(result.stats.items_fetched, 6);
    assert_eq!(result.stats.items_returned, 4);
    assert_eq!(result.stats.consumed_capacity, 1.0);
}

// ============================================================================
// Page Bound
// ============================================================================

#[tokio::test]
async fn test_page_bound_one_returns_first_page() {
    let store = store();
    let table = table();
    let spec = team("a");
    let options = QueryOptions::new().with_max_pages(1);

    let result = QueryAggregator::new(&store, &table, &spec)
        .with_options(&options)
        .run()
        .await
        .unwrap();

    assert_eq!(names(&result.items), vec!["Ana", "Ben"]);
    assert_eq!(result.stats.termination, Termination::PageBound);
}

#[tokio::test]
async fn test_page_bound_returns_only_last_page() {
    let store = store();
    let table = table();
    let spec = team("a");
    let options = QueryOptions::new().with_max_pages(2);

    let result = QueryAggregator::new(&store, &table, &spec)
        .with_options(&options)
        .run()
        .await
        .unwrap();

    assert_eq!(names(&result.items), vec!["Carla", "Dan"]);
    assert_eq!(result.stats.pages, 2);
    assert_eq!(result.stats.items_fetched, 4);
    assert_eq!(result.stats.items_returned, 2);
}

#[tokio::test]
async fn test_page_bound_past_end_returns_final_page() {
    let store = store();
    let table = table();
    let spec = team("a");
    let options = QueryOptions::new().with_max_pages(7);

    let result = QueryAggregator::new(&store, &table, &spec)
        .with_options(&options)
        .run()
        .await
        .unwrap();

    assert_eq!(names(&result.items), vec!["Eve"]);
    assert_eq!(result.stats.pages, 3);
    assert_eq!(result.stats.termination, Termination::Exhausted);
}

#[tokio::test]
async fn test_page_bound_takes_precedence_over_item_bound() {
    let fetcher = Recording::new(store());
    let table = table();
    let spec = team("a");
    let options = QueryOptions::new().with_max_items(2).with_max_pages(2);

    let result = QueryAggregator::new(&fetcher, &table, &spec)
        .with_options(&options)
        .run()
        .await
        .unwrap();

    assert_eq!(names(&result.items), vec!["Carla", "Dan"]);
    assert_eq!(result.stats.termination, Termination::PageBound);
    assert_eq!(fetcher.limits(), vec![Some(2), Some(2)]);
}

#[tokio::test]
async fn test_page_bound_shrinks_cap_after_short_page() {
    let fetcher = Recording::new(store());
    let table = table();
    let spec = team("a").with_filter(Condition::gt("age", 30));
    let options = QueryOptions::new().with_max_items(2).with_max_pages(2);

    let result = QueryAggregator::new(&fetcher, &table, &spec)
        .with_options(&options)
        .run()
        .await
        .unwrap();

    // Ana is filtered out of page 1, so page 2 asks for the one item left in the budget
    assert_eq!(fetcher.limits(), vec![Some(2), Some(1)]);
    assert_eq!(names(&result.items), vec!["Carla"]);
    assert_eq!(result.stats.termination, Termination::PageBound);
}

// ============================================================================
// Failures And Cancellation
// ============================================================================

#[tokio::test]
async fn test_fetch_error_fails_fast() {
    let fetcher = FailingOn {
        inner: store(),
        fail_on: 2,
        calls: AtomicU32::new(0),
    };
    let table = table();
    let spec = team("a");

    let err = QueryAggregator::new(&fetcher, &table, &spec)
        .run()
        .await
        .unwrap_err();

    assert!(err.is_retryable());
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_cancelled_before_first_page() {
    let fetcher = Recording::new(store());
    let table = table();
    let spec = team("a");
    let token = CancellationToken::new();
    token.cancel();

    let err = QueryAggregator::new(&fetcher, &table, &spec)
        .with_cancellation(&token)
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Cancelled { pages_fetched: 0 }));
    assert!(fetcher.requests().is_empty());
}

#[tokio::test]
async fn test_cancelled_during_fetch() {
    let fetcher = StallsAfterFirst {
        inner: store(),
        calls: AtomicU32::new(0),
    };
    let table = table();
    let spec = team("a");
    let token = CancellationToken::new();

    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let err = QueryAggregator::new(&fetcher, &table, &spec)
        .with_cancellation(&token)
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Cancelled { pages_fetched: 1 }));
}

#[tokio::test]
async fn test_uncancelled_token_does_not_interfere() {
    let store = store();
    let table = table();
    let spec = team("a");
    let token = CancellationToken::new();

    let result = QueryAggregator::new(&store, &table, &spec)
        .with_cancellation(&token)
        .run()
        .await
        .unwrap();

    assert_eq!(result.items.len(), 5);
    assert!(!token.is_cancelled());
}

// ============================================================================
// Materialization
// ============================================================================

#[derive(Debug, Deserialize, PartialEq)]
struct Person {
    name: String,
    age: u32,
}

#[tokio::test]
async fn test_materialize_typed_records() {
    let store = store();
    let table = table();
    let spec = team("a");
    let options = QueryOptions::new().with_max_items(2);

    let output: QueryOutput<Person> = QueryAggregator::new(&store, &table, &spec)
        .with_options(&options)
        .run()
        .await
        .unwrap()
        .materialize()
        .unwrap();

    assert_eq!(
        output.records,
        vec![
            Person { name: "Ana".into(), age: 25 },
            Person { name: "Ben".into(), age: 37 },
        ]
    );
    assert_eq!(output.stats.items_returned, 2);
}

#[tokio::test]
async fn test_materialize_mismatch_is_decode_error() {
    let store = store();
    let table = table();
    let spec = team("a").with_projection(["name"]);

    let err = QueryAggregator::new(&store, &table, &spec)
        .run()
        .await
        .unwrap()
        .materialize::<Person>()
        .unwrap_err();

    assert!(err.is_decode_error());
}

#[test]
fn test_termination_display() {
    assert_eq!(Termination::PageBound.to_string(), "page_bound");
    assert_eq!(Termination::ItemBound.to_string(), "item_bound");
    assert_eq!(Termination::Exhausted.to_string(), "exhausted");
}
