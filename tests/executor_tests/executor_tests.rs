//! Tests for BatchExecutor
//!
//! These tests verify:
//! - One bulk call per collection, arrival order kept within a collection
//! - Updates are not coalesced
//! - Whole-group and partial failures reach the sink and are dropped
//! - Select waves resolve every caller with its own rows
//! - A failing select rejects only its own caller
//! - A panicking store call becomes an ordinary failure

#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;

use batchq::executor::BatchExecutor;
use batchq::operation::OperationRecord;
use batchq::sink::{CollectingSink, FailedItem};
use batchq::{
    BatchError, Filter, FindOptions, MemoryStore, OperationKind, SelectHandle, StoreError,
};
use common::{doc, PanickingStore};
use serde_json::json;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup() -> (Arc<MemoryStore>, Arc<CollectingSink>, BatchExecutor) {
    setup_with_store(MemoryStore::new())
}

fn setup_with_store(store: MemoryStore) -> (Arc<MemoryStore>, Arc<CollectingSink>, BatchExecutor) {
    let store = Arc::new(store);
    let sink = Arc::new(CollectingSink::new());
    let executor = BatchExecutor::new(store.clone(), sink.clone());
    (store, sink, executor)
}

fn insert(collection: &str, n: i64) -> OperationRecord {
    OperationRecord::insert(collection, doc(json!({ "n": n }))).unwrap()
}

fn select(collection: &str, filter: Filter) -> (OperationRecord, SelectHandle) {
    OperationRecord::select(collection, filter, FindOptions::new()).unwrap()
}

// =============================================================================
// Insert Batch Tests
// =============================================================================

#[test]
fn test_insert_batch_groups_by_collection() {
    let (store, sink, executor) = setup();

    let report = executor.execute(vec![
        insert("Wishlist", 1),
        insert("Audit", 2),
        insert("Wishlist", 3),
    ]);

    assert_eq!(report.records, 3);
    assert_eq!(report.store_calls, 2);
    assert_eq!(report.failed, 0);

    let calls = store.calls_of(OperationKind::Insert);
    assert_eq!(calls.len(), 2);
    assert_eq!(
        store.documents("Wishlist"),
        vec![doc(json!({"n": 1})), doc(json!({"n": 3}))]
    );
    assert_eq!(store.documents("Audit"), vec![doc(json!({"n": 2}))]);
    assert!(sink.dropped().is_empty());
}

#[test]
fn test_empty_batch_makes_no_calls() {
    let (store, _sink, executor) = setup();

    let report = executor.execute(Vec::new());

    assert_eq!(report.store_calls, 0);
    assert!(store.calls().is_empty());
}

// =============================================================================
// Update / Delete Batch Tests
// =============================================================================

#[test]
fn test_updates_to_same_document_are_not_coalesced() {
    let (store, _sink, executor) = setup();
    executor.execute(vec![
        OperationRecord::insert("c", doc(json!({"id": 1, "v": 0}))).unwrap(),
    ]);

    executor.execute(vec![
        OperationRecord::update("c", Filter::new().with("id", 1), doc(json!({"v": 1}))).unwrap(),
        OperationRecord::update("c", Filter::new().with("id", 1), doc(json!({"v": 2}))).unwrap(),
    ]);

    let calls = store.calls_of(OperationKind::Update);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].items, 2);
    assert_eq!(store.documents("c"), vec![doc(json!({"id": 1, "v": 2}))]);
}

#[test]
fn test_delete_batch_one_call_per_collection() {
    let (store, _sink, executor) = setup();
    executor.execute(vec![insert("a", 1), insert("a", 2), insert("b", 1)]);

    let report = executor.execute(vec![
        OperationRecord::delete("a", Filter::new().with("n", 1)).unwrap(),
        OperationRecord::delete("a", Filter::new().with("n", 2)).unwrap(),
        OperationRecord::delete("b", Filter::new().with("n", 1)).unwrap(),
    ]);

    assert_eq!(report.store_calls, 2);
    assert_eq!(report.affected, 3);
    assert_eq!(store.len("a"), 0);
    assert_eq!(store.len("b"), 0);
}

// =============================================================================
// Write Failure Tests
// =============================================================================

#[test]
fn test_whole_group_failure_is_reported_and_dropped() {
    let (store, sink, executor) = setup();
    store.set_outage("Down", StoreError::Unavailable("unreachable".into()));

    let report = executor.execute(vec![insert("Down", 1), insert("Up", 2), insert("Down", 3)]);

    assert_eq!(report.failed, 2);
    assert_eq!(store.len("Up"), 1);

    let dropped = sink.dropped();
    assert_eq!(dropped.len(), 1);
    assert_eq!(dropped[0].kind, OperationKind::Insert);
    assert_eq!(dropped[0].collection, "Down");
    assert!(dropped[0].whole_group);
    assert_eq!(
        dropped[0].items,
        vec![
            FailedItem::Insert(doc(json!({"n": 1}))),
            FailedItem::Insert(doc(json!({"n": 3}))),
        ]
    );
}

#[test]
fn test_partial_failure_reports_only_rejected_items() {
    let (store, sink, executor) =
        setup_with_store(MemoryStore::new().with_unique_field("users", "email"));

    let report = executor.execute(vec![
        OperationRecord::insert("users", doc(json!({"email": "a"}))).unwrap(),
        OperationRecord::insert("users", doc(json!({"email": "a"}))).unwrap(),
        OperationRecord::insert("users", doc(json!({"email": "b"}))).unwrap(),
    ]);

    assert_eq!(report.failed, 1);
    assert_eq!(store.len("users"), 2);

    let dropped = sink.dropped();
    assert_eq!(dropped.len(), 1);
    assert!(!dropped[0].whole_group);
    assert_eq!(dropped[0].items, vec![FailedItem::Insert(doc(json!({"email": "a"})))]);
    assert!(matches!(dropped[0].error, StoreError::Rejected(_)));
}

#[test]
fn test_partial_failures_share_one_report_per_group() {
    let (store, sink, executor) =
        setup_with_store(MemoryStore::new().with_unique_field("users", "email"));

    let report = executor.execute(vec![
        OperationRecord::insert("users", doc(json!({"email": "a", "n": 1}))).unwrap(),
        OperationRecord::insert("users", doc(json!({"email": "a", "n": 2}))).unwrap(),
        OperationRecord::insert("users", doc(json!({"email": "b", "n": 3}))).unwrap(),
        OperationRecord::insert("users", doc(json!({"email": "b", "n": 4}))).unwrap(),
    ]);

    assert_eq!(report.failed, 2);
    assert_eq!(report.store_calls, 1);
    assert_eq!(store.len("users"), 2);

    let dropped = sink.dropped();
    assert_eq!(dropped.len(), 1);
    assert!(!dropped[0].whole_group);
    assert_eq!(
        dropped[0].items,
        vec![
            FailedItem::Insert(doc(json!({"email": "a", "n": 2}))),
            FailedItem::Insert(doc(json!({"email": "b", "n": 4}))),
        ]
    );
}

#[test]
fn test_failed_delete_reports_filters() {
    let (store, sink, executor) = setup();
    store.set_outage("c", StoreError::Unavailable("x".into()));

    executor.execute(vec![OperationRecord::delete("c", Filter::new().with("id", 9)).unwrap()]);

    let dropped = sink.dropped();
    assert_eq!(dropped[0].kind, OperationKind::Delete);
    assert_eq!(dropped[0].items, vec![FailedItem::Delete(Filter::new().with("id", 9))]);
}

// =============================================================================
// Select Wave Tests
// =============================================================================

#[test]
fn test_select_wave_resolves_each_caller_with_own_rows() {
    let (store, _sink, executor) = setup();
    let seed: Vec<_> = (0..50)
        .map(|i| OperationRecord::insert("c", doc(json!({"id": i, "sq": i * i}))).unwrap())
        .collect();
    executor.execute(seed);

    let (records, handles): (Vec<_>, Vec<_>) =
        (0..50).map(|i| select("c", Filter::new().with("id", i))).unzip();

    let report = executor.execute(records);
    assert_eq!(report.store_calls, 50);
    assert_eq!(report.failed, 0);

    for (i, handle) in handles.into_iter().enumerate() {
        let rows = handle.wait().unwrap();
        let i = i as i64;
        assert_eq!(rows, vec![doc(json!({"id": i, "sq": i * i}))]);
    }
    // selects are dispatched one query each, never merged
    assert_eq!(store.calls_of(OperationKind::Select).len(), 50);
}

#[test]
fn test_failing_select_rejects_only_its_caller() {
    let (store, _sink, executor) = setup();
    executor.execute(vec![insert("ok", 1)]);
    store.set_outage("broken", StoreError::Query("bad filter".into()));

    let (bad_record, bad_handle) = select("broken", Filter::new());
    let mut records = vec![bad_record];
    let mut handles = Vec::new();
    for _ in 0..10 {
        let (record, handle) = select("ok", Filter::new());
        records.push(record);
        handles.push(handle);
    }

    let report = executor.execute(records);
    assert_eq!(report.failed, 1);

    match bad_handle.wait() {
        Err(BatchError::Store(StoreError::Query(msg))) => assert_eq!(msg, "bad filter"),
        other => panic!("expected query error, got {:?}", other),
    }
    for handle in handles {
        assert_eq!(handle.wait().unwrap(), vec![doc(json!({"n": 1}))]);
    }
}

#[test]
fn test_select_with_dropped_handle_still_runs() {
    let (store, _sink, executor) = setup();
    let (record, handle) = select("c", Filter::new());
    drop(handle);

    let report = executor.execute(vec![record]);

    assert_eq!(report.failed, 0);
    assert_eq!(store.calls_of(OperationKind::Select).len(), 1);
}

// =============================================================================
// Store Panic Tests
// =============================================================================

#[test]
fn test_panicking_write_is_dropped_as_whole_group() {
    let store = Arc::new(PanickingStore::new("boom"));
    let sink = Arc::new(CollectingSink::new());
    let executor = BatchExecutor::new(store.clone(), sink.clone());

    let report = executor.execute(vec![insert("boom", 1), insert("ok", 2), insert("boom", 3)]);

    assert_eq!(report.failed, 2);
    assert_eq!(store.inner.len("ok"), 1);

    let dropped = sink.dropped();
    assert_eq!(dropped.len(), 1);
    assert_eq!(dropped[0].collection, "boom");
    assert!(dropped[0].whole_group);
    assert_eq!(dropped[0].items.len(), 2);
    match &dropped[0].error {
        StoreError::Unavailable(msg) => assert!(msg.contains("store exploded on boom")),
        other => panic!("expected unavailable, got {:?}", other),
    }
}

#[test]
fn test_panicking_select_rejects_only_its_caller() {
    let store = Arc::new(PanickingStore::new("boom"));
    let executor = BatchExecutor::new(store, Arc::new(CollectingSink::new()));

    // alone, the wave runs on the calling thread
    let (record, handle) = select("boom", Filter::new());
    let report = executor.execute(vec![record]);
    assert_eq!(report.failed, 1);
    assert!(matches!(
        handle.wait(),
        Err(BatchError::Store(StoreError::Unavailable(_)))
    ));

    let (bad_record, bad_handle) = select("boom", Filter::new());
    let (good_record, good_handle) = select("ok", Filter::new());
    let report = executor.execute(vec![bad_record, good_record]);

    assert_eq!(report.failed, 1);
    assert!(matches!(
        bad_handle.wait(),
        Err(BatchError::Store(StoreError::Unavailable(_)))
    ));
    assert_eq!(good_handle.wait().unwrap(), vec![]);
}
