// crates/bookmarky-store-sqlite/tests/sqlite_backend.rs
// ============================================================================
// Module: SQLite Backend Tests
// Description: Validate persistence, limits, and schema checks.
// Purpose: Ensure the SQLite backend honors the key-value contract.
// Dependencies: bookmarky-store, bookmarky-store-sqlite, rusqlite, tempfile, tokio
// ============================================================================

//! ## Overview
//! Exercises the `SQLite` backend directly and underneath a chunked store.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use bookmarky_store::BackendError;
use bookmarky_store::ChunkedStore;
use bookmarky_store::ChunkedStoreConfig;
use bookmarky_store::ChunkedStoreError;
use bookmarky_store::KeyValueBackend;
use bookmarky_store_sqlite::SqliteBackend;
use bookmarky_store_sqlite::SqliteBackendConfig;
use bookmarky_store_sqlite::SqliteBackendError;
use bookmarky_store_sqlite::SqliteJournalMode;
use serde_json::Value;
use serde_json::json;
use tempfile::TempDir;
use tokio::time::Instant;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn open(path: &Path) -> SqliteBackend {
    SqliteBackend::new(SqliteBackendConfig::for_path(path)).unwrap()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[tokio::test]
async fn set_get_and_delete_round_trip() {
    let temp = TempDir::new().unwrap();
    let backend = open(&temp.path().join("store.db"));

    assert_eq!(backend.get("columns_0").await.unwrap(), None);
    backend.set("columns_0", Some("[1,2]")).await.unwrap();
    assert_eq!(backend.get("columns_0").await.unwrap().as_deref(), Some("[1,2]"));
    backend.set("columns_0", Some("[3]")).await.unwrap();
    assert_eq!(backend.get("columns_0").await.unwrap().as_deref(), Some("[3]"));
    backend.set("columns_0", None).await.unwrap();
    assert_eq!(backend.get("columns_0").await.unwrap(), None);
    assert!(backend.keys().unwrap().is_empty());
}

#[tokio::test]
async fn oversized_value_is_rejected() {
    let temp = TempDir::new().unwrap();
    let mut config = SqliteBackendConfig::for_path(temp.path().join("store.db"));
    config.max_value_bytes = 8;
    let backend = SqliteBackend::new(config).unwrap();

    let err = backend.set("columns_0", Some("[1,2,3,4,5]")).await.unwrap_err();
    assert!(matches!(
        err,
        BackendError::TooLarge {
            max_bytes: 8,
            actual_bytes: 11,
            ..
        }
    ));
    assert_eq!(backend.get("columns_0").await.unwrap(), None);
}

#[tokio::test]
async fn values_persist_across_reopen() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nested").join("store.db");
    {
        let backend = open(&path);
        backend.set("notes_0", Some("[]")).await.unwrap();
        backend.set("notes_1", Some("[34]")).await.unwrap();
    }
    let reopened = open(&path);
    assert_eq!(reopened.keys().unwrap(), vec!["notes_0".to_string(), "notes_1".to_string()]);
    assert_eq!(reopened.get("notes_1").await.unwrap().as_deref(), Some("[34]"));
}

#[tokio::test]
async fn chunked_store_runs_over_sqlite() {
    let temp = TempDir::new().unwrap();
    let backend = open(&temp.path().join("store.db"));
    let config = ChunkedStoreConfig {
        max_chunk_size: 8,
        ..ChunkedStoreConfig::default()
    };
    let store = ChunkedStore::new(Arc::new(backend.clone()), config);
    let records = vec![json!({"id": "a", "title": "XYZ"})];

    let report = store.write_collection("columns", &records).await.unwrap();
    assert_eq!(report.chunks, 4);
    let read: Vec<Value> = store.read_collection("columns").await.unwrap();
    assert_eq!(read, records);

    store.write_collection::<Value>("columns", &[]).await.unwrap();
    assert_eq!(backend.keys().unwrap(), vec!["columns_0".to_string()]);
}

#[tokio::test]
async fn chunk_larger_than_ceiling_surfaces_backend_error() {
    let temp = TempDir::new().unwrap();
    let mut config = SqliteBackendConfig::for_path(temp.path().join("store.db"));
    config.max_value_bytes = 16;
    let backend = SqliteBackend::new(config).unwrap();
    let store = ChunkedStore::new(Arc::new(backend), ChunkedStoreConfig::default());

    let err = store.write_collection("columns", &[json!({"id": "abcde"})]).await.unwrap_err();
    assert!(matches!(err, ChunkedStoreError::Backend(BackendError::TooLarge { .. })));
}

#[test]
fn unknown_schema_version_fails_closed() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store.db");
    drop(open(&path));
    let connection = rusqlite::Connection::open(&path).unwrap();
    connection.execute("UPDATE store_meta SET version = 99", []).unwrap();
    drop(connection);

    let result = SqliteBackend::new(SqliteBackendConfig::for_path(&path));
    assert!(matches!(result, Err(SqliteBackendError::VersionMismatch(_))));
}

#[test]
fn directory_path_and_zero_ceiling_are_rejected() {
    let temp = TempDir::new().unwrap();
    let dir = SqliteBackend::new(SqliteBackendConfig::for_path(temp.path()));
    assert!(matches!(dir, Err(SqliteBackendError::Invalid(_))));

    let mut config = SqliteBackendConfig::for_path(temp.path().join("store.db"));
    config.max_value_bytes = 0;
    config.journal_mode = SqliteJournalMode::Delete;
    assert!(matches!(SqliteBackend::new(config), Err(SqliteBackendError::Invalid(_))));
}

#[test]
fn empty_path_is_invalid() {
    let result = SqliteBackend::new(SqliteBackendConfig::for_path(""));
    match result {
        Err(SqliteBackendError::Invalid(message)) => {
            assert_eq!(message, "store path must not be empty");
        }
        Err(other) => panic!("expected invalid config, got {other}"),
        Ok(_) => panic!("expected invalid config"),
    }
}

#[tokio::test]
async fn locked_database_does_not_stall_other_tasks() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store.db");
    let mut config = SqliteBackendConfig::for_path(&path);
    config.busy_timeout_ms = 600;
    let backend = SqliteBackend::new(config).unwrap();

    let holder = rusqlite::Connection::open(&path).unwrap();
    holder.execute_batch("BEGIN EXCLUSIVE;").unwrap();

    let ticks = Arc::new(AtomicUsize::new(0));
    let ticker = {
        let ticks = Arc::clone(&ticks);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_millis(50)).await;
                ticks.fetch_add(1, Ordering::SeqCst);
            }
        })
    };

    let start = Instant::now();
    let err = backend.set("columns_0", Some("[]")).await.unwrap_err();
    let elapsed = start.elapsed();
    ticker.abort();

    assert!(matches!(err, BackendError::Io(_)));
    assert!(elapsed >= Duration::from_millis(500));
    assert!(ticks.load(Ordering::SeqCst) >= 3);

    holder.execute_batch("ROLLBACK;").unwrap();
    backend.set("columns_0", Some("[]")).await.unwrap();
    assert_eq!(backend.get("columns_0").await.unwrap().as_deref(), Some("[]"));
}
