// crates/bookmarky-config/tests/load_validation.rs
// ============================================================================
// Module: Config Load and Validation Tests
// Description: Validate TOML loading, limits, and component wiring.
// Purpose: Ensure misconfigured stores fail closed before any write.
// Dependencies: bookmarky-config, bookmarky-store, serde_json, tempfile, tokio
// ============================================================================

//! ## Overview
//! Loads configuration files from a temporary directory and checks defaults,
//! per-section bounds, the chunk-size/value-ceiling cross check, and the
//! store built from a valid file.

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

use std::path::PathBuf;

use bookmarky_config::BackendKind;
use bookmarky_config::BookmarkyConfig;
use bookmarky_config::ConfigError;
use bookmarky_config::EventSinkKind;
use bookmarky_store::ChunkEncoding;
use bookmarky_store::DEFAULT_MAX_CHUNK_SIZE;
use serde_json::Value;
use serde_json::json;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn load_str(temp: &TempDir, content: &str) -> Result<BookmarkyConfig, ConfigError> {
    let path = temp.path().join("bookmarky.toml");
    std::fs::write(&path, content).unwrap();
    BookmarkyConfig::load(Some(&path))
}

fn assert_invalid(result: Result<BookmarkyConfig, ConfigError>, needle: &str) {
    match result {
        Err(ConfigError::Invalid(message)) => {
            assert!(message.contains(needle), "error {message} did not contain {needle}");
        }
        other => panic!("expected invalid config, got {other:?}"),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn empty_file_uses_defaults() {
    let temp = TempDir::new().unwrap();
    let config = load_str(&temp, "").unwrap();
    assert_eq!(config.store.max_chunk_size, DEFAULT_MAX_CHUNK_SIZE);
    assert_eq!(config.store.chunk_encoding, ChunkEncoding::JsonBytes);
    assert_eq!(config.throttle.max_operations, 100);
    assert_eq!(config.throttle.cooldown_ms, 60_000);
    assert_eq!(config.backend.kind, BackendKind::Memory);
    assert_eq!(config.backend.max_value_bytes, 8_192);
    assert_eq!(config.events.sink, EventSinkKind::None);
}

#[test]
fn full_file_parses_every_section() {
    let temp = TempDir::new().unwrap();
    let db = temp.path().join("store.db");
    let log = temp.path().join("events.jsonl");
    let content = format!(
        r#"
[store]
max_chunk_size = 600
chunk_encoding = "base64"

[throttle]
max_operations = 50
cooldown_ms = 1000

[backend]
kind = "sqlite"
max_value_bytes = 4096
path = "{}"
journal_mode = "delete"
sync_mode = "normal"

[events]
sink = "file"
path = "{}"
"#,
        db.display(),
        log.display()
    );
    let config = load_str(&temp, &content).unwrap();
    assert_eq!(config.store.chunk_encoding, ChunkEncoding::Base64);
    assert_eq!(config.backend.kind, BackendKind::Sqlite);
    assert_eq!(config.backend.path, Some(db));
    assert_eq!(config.events.path, Some(log));
    let store_config = config.chunked_store_config();
    assert_eq!(store_config.max_chunk_size, 600);
    assert_eq!(store_config.throttle.max_operations, 50);
}

#[test]
fn missing_file_is_io_error() {
    let temp = TempDir::new().unwrap();
    let missing = temp.path().join("absent.toml");
    assert!(matches!(BookmarkyConfig::load(Some(&missing)), Err(ConfigError::Io(_))));
}

#[test]
fn malformed_toml_is_parse_error() {
    let temp = TempDir::new().unwrap();
    assert!(matches!(load_str(&temp, "[store\nmax_chunk_size = 1"), Err(ConfigError::Parse(_))));
    assert!(matches!(
        load_str(&temp, "[store]\nchunk_encoding = \"hex\""),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn oversized_and_non_utf8_files_are_rejected() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("big.toml");
    std::fs::write(&path, vec![b'#'; 1024 * 1024 + 1]).unwrap();
    assert!(matches!(BookmarkyConfig::load(Some(&path)), Err(ConfigError::Invalid(_))));

    let path = temp.path().join("latin1.toml");
    std::fs::write(&path, [b'#', 0xff, b'\n']).unwrap();
    assert!(matches!(BookmarkyConfig::load(Some(&path)), Err(ConfigError::Invalid(_))));
}

#[test]
fn throttle_bounds_are_enforced() {
    let temp = TempDir::new().unwrap();
    assert_invalid(
        load_str(&temp, "[throttle]\nmax_operations = 0"),
        "max_operations must be greater than zero",
    );
    assert_invalid(
        load_str(&temp, "[throttle]\nmax_operations = 10001"),
        "max_operations must be at most",
    );
    assert_invalid(load_str(&temp, "[throttle]\ncooldown_ms = 0"), "cooldown_ms must be between");
    assert_invalid(
        load_str(&temp, "[throttle]\ncooldown_ms = 3600001"),
        "cooldown_ms must be between",
    );
}

#[test]
fn chunk_size_must_fit_backend_ceiling() {
    let temp = TempDir::new().unwrap();
    assert_invalid(
        load_str(&temp, "[store]\nmax_chunk_size = 0"),
        "max_chunk_size must be greater than zero",
    );
    // 2048 bytes as a JSON array can reach 8193 characters.
    assert_invalid(load_str(&temp, "[store]\nmax_chunk_size = 2048"), "above backend");
    // The same chunk size fits as base64 (2732 characters).
    let config =
        load_str(&temp, "[store]\nmax_chunk_size = 2048\nchunk_encoding = \"base64\"").unwrap();
    assert_eq!(config.store.max_chunk_size, 2048);
}

#[test]
fn backend_and_events_paths_are_checked() {
    let temp = TempDir::new().unwrap();
    assert_invalid(load_str(&temp, "[backend]\nkind = \"sqlite\""), "sqlite backend requires path");
    assert_invalid(
        load_str(&temp, "[backend]\nkind = \"memory\"\npath = \"x.db\""),
        "memory backend must not set path",
    );
    assert_invalid(
        load_str(&temp, "[backend]\nmax_value_bytes = 0"),
        "max_value_bytes must be greater than zero",
    );
    assert_invalid(load_str(&temp, "[events]\nsink = \"file\""), "file event sink requires path");
    assert_invalid(
        load_str(&temp, "[events]\nsink = \"stderr\"\npath = \"e.jsonl\""),
        "events path requires the file sink",
    );
}

#[test]
fn validate_catches_programmatic_changes() {
    let mut config = BookmarkyConfig::default();
    config.validate().unwrap();
    config.backend.kind = BackendKind::Sqlite;
    config.backend.path = Some(PathBuf::from(" "));
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("backend path must be non-empty"));
}

#[tokio::test]
async fn built_store_writes_through_sqlite_and_logs_events() {
    let temp = TempDir::new().unwrap();
    let db = temp.path().join("data").join("store.db");
    let log = temp.path().join("events.jsonl");
    let content = format!(
        "[store]\nmax_chunk_size = 8\n\n[backend]\nkind = \"sqlite\"\npath = \"{}\"\n\n\
         [events]\nsink = \"file\"\npath = \"{}\"\n",
        db.display(),
        log.display()
    );
    let config = load_str(&temp, &content).unwrap();
    let store = config.build_store().unwrap();

    let records = vec![json!({"id": "a", "title": "XYZ"})];
    let report = store.write_collection("columns", &records).await.unwrap();
    assert_eq!(report.chunks, 4);
    let read: Vec<Value> = store.read_collection("columns").await.unwrap();
    assert_eq!(read, records);
    assert!(db.exists());

    let lines: Vec<Value> = std::fs::read_to_string(&log)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["event"], "collection_written");
    assert_eq!(lines[1]["event"], "collection_read");
}

#[test]
fn default_chunk_value_fits_default_ceiling() {
    let config = BookmarkyConfig::default();
    let stored = config.store.chunk_encoding.max_stored_len(config.store.max_chunk_size);
    assert_eq!(stored, 7_601);
    assert!(stored <= config.backend.max_value_bytes);
    config.validate().unwrap();
}
