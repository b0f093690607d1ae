// crates/bookmarky-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Key-Value Backend
// Description: Durable KeyValueBackend using SQLite.
// Purpose: Persist chunk keys on disk with an enforced per-value ceiling.
// Dependencies: bookmarky-store, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a `SQLite`-backed [`bookmarky_store::KeyValueBackend`]
//! holding one row per key. Writes larger than the configured value ceiling
//! are rejected the way a browser storage area rejects oversized items, so
//! chunk sizing can be exercised against a durable store.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod backend;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use backend::DEFAULT_MAX_VALUE_BYTES;
pub use backend::SqliteBackend;
pub use backend::SqliteBackendConfig;
pub use backend::SqliteBackendError;
pub use backend::SqliteJournalMode;
pub use backend::SqliteSyncMode;
