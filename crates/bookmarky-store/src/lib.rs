// crates/bookmarky-store/src/lib.rs
// ============================================================================
// Module: Bookmarky Store Library
// Description: Chunked collection persistence over key-value backends.
// Purpose: Persist whole JSON collections under bounded, rate-limited entries.
// Dependencies: bookmarky-codec, async-trait, base64, serde, tokio
// ============================================================================

//! ## Overview
//! Bookmarky Store persists a named collection of JSON records as a dense run
//! of chunk keys (`<name>_0`, `<name>_1`, ...) in a [`KeyValueBackend`].
//! [`ChunkedStore`] drives the chunk loops, paces them with a [`Throttle`],
//! and reports what it did through a [`StoreEventSink`].
//! Invariants:
//! - Chunk keys for a collection form a gap-free prefix `0..N-1`.
//! - A write leaves no key at or beyond the new chunk count.
//! - Reads return the whole collection or an error, never a truncated one.
//!
//! Callers must serialize writes to the same collection name; the store does
//! no locking of its own.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod backend;
pub mod encoding;
pub mod events;
pub mod memory;
pub mod store;
pub mod throttle;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use backend::BackendError;
pub use backend::KeyValueBackend;
pub use encoding::ChunkEncoding;
pub use encoding::EMPTY_CHUNK_VALUE;
pub use events::FileEventSink;
pub use events::MemoryEventSink;
pub use events::NoopEventSink;
pub use events::StderrEventSink;
pub use events::StoreEvent;
pub use events::StoreEventKind;
pub use events::StoreEventSink;
pub use memory::InMemoryBackend;
pub use memory::MemoryBackendLimits;
pub use memory::OperationCounts;
pub use memory::RateLimit;
pub use store::ChunkedStore;
pub use store::ChunkedStoreConfig;
pub use store::ChunkedStoreError;
pub use store::DEFAULT_MAX_CHUNK_SIZE;
pub use store::MAX_COLLECTION_NAME_BYTES;
pub use store::WriteReport;
pub use store::chunk_key;
pub use throttle::Throttle;
pub use throttle::ThrottleConfig;
