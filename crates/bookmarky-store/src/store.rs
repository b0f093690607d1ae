// crates/bookmarky-store/src/store.rs
// ============================================================================
// Module: Chunked Collection Store
// Description: Throttled chunk read/write loops over a key-value backend.
// Purpose: Persist whole JSON collections as dense runs of bounded chunks.
// Dependencies: bookmarky-codec, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! [`ChunkedStore`] serializes a collection to JSON, splits the UTF-8 bytes
//! with the byte codec, and writes one backend entry per chunk under
//! `<name>_<index>`. Reads scan indices in order until the first absent key.
//! Every write is a full rewrite followed by a sweep that clears keys past
//! the new chunk count, so the run on disk is always a gap-free prefix.
//!
//! Each loop (read scan, chunk write, trailing sweep) paces its backend
//! calls through its own [`Throttle`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use bookmarky_codec::CodecError;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::backend::BackendError;
use crate::backend::KeyValueBackend;
use crate::encoding::ChunkEncoding;
use crate::encoding::EMPTY_CHUNK_VALUE;
use crate::encoding::decode_stored;
use crate::events::NoopEventSink;
use crate::events::StoreEvent;
use crate::events::StoreEventKind;
use crate::events::StoreEventSink;
use crate::throttle::Throttle;
use crate::throttle::ThrottleConfig;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default payload bytes per chunk.
///
/// Sized so a `json_bytes` chunk value (at most `4 * 1_900 + 1` bytes) stays
/// under an 8 KiB per-value ceiling.
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 1_900;
/// Maximum collection name length in bytes.
pub const MAX_COLLECTION_NAME_BYTES: usize = 128;

// ============================================================================
// SECTION: Config
// ============================================================================

/// Chunked store configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct ChunkedStoreConfig {
    /// Payload bytes per chunk.
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,
    /// Stored form of chunk payloads.
    #[serde(default)]
    pub chunk_encoding: ChunkEncoding,
    /// Pacing applied to every chunk loop.
    #[serde(default)]
    pub throttle: ThrottleConfig,
}

impl Default for ChunkedStoreConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            chunk_encoding: ChunkEncoding::default(),
            throttle: ThrottleConfig::default(),
        }
    }
}

/// Returns the default chunk size.
const fn default_max_chunk_size() -> usize {
    DEFAULT_MAX_CHUNK_SIZE
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Chunked store failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChunkedStoreError {
    /// Caller supplied an invalid name or chunk size.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Reassembled chunk bytes are not valid UTF-8.
    #[error("collection {collection} failed to decode (valid up to byte {valid_up_to})")]
    Decode {
        /// Collection being read.
        collection: String,
        /// Offset of the first invalid byte.
        valid_up_to: usize,
    },
    /// A stored chunk value is not a recognized encoding.
    #[error("chunk {key} is corrupt: {reason}")]
    CorruptChunk {
        /// Key holding the bad value.
        key: String,
        /// Decoder message.
        reason: String,
    },
    /// Reassembled text is not a JSON array of the expected records.
    #[error("collection {collection} is corrupt: {reason}")]
    CorruptCollection {
        /// Collection being read.
        collection: String,
        /// Parser message.
        reason: String,
    },
    /// Records could not be serialized.
    #[error("collection serialization failed: {0}")]
    Serialize(String),
    /// Backend failure.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl ChunkedStoreError {
    /// Returns a stable label for event logging.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::Decode {
                ..
            } => "decode",
            Self::CorruptChunk {
                ..
            } => "corrupt_chunk",
            Self::CorruptCollection {
                ..
            } => "corrupt_collection",
            Self::Serialize(_) => "serialize",
            Self::Backend(error) => error.kind(),
        }
    }

    /// Maps a codec failure for `collection`.
    fn from_codec(collection: &str, error: CodecError) -> Self {
        match error {
            CodecError::InvalidArgument(message) => Self::InvalidArgument(message),
            CodecError::Decode {
                valid_up_to,
            } => Self::Decode {
                collection: collection.to_string(),
                valid_up_to,
            },
        }
    }
}

// ============================================================================
// SECTION: Reports
// ============================================================================

/// Outcome of a collection write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteReport {
    /// Chunks written.
    pub chunks: usize,
    /// Serialized byte length.
    pub bytes: usize,
    /// Stale trailing chunks cleared.
    pub cleared: usize,
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Collection store that spreads each collection across numbered chunk keys.
#[derive(Clone)]
pub struct ChunkedStore {
    /// Injected backend handle.
    backend: Arc<dyn KeyValueBackend>,
    /// Store configuration.
    config: ChunkedStoreConfig,
    /// Event sink for operation logging.
    events: Arc<dyn StoreEventSink>,
}

impl ChunkedStore {
    /// Creates a store over `backend` with events discarded.
    #[must_use]
    pub fn new(backend: Arc<dyn KeyValueBackend>, config: ChunkedStoreConfig) -> Self {
        Self {
            backend,
            config,
            events: Arc::new(NoopEventSink),
        }
    }

    /// Routes store events to `events`.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn StoreEventSink>) -> Self {
        self.events = events;
        self
    }

    /// Returns the store configuration.
    #[must_use]
    pub const fn config(&self) -> &ChunkedStoreConfig {
        &self.config
    }

    /// Reads and reassembles the collection `name`.
    ///
    /// A collection that was never written reads as empty, and its first
    /// chunk key is initialized to the empty marker so later scans stop
    /// immediately. Chunk keys left past a missing first key (an interrupted
    /// clear) are swept before the marker is written.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkedStoreError`] when the name is invalid, a chunk or the
    /// reassembled collection is corrupt, or the backend fails.
    pub async fn read_collection<T: DeserializeOwned>(
        &self,
        name: &str,
    ) -> Result<Vec<T>, ChunkedStoreError> {
        self.read_records(name).await.inspect_err(|err| self.record_error(name, err))
    }

    /// Writes `records` as the full contents of `name` using the configured
    /// chunk size.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkedStoreError`] when validation, serialization, or the
    /// backend fails.
    pub async fn write_collection<T: Serialize + Sync>(
        &self,
        name: &str,
        records: &[T],
    ) -> Result<WriteReport, ChunkedStoreError> {
        self.write_collection_sized(name, records, self.config.max_chunk_size).await
    }

    /// Writes `records` as the full contents of `name` with an explicit chunk
    /// size, then clears any chunk keys left over from a longer run.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkedStoreError::InvalidArgument`] for a zero chunk size,
    /// or another [`ChunkedStoreError`] when serialization or the backend
    /// fails.
    pub async fn write_collection_sized<T: Serialize + Sync>(
        &self,
        name: &str,
        records: &[T],
        max_chunk_size: usize,
    ) -> Result<WriteReport, ChunkedStoreError> {
        self.write_records(name, records, max_chunk_size)
            .await
            .inspect_err(|err| self.record_error(name, err))
    }

    /// Removes the first record matching `predicate` and rewrites `name`.
    ///
    /// Returns the removed record; nothing is written when no record matches.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkedStoreError`] when the read or the rewrite fails.
    pub async fn remove_collection_entry<T, P>(
        &self,
        name: &str,
        predicate: P,
    ) -> Result<Option<T>, ChunkedStoreError>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        P: FnMut(&T) -> bool + Send,
    {
        self.remove_collection_entry_sized(name, predicate, self.config.max_chunk_size).await
    }

    /// Removes the first record matching `predicate` and rewrites `name` with
    /// an explicit chunk size.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkedStoreError`] when the chunk size is zero, or the read
    /// or the rewrite fails.
    pub async fn remove_collection_entry_sized<T, P>(
        &self,
        name: &str,
        predicate: P,
        max_chunk_size: usize,
    ) -> Result<Option<T>, ChunkedStoreError>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        P: FnMut(&T) -> bool + Send,
    {
        self.remove_record(name, predicate, max_chunk_size)
            .await
            .inspect_err(|err| self.record_error(name, err))
    }

    /// Replaces the first record for which `same(existing, &record)` holds, or
    /// appends `record`, then rewrites `name`.
    ///
    /// Returns `true` when an existing record was replaced.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkedStoreError`] when the read or the rewrite fails.
    pub async fn upsert_collection_entry<T, F>(
        &self,
        name: &str,
        record: T,
        same: F,
    ) -> Result<bool, ChunkedStoreError>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnMut(&T, &T) -> bool + Send,
    {
        self.upsert_record(name, record, same).await.inspect_err(|err| self.record_error(name, err))
    }

    /// Clears every chunk key of `name`, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkedStoreError`] when the name is invalid or the backend
    /// fails.
    pub async fn clear_collection(&self, name: &str) -> Result<usize, ChunkedStoreError> {
        self.clear_records(name).await.inspect_err(|err| self.record_error(name, err))
    }

    /// Scans the chunk run and parses the reassembled collection.
    async fn read_records<T: DeserializeOwned>(
        &self,
        name: &str,
    ) -> Result<Vec<T>, ChunkedStoreError> {
        validate_collection_name(name)?;
        let mut throttle = Throttle::new(self.config.throttle);
        let mut chunks: Vec<Vec<u8>> = Vec::new();
        let mut index = 0;
        loop {
            self.pace(&mut throttle, name).await;
            let key = chunk_key(name, index);
            let Some(stored) = self.backend.get(&key).await? else {
                break;
            };
            let payload = decode_stored(&stored).map_err(|reason| {
                ChunkedStoreError::CorruptChunk {
                    key,
                    reason,
                }
            })?;
            if !payload.is_empty() {
                chunks.push(payload);
            }
            index += 1;
        }

        if chunks.is_empty() {
            if index == 0 {
                // Keys past a missing `name_0` are leftovers of an interrupted clear.
                let swept = self.clear_from(name, 1).await?;
                self.pace(&mut throttle, name).await;
                self.backend.set(&chunk_key(name, 0), Some(EMPTY_CHUNK_VALUE)).await?;
                self.events.record(
                    &StoreEvent::new(StoreEventKind::CollectionInitialized, name)
                        .with_cleared(swept),
                );
            }
            return Ok(Vec::new());
        }

        let text = bookmarky_codec::decode(&chunks)
            .map_err(|err| ChunkedStoreError::from_codec(name, err))?;
        let records = serde_json::from_str::<Vec<T>>(&text).map_err(|err| {
            ChunkedStoreError::CorruptCollection {
                collection: name.to_string(),
                reason: err.to_string(),
            }
        })?;
        self.events.record(
            &StoreEvent::new(StoreEventKind::CollectionRead, name)
                .with_chunks(chunks.len())
                .with_bytes(text.len()),
        );
        Ok(records)
    }

    /// Writes the full chunk run for `records` and sweeps stale trailing keys.
    async fn write_records<T: Serialize + Sync>(
        &self,
        name: &str,
        records: &[T],
        max_chunk_size: usize,
    ) -> Result<WriteReport, ChunkedStoreError> {
        validate_collection_name(name)?;
        let text = serde_json::to_string(records)
            .map_err(|err| ChunkedStoreError::Serialize(err.to_string()))?;
        let chunks = bookmarky_codec::encode(&text, max_chunk_size)
            .map_err(|err| ChunkedStoreError::from_codec(name, err))?;

        let mut throttle = Throttle::new(self.config.throttle);
        for (index, chunk) in chunks.iter().enumerate() {
            let value = self
                .config
                .chunk_encoding
                .encode(chunk)
                .map_err(|err| ChunkedStoreError::Serialize(err.to_string()))?;
            self.pace(&mut throttle, name).await;
            self.backend.set(&chunk_key(name, index), Some(&value)).await?;
        }
        let cleared = self.clear_from(name, chunks.len()).await?;

        let report = WriteReport {
            chunks: chunks.len(),
            bytes: text.len(),
            cleared,
        };
        self.events.record(
            &StoreEvent::new(StoreEventKind::CollectionWritten, name)
                .with_chunks(report.chunks)
                .with_bytes(report.bytes)
                .with_cleared(report.cleared),
        );
        Ok(report)
    }

    /// Read-modify-write removal of the first matching record.
    async fn remove_record<T, P>(
        &self,
        name: &str,
        predicate: P,
        max_chunk_size: usize,
    ) -> Result<Option<T>, ChunkedStoreError>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        P: FnMut(&T) -> bool + Send,
    {
        if max_chunk_size == 0 {
            return Err(ChunkedStoreError::InvalidArgument(
                "max_chunk_size must be greater than zero".to_string(),
            ));
        }
        let mut records: Vec<T> = self.read_records(name).await?;
        let Some(position) = records.iter().position(predicate) else {
            return Ok(None);
        };
        let removed = records.remove(position);
        self.write_records(name, &records, max_chunk_size).await?;
        Ok(Some(removed))
    }

    /// Read-modify-write replacement or append of one record.
    async fn upsert_record<T, F>(
        &self,
        name: &str,
        record: T,
        mut same: F,
    ) -> Result<bool, ChunkedStoreError>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnMut(&T, &T) -> bool + Send,
    {
        let mut records: Vec<T> = self.read_records(name).await?;
        let position = records.iter().position(|existing| same(existing, &record));
        let replaced = match position {
            Some(position) => {
                records[position] = record;
                true
            }
            None => {
                records.push(record);
                false
            }
        };
        self.write_records(name, &records, self.config.max_chunk_size).await?;
        Ok(replaced)
    }

    /// Clears the whole chunk run of `name`.
    async fn clear_records(&self, name: &str) -> Result<usize, ChunkedStoreError> {
        validate_collection_name(name)?;
        let cleared = self.clear_from(name, 0).await?;
        self.events
            .record(&StoreEvent::new(StoreEventKind::CollectionCleared, name).with_cleared(cleared));
        Ok(cleared)
    }

    /// Clears `name_<start>`, `name_<start + 1>`, ... until the first absent key.
    async fn clear_from(&self, name: &str, start: usize) -> Result<usize, ChunkedStoreError> {
        let mut throttle = Throttle::new(self.config.throttle);
        let mut index = start;
        loop {
            let key = chunk_key(name, index);
            self.pace(&mut throttle, name).await;
            if self.backend.get(&key).await?.is_none() {
                break;
            }
            self.pace(&mut throttle, name).await;
            self.backend.set(&key, None).await?;
            index += 1;
        }
        Ok(index - start)
    }

    /// Admits one backend operation, logging any cooldown taken.
    async fn pace(&self, throttle: &mut Throttle, name: &str) {
        if let Some(pause) = throttle.acquire().await {
            self.events
                .record(&StoreEvent::new(StoreEventKind::ThrottleCooldown, name).with_pause(pause));
        }
    }

    /// Logs a failed operation.
    fn record_error(&self, name: &str, error: &ChunkedStoreError) {
        self.events.record(
            &StoreEvent::new(StoreEventKind::StoreError, name)
                .with_error(error.kind(), error.to_string()),
        );
    }
}

// ============================================================================
// SECTION: Keys
// ============================================================================

/// Returns the backend key of chunk `index` in collection `name`.
#[must_use]
pub fn chunk_key(name: &str, index: usize) -> String {
    format!("{name}_{index}")
}

/// Validates a collection name.
fn validate_collection_name(name: &str) -> Result<(), ChunkedStoreError> {
    if name.is_empty() {
        return Err(ChunkedStoreError::InvalidArgument(
            "collection name must be non-empty".to_string(),
        ));
    }
    if name.len() > MAX_COLLECTION_NAME_BYTES {
        return Err(ChunkedStoreError::InvalidArgument(format!(
            "collection name exceeds {MAX_COLLECTION_NAME_BYTES} bytes"
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(ChunkedStoreError::InvalidArgument(
            "collection name must not contain control characters".to_string(),
        ));
    }
    Ok(())
}
