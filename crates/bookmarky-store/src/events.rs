// crates/bookmarky-store/src/events.rs
// ============================================================================
// Module: Store Event Logging
// Description: Structured events emitted by the chunked store.
// Purpose: Emit JSON-line logs without binding to a logging pipeline.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! [`StoreEvent`] records one completed store operation, throttle cooldown,
//! or failure. Sinks decide where events go: nowhere, stderr, an append-only
//! JSON-lines file, or an in-memory buffer.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Store event classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreEventKind {
    /// A collection was reassembled from its chunks.
    CollectionRead,
    /// A missing collection was initialized to the empty marker.
    CollectionInitialized,
    /// A collection was written and its trailing chunks cleared.
    CollectionWritten,
    /// A collection's chunks were removed.
    CollectionCleared,
    /// A chunk loop paused to stay under the backend rate ceiling.
    ThrottleCooldown,
    /// An operation failed.
    StoreError,
}

/// Store event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreEvent {
    /// Event classification.
    pub event: StoreEventKind,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Collection the event concerns.
    pub collection: String,
    /// Chunk count read or written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunks: Option<usize>,
    /// Serialized byte length of the collection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<usize>,
    /// Trailing or explicit chunk keys cleared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleared: Option<usize>,
    /// Cooldown length in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pause_ms: Option<u128>,
    /// Normalized error label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
    /// Error message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StoreEvent {
    /// Creates an event stamped with the current time.
    #[must_use]
    pub fn new(event: StoreEventKind, collection: &str) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |duration| duration.as_millis());
        Self {
            event,
            timestamp_ms,
            collection: collection.to_string(),
            chunks: None,
            bytes: None,
            cleared: None,
            pause_ms: None,
            error_kind: None,
            error: None,
        }
    }

    /// Sets the chunk count.
    #[must_use]
    pub fn with_chunks(mut self, chunks: usize) -> Self {
        self.chunks = Some(chunks);
        self
    }

    /// Sets the serialized byte length.
    #[must_use]
    pub fn with_bytes(mut self, bytes: usize) -> Self {
        self.bytes = Some(bytes);
        self
    }

    /// Sets the cleared key count.
    #[must_use]
    pub fn with_cleared(mut self, cleared: usize) -> Self {
        self.cleared = Some(cleared);
        self
    }

    /// Sets the cooldown length.
    #[must_use]
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause_ms = Some(pause.as_millis());
        self
    }

    /// Sets the error label and message.
    #[must_use]
    pub fn with_error(mut self, kind: &'static str, message: String) -> Self {
        self.error_kind = Some(kind);
        self.error = Some(message);
        self
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Store event sink.
pub trait StoreEventSink: Send + Sync {
    /// Record a store event.
    fn record(&self, event: &StoreEvent);
}

/// Event sink that logs JSON lines to stderr.
pub struct StderrEventSink;

impl StoreEventSink for StderrEventSink {
    fn record(&self, event: &StoreEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Event sink that logs JSON lines to a file.
pub struct FileEventSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileEventSink {
    /// Opens the event log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl StoreEventSink for FileEventSink {
    fn record(&self, event: &StoreEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// Event sink that keeps events in memory for inspection.
#[derive(Debug, Default)]
pub struct MemoryEventSink {
    /// Recorded events in arrival order.
    events: Mutex<Vec<StoreEvent>>,
}

impl MemoryEventSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<StoreEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Returns the recorded events of one kind.
    #[must_use]
    pub fn events_of(&self, kind: StoreEventKind) -> Vec<StoreEvent> {
        self.events().into_iter().filter(|event| event.event == kind).collect()
    }
}

impl StoreEventSink for MemoryEventSink {
    fn record(&self, event: &StoreEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// No-op event sink.
pub struct NoopEventSink;

impl StoreEventSink for NoopEventSink {
    fn record(&self, _event: &StoreEvent) {}
}
