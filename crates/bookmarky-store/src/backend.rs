// crates/bookmarky-store/src/backend.rs
// ============================================================================
// Module: Key-Value Backend Interface
// Description: Async get/set contract consumed by the chunked store.
// Purpose: Decouple chunk orchestration from the storage engine.
// Dependencies: async-trait, thiserror
// ============================================================================

//! ## Overview
//! A [`KeyValueBackend`] stores string values under string keys. Writing
//! `None` deletes the key. Backends are assumed eventually consistent and
//! non-transactional; they may enforce a per-value byte ceiling and an
//! operation rate ceiling, reported as [`BackendError`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use thiserror::Error;

// ============================================================================
// SECTION: Interface
// ============================================================================

/// String key-value storage consumed by the chunked store.
#[async_trait]
pub trait KeyValueBackend: Send + Sync {
    /// Returns the value stored under `key`, or `None` when absent.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] when the backend cannot serve the read.
    async fn get(&self, key: &str) -> Result<Option<String>, BackendError>;

    /// Stores `value` under `key`; `None` removes the key.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] when the backend rejects or fails the write.
    async fn set(&self, key: &str, value: Option<&str>) -> Result<(), BackendError>;
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Backend failures, propagated unchanged by the chunked store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// Storage I/O failure.
    #[error("backend io error: {0}")]
    Io(String),
    /// Value exceeded the backend's per-entry ceiling.
    #[error("backend value too large for {key}: {actual_bytes} bytes (max {max_bytes})")]
    TooLarge {
        /// Key the write targeted.
        key: String,
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual value size in bytes.
        actual_bytes: usize,
    },
    /// Operation rejected by the backend's rate ceiling.
    #[error("backend rate limit exceeded: {0}")]
    RateLimited(String),
    /// Backend is unavailable.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

impl BackendError {
    /// Returns a stable label for event logging.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Io(_) => "backend_io",
            Self::TooLarge {
                ..
            } => "backend_too_large",
            Self::RateLimited(_) => "backend_rate_limited",
            Self::Unavailable(_) => "backend_unavailable",
        }
    }
}
