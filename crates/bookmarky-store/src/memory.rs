// crates/bookmarky-store/src/memory.rs
// ============================================================================
// Module: In-Memory Key-Value Backend
// Description: Map-backed backend with optional size and rate ceilings.
// Purpose: Stand in for the extension storage area in tests and demos.
// Dependencies: crate::backend, tokio
// ============================================================================

//! ## Overview
//! [`InMemoryBackend`] keeps values in a shared ordered map. It can mimic the
//! ceilings of a real storage area: a per-value byte limit and a rolling
//! window operation limit. Clones share the same map, so a test can hand one
//! clone to a store and inspect keys through another.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::backend::BackendError;
use crate::backend::KeyValueBackend;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Rolling window operation ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    /// Operations admitted per window.
    pub max_operations: u32,
    /// Window length.
    pub window: Duration,
}

/// Optional ceilings enforced by the in-memory backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryBackendLimits {
    /// Maximum stored value size in bytes.
    pub max_value_bytes: Option<usize>,
    /// Operation rate ceiling.
    pub rate_limit: Option<RateLimit>,
}

/// Admitted operation totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OperationCounts {
    /// Reads served.
    pub reads: u64,
    /// Writes and deletes applied.
    pub writes: u64,
}

// ============================================================================
// SECTION: Backend
// ============================================================================

/// Mutable state behind the backend mutex.
#[derive(Debug, Default)]
struct MemoryState {
    /// Stored entries.
    entries: BTreeMap<String, String>,
    /// Admission instants inside the current rate window.
    recent: VecDeque<Instant>,
    /// Admitted operation totals.
    counts: OperationCounts,
}

/// In-memory key-value backend for tests and examples.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    /// Shared state protected by a mutex.
    state: Arc<Mutex<MemoryState>>,
    /// Ceilings applied to every operation.
    limits: MemoryBackendLimits,
}

impl InMemoryBackend {
    /// Creates an unbounded backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend enforcing `limits`.
    #[must_use]
    pub fn with_limits(limits: MemoryBackendLimits) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            limits,
        }
    }

    /// Returns the value under `key` without counting an operation.
    #[must_use]
    pub fn peek(&self, key: &str) -> Option<String> {
        self.state.lock().ok().and_then(|state| state.entries.get(key).cloned())
    }

    /// Returns every stored key in order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.state
            .lock()
            .map(|state| state.entries.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Stores a value directly, bypassing limits and counters.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Io`] when the state mutex is poisoned.
    pub fn insert_raw(&self, key: &str, value: &str) -> Result<(), BackendError> {
        self.lock_state()?.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    /// Returns admitted operation totals.
    #[must_use]
    pub fn operation_counts(&self) -> OperationCounts {
        self.state.lock().map(|state| state.counts).unwrap_or_default()
    }

    /// Locks the shared state.
    fn lock_state(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>, BackendError> {
        self.state.lock().map_err(|_| BackendError::Io("memory backend mutex poisoned".to_string()))
    }

    /// Runs a read against the map after rate admission.
    fn read(&self, key: &str) -> Result<Option<String>, BackendError> {
        let mut state = self.lock_state()?;
        admit(&mut state, self.limits.rate_limit, Instant::now())?;
        state.counts.reads += 1;
        Ok(state.entries.get(key).cloned())
    }

    /// Runs a write or delete against the map after size and rate checks.
    fn write(&self, key: &str, value: Option<&str>) -> Result<(), BackendError> {
        if let (Some(max_bytes), Some(value)) = (self.limits.max_value_bytes, value)
            && value.len() > max_bytes
        {
            return Err(BackendError::TooLarge {
                key: key.to_string(),
                max_bytes,
                actual_bytes: value.len(),
            });
        }
        let mut state = self.lock_state()?;
        admit(&mut state, self.limits.rate_limit, Instant::now())?;
        state.counts.writes += 1;
        match value {
            Some(value) => {
                state.entries.insert(key.to_string(), value.to_string());
            }
            None => {
                state.entries.remove(key);
            }
        }
        drop(state);
        Ok(())
    }
}

#[async_trait]
impl KeyValueBackend for InMemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        self.read(key)
    }

    async fn set(&self, key: &str, value: Option<&str>) -> Result<(), BackendError> {
        self.write(key, value)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Admits one operation under the rolling window, if a limit is configured.
fn admit(
    state: &mut MemoryState,
    limit: Option<RateLimit>,
    now: Instant,
) -> Result<(), BackendError> {
    let Some(limit) = limit else {
        return Ok(());
    };
    while let Some(oldest) = state.recent.front() {
        if now.duration_since(*oldest) >= limit.window {
            state.recent.pop_front();
        } else {
            break;
        }
    }
    let max_operations = usize::try_from(limit.max_operations).unwrap_or(usize::MAX);
    if state.recent.len() >= max_operations {
        return Err(BackendError::RateLimited(format!(
            "{max_operations} operations per {} ms",
            limit.window.as_millis()
        )));
    }
    state.recent.push_back(now);
    Ok(())
}
