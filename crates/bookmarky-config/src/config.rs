// crates/bookmarky-config/src/config.rs
// ============================================================================
// Module: Bookmarky Configuration
// Description: Configuration loading and validation for the chunked store.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: bookmarky-store, bookmarky-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every section is optional and falls back to defaults. Validation rejects
//! settings the backend could not honor, most importantly a chunk size whose
//! worst-case stored value would exceed the backend's per-value ceiling.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use bookmarky_store::ChunkEncoding;
use bookmarky_store::ChunkedStore;
use bookmarky_store::ChunkedStoreConfig;
use bookmarky_store::DEFAULT_MAX_CHUNK_SIZE;
use bookmarky_store::FileEventSink;
use bookmarky_store::InMemoryBackend;
use bookmarky_store::KeyValueBackend;
use bookmarky_store::MemoryBackendLimits;
use bookmarky_store::NoopEventSink;
use bookmarky_store::StderrEventSink;
use bookmarky_store::StoreEventSink;
use bookmarky_store::ThrottleConfig;
use bookmarky_store_sqlite::DEFAULT_MAX_VALUE_BYTES;
use bookmarky_store_sqlite::SqliteBackend;
use bookmarky_store_sqlite::SqliteBackendConfig;
use bookmarky_store_sqlite::SqliteJournalMode;
use bookmarky_store_sqlite::SqliteSyncMode;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "bookmarky.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "BOOKMARKY_CONFIG";
/// Maximum configuration file size in bytes.
const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum operations per throttle window.
const MAX_THROTTLE_OPERATIONS: u32 = 10_000;
/// Maximum throttle cooldown (one hour).
const MAX_COOLDOWN_MS: u64 = 3_600_000;
/// Maximum per-value ceiling accepted for any backend.
const MAX_VALUE_BYTES_LIMIT: usize = 64 * 1024 * 1024;
/// Default `SQLite` busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

// ============================================================================
// SECTION: Config
// ============================================================================

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookmarkyConfig {
    /// Chunking settings.
    #[serde(default)]
    pub store: StoreSection,
    /// Pacing for every chunk loop.
    #[serde(default)]
    pub throttle: ThrottleConfig,
    /// Key-value backend selection.
    #[serde(default)]
    pub backend: BackendConfig,
    /// Event logging.
    #[serde(default)]
    pub events: EventsConfig,
}

/// Chunking settings.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct StoreSection {
    /// Payload bytes per chunk.
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,
    /// Stored form of chunk payloads.
    #[serde(default)]
    pub chunk_encoding: ChunkEncoding,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            chunk_encoding: ChunkEncoding::default(),
        }
    }
}

/// Backend implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Process-local map, lost on exit.
    #[default]
    Memory,
    /// `SQLite` database file.
    Sqlite,
}

/// Backend configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Backend implementation.
    #[serde(default)]
    pub kind: BackendKind,
    /// Per-value byte ceiling.
    #[serde(default = "default_max_value_bytes")]
    pub max_value_bytes: usize,
    /// Database path (sqlite only).
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Busy timeout in milliseconds (sqlite only).
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// Journal mode (sqlite only).
    #[serde(default)]
    pub journal_mode: SqliteJournalMode,
    /// Sync mode (sqlite only).
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::default(),
            max_value_bytes: DEFAULT_MAX_VALUE_BYTES,
            path: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteJournalMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Event sink implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSinkKind {
    /// Discard events.
    #[default]
    None,
    /// JSON lines on stderr.
    Stderr,
    /// JSON lines appended to a file.
    File,
}

/// Event logging configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventsConfig {
    /// Sink implementation.
    #[serde(default)]
    pub sink: EventSinkKind,
    /// Log file path (file sink only).
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl BookmarkyConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_throttle(&self.throttle)?;
        self.backend.validate()?;
        self.events.validate()?;
        self.store.validate(self.backend.max_value_bytes)
    }

    /// Returns the chunked store settings.
    #[must_use]
    pub const fn chunked_store_config(&self) -> ChunkedStoreConfig {
        ChunkedStoreConfig {
            max_chunk_size: self.store.max_chunk_size,
            chunk_encoding: self.store.chunk_encoding,
            throttle: self.throttle,
        }
    }

    /// Opens the configured backend.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the backend cannot be opened.
    pub fn build_backend(&self) -> Result<Arc<dyn KeyValueBackend>, ConfigError> {
        match self.backend.kind {
            BackendKind::Memory => {
                Ok(Arc::new(InMemoryBackend::with_limits(MemoryBackendLimits {
                    max_value_bytes: Some(self.backend.max_value_bytes),
                    rate_limit: None,
                })))
            }
            BackendKind::Sqlite => {
                let Some(path) = &self.backend.path else {
                    return Err(ConfigError::Invalid("sqlite backend requires path".to_string()));
                };
                let backend = SqliteBackend::new(SqliteBackendConfig {
                    path: path.clone(),
                    busy_timeout_ms: self.backend.busy_timeout_ms,
                    journal_mode: self.backend.journal_mode,
                    sync_mode: self.backend.sync_mode,
                    max_value_bytes: self.backend.max_value_bytes,
                })
                .map_err(|err| ConfigError::Io(err.to_string()))?;
                Ok(Arc::new(backend))
            }
        }
    }

    /// Opens the configured event sink.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the event log cannot be opened.
    pub fn build_event_sink(&self) -> Result<Arc<dyn StoreEventSink>, ConfigError> {
        match self.events.sink {
            EventSinkKind::None => Ok(Arc::new(NoopEventSink)),
            EventSinkKind::Stderr => Ok(Arc::new(StderrEventSink)),
            EventSinkKind::File => {
                let Some(path) = &self.events.path else {
                    return Err(ConfigError::Invalid("file event sink requires path".to_string()));
                };
                let sink = FileEventSink::new(path).map_err(|err| ConfigError::Io(err.to_string()))?;
                Ok(Arc::new(sink))
            }
        }
    }

    /// Builds a chunked store over the configured backend and event sink.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when validation fails or a component cannot be
    /// opened.
    pub fn build_store(&self) -> Result<ChunkedStore, ConfigError> {
        self.validate()?;
        let backend = self.build_backend()?;
        let events = self.build_event_sink()?;
        Ok(ChunkedStore::new(backend, self.chunked_store_config()).with_event_sink(events))
    }
}

impl StoreSection {
    /// Validates chunk sizing against the backend ceiling.
    fn validate(&self, max_value_bytes: usize) -> Result<(), ConfigError> {
        if self.max_chunk_size == 0 {
            return Err(ConfigError::Invalid(
                "store max_chunk_size must be greater than zero".to_string(),
            ));
        }
        let stored = self.chunk_encoding.max_stored_len(self.max_chunk_size);
        if stored > max_value_bytes {
            return Err(ConfigError::Invalid(format!(
                "store max_chunk_size {} encodes to {stored} bytes as {}, above backend \
                 max_value_bytes {max_value_bytes}",
                self.max_chunk_size,
                self.chunk_encoding.as_str()
            )));
        }
        Ok(())
    }
}

impl BackendConfig {
    /// Validates backend settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_value_bytes == 0 {
            return Err(ConfigError::Invalid(
                "backend max_value_bytes must be greater than zero".to_string(),
            ));
        }
        if self.max_value_bytes > MAX_VALUE_BYTES_LIMIT {
            return Err(ConfigError::Invalid("backend max_value_bytes exceeds limit".to_string()));
        }
        match self.kind {
            BackendKind::Memory => {
                if self.path.is_some() {
                    return Err(ConfigError::Invalid(
                        "memory backend must not set path".to_string(),
                    ));
                }
            }
            BackendKind::Sqlite => {
                let Some(path) = &self.path else {
                    return Err(ConfigError::Invalid("sqlite backend requires path".to_string()));
                };
                validate_path_string("backend path", &path.to_string_lossy())?;
                if self.busy_timeout_ms == 0 {
                    return Err(ConfigError::Invalid(
                        "backend busy_timeout_ms must be greater than zero".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

impl EventsConfig {
    /// Validates event sink settings.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (EventSinkKind::File, None) => {
                Err(ConfigError::Invalid("file event sink requires path".to_string()))
            }
            (EventSinkKind::File, Some(path)) => {
                validate_path_string("events path", &path.to_string_lossy())
            }
            (_, Some(_)) => {
                Err(ConfigError::Invalid("events path requires the file sink".to_string()))
            }
            (_, None) => Ok(()),
        }
    }
}

/// Validates throttle bounds.
fn validate_throttle(throttle: &ThrottleConfig) -> Result<(), ConfigError> {
    if throttle.max_operations == 0 {
        return Err(ConfigError::Invalid(
            "throttle max_operations must be greater than zero".to_string(),
        ));
    }
    if throttle.max_operations > MAX_THROTTLE_OPERATIONS {
        return Err(ConfigError::Invalid(format!(
            "throttle max_operations must be at most {MAX_THROTTLE_OPERATIONS}"
        )));
    }
    if throttle.cooldown_ms == 0 || throttle.cooldown_ms > MAX_COOLDOWN_MS {
        return Err(ConfigError::Invalid(format!(
            "throttle cooldown_ms must be between 1 and {MAX_COOLDOWN_MS}"
        )));
    }
    Ok(())
}

/// Returns the default chunk size.
const fn default_max_chunk_size() -> usize {
    DEFAULT_MAX_CHUNK_SIZE
}

/// Returns the default per-value ceiling.
const fn default_max_value_bytes() -> usize {
    DEFAULT_MAX_VALUE_BYTES
}

/// Returns the default busy timeout.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration or opening a component.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from the argument or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a configured path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
