// crates/bookmarky-store-sqlite/src/backend.rs
// ============================================================================
// Module: SQLite Key-Value Backend
// Description: Single-table key-value storage backed by SQLite.
// Purpose: Serve chunk reads/writes durably with a per-value byte ceiling.
// Dependencies: bookmarky-store, rusqlite, serde, thiserror, tokio
// ============================================================================

//! ## Overview
//! [`SqliteBackend`] stores each key as one row of the `kv_entries` table.
//! Writing `None` deletes the row. Values above
//! [`SqliteBackendConfig::max_value_bytes`] are rejected on write and treated
//! as corruption on read. Schema versions are tracked in `store_meta` and an
//! unknown version fails closed. Queries run on tokio's blocking pool so a
//! busy database never stalls the async executor.

// ============================================================================//
// SECTION: Imports
// ============================================================================//

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use bookmarky_store::BackendError;
use bookmarky_store::KeyValueBackend;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================//
// SECTION: Constants
// ============================================================================//

/// `SQLite` schema version for the backend.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default per-value ceiling, matching an 8 KiB storage item.
pub const DEFAULT_MAX_VALUE_BYTES: usize = 8_192;

// ============================================================================//
// SECTION: Config
// ============================================================================//

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteJournalMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteJournalMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` key-value backend.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteBackendConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteJournalMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
    /// Maximum stored value size in bytes.
    #[serde(default = "default_max_value_bytes")]
    pub max_value_bytes: usize,
}

impl SqliteBackendConfig {
    /// Creates a configuration for `path` with default settings.
    #[must_use]
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteJournalMode::default(),
            sync_mode: SqliteSyncMode::default(),
            max_value_bytes: DEFAULT_MAX_VALUE_BYTES,
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

/// Returns the default per-value ceiling.
const fn default_max_value_bytes() -> usize {
    DEFAULT_MAX_VALUE_BYTES
}

// ============================================================================//
// SECTION: Errors
// ============================================================================//

/// `SQLite` backend errors.
#[derive(Debug, Error)]
pub enum SqliteBackendError {
    /// Backend I/O error.
    #[error("sqlite backend io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite backend db error: {0}")]
    Db(String),
    /// Stored data violates backend limits.
    #[error("sqlite backend corruption: {0}")]
    Corrupt(String),
    /// Backend schema version mismatch.
    #[error("sqlite backend version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid backend configuration.
    #[error("sqlite backend invalid config: {0}")]
    Invalid(String),
    /// Value exceeded the configured ceiling.
    #[error("sqlite backend value too large for {key}: {actual_bytes} bytes (max {max_bytes})")]
    TooLarge {
        /// Key the write targeted.
        key: String,
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual value size in bytes.
        actual_bytes: usize,
    },
}

impl From<SqliteBackendError> for BackendError {
    fn from(error: SqliteBackendError) -> Self {
        match error {
            SqliteBackendError::Io(message) => Self::Io(message),
            SqliteBackendError::Db(message) => Self::Io(format!("sqlite: {message}")),
            SqliteBackendError::Corrupt(message) => Self::Io(format!("corrupt entry: {message}")),
            SqliteBackendError::VersionMismatch(message) | SqliteBackendError::Invalid(message) => {
                Self::Unavailable(message)
            }
            SqliteBackendError::TooLarge {
                key,
                max_bytes,
                actual_bytes,
            } => Self::TooLarge {
                key,
                max_bytes,
                actual_bytes,
            },
        }
    }
}

// ============================================================================//
// SECTION: Backend
// ============================================================================//

/// `SQLite`-backed key-value backend.
#[derive(Clone)]
pub struct SqliteBackend {
    /// Backend configuration.
    config: SqliteBackendConfig,
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteBackend {
    /// Opens an `SQLite`-backed key-value backend.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteBackendError`] when the configuration is invalid or the
    /// database cannot be opened or initialized.
    pub fn new(config: SqliteBackendConfig) -> Result<Self, SqliteBackendError> {
        if config.max_value_bytes == 0 {
            return Err(SqliteBackendError::Invalid(
                "max_value_bytes must be greater than zero".to_string(),
            ));
        }
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(&config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            config,
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Returns every stored key in order.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteBackendError`] when the query fails.
    pub fn keys(&self) -> Result<Vec<String>, SqliteBackendError> {
        let guard = self.lock()?;
        let mut statement = guard
            .prepare("SELECT key FROM kv_entries ORDER BY key")
            .map_err(|err| SqliteBackendError::Db(err.to_string()))?;
        let keys = statement
            .query_map(params![], |row| row.get::<_, String>(0))
            .map_err(|err| SqliteBackendError::Db(err.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| SqliteBackendError::Db(err.to_string()));
        drop(statement);
        drop(guard);
        keys
    }

    /// Locks the shared connection.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, SqliteBackendError> {
        self.connection.lock().map_err(|_| SqliteBackendError::Db("mutex poisoned".to_string()))
    }

    /// Loads the value stored under `key`.
    fn load_value(&self, key: &str) -> Result<Option<String>, SqliteBackendError> {
        let value: Option<String> = {
            let guard = self.lock()?;
            guard
                .query_row("SELECT value FROM kv_entries WHERE key = ?1", params![key], |row| {
                    row.get(0)
                })
                .optional()
                .map_err(|err| SqliteBackendError::Db(err.to_string()))?
        };
        if let Some(value) = &value
            && value.len() > self.config.max_value_bytes
        {
            return Err(SqliteBackendError::Corrupt(format!(
                "{key} holds {} bytes (max {})",
                value.len(),
                self.config.max_value_bytes
            )));
        }
        Ok(value)
    }

    /// Stores or deletes the value under `key`.
    fn store_value(&self, key: &str, value: Option<&str>) -> Result<(), SqliteBackendError> {
        let guard = self.lock()?;
        match value {
            Some(value) => {
                if value.len() > self.config.max_value_bytes {
                    return Err(SqliteBackendError::TooLarge {
                        key: key.to_string(),
                        max_bytes: self.config.max_value_bytes,
                        actual_bytes: value.len(),
                    });
                }
                guard
                    .execute(
                        "INSERT INTO kv_entries (key, value, updated_at) VALUES (?1, ?2, ?3) ON \
                         CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = \
                         excluded.updated_at",
                        params![key, value, unix_millis()],
                    )
                    .map_err(|err| SqliteBackendError::Db(err.to_string()))?;
            }
            None => {
                guard
                    .execute("DELETE FROM kv_entries WHERE key = ?1", params![key])
                    .map_err(|err| SqliteBackendError::Db(err.to_string()))?;
            }
        }
        drop(guard);
        Ok(())
    }
}

#[async_trait]
impl KeyValueBackend for SqliteBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        let backend = self.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || backend.load_value(&key))
            .await
            .map_err(|err| BackendError::Io(format!("sqlite get join failed: {err}")))?
            .map_err(BackendError::from)
    }

    async fn set(&self, key: &str, value: Option<&str>) -> Result<(), BackendError> {
        let backend = self.clone();
        let key = key.to_string();
        let value = value.map(str::to_string);
        tokio::task::spawn_blocking(move || backend.store_value(&key, value.as_deref()))
            .await
            .map_err(|err| BackendError::Io(format!("sqlite set join failed: {err}")))?
            .map_err(BackendError::from)
    }
}

// ============================================================================//
// SECTION: Helpers
// ============================================================================//

/// Ensures the parent directory for the database exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteBackendError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteBackendError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteBackendError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteBackendError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteBackendError::Invalid("store path must not be empty".to_string()));
    }
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteBackendError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteBackendError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.is_dir() {
        return Err(SqliteBackendError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with the configured pragmas.
fn open_connection(config: &SqliteBackendConfig) -> Result<Connection, SqliteBackendError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| SqliteBackendError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| SqliteBackendError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| SqliteBackendError::Db(err.to_string()))?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteBackendError::Db(err.to_string()))?;
    Ok(connection)
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteBackendError> {
    let tx = connection.transaction().map_err(|err| SqliteBackendError::Db(err.to_string()))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteBackendError::Db(err.to_string()))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteBackendError::Db(err.to_string()))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| SqliteBackendError::Db(err.to_string()))?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS kv_entries (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL,
                    updated_at INTEGER NOT NULL
                );",
            )
            .map_err(|err| SqliteBackendError::Db(err.to_string()))?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteBackendError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(|err| SqliteBackendError::Db(err.to_string()))?;
    Ok(())
}

/// Returns the current time in milliseconds since the epoch.
fn unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|duration| i64::try_from(duration.as_millis()).ok())
        .unwrap_or(0)
}
