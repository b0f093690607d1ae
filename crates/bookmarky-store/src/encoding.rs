// crates/bookmarky-store/src/encoding.rs
// ============================================================================
// Module: Chunk Value Encoding
// Description: String forms used to store binary chunk payloads.
// Purpose: Map codec byte buffers to backend string values and back.
// Dependencies: base64, serde, serde_json
// ============================================================================

//! ## Overview
//! Backends hold strings, so each chunk payload is written either as a JSON
//! array of byte values or as standard base64. Readers accept both forms:
//! a value starting with `[` is a JSON byte array, anything else is base64.
//! The empty-collection marker is always [`EMPTY_CHUNK_VALUE`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Stored value marking an initialized, empty collection.
pub const EMPTY_CHUNK_VALUE: &str = "[]";

// ============================================================================
// SECTION: Encoding
// ============================================================================

/// Stored string form of a chunk payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkEncoding {
    /// JSON array of byte values, e.g. `[91,123]`.
    #[default]
    JsonBytes,
    /// Standard padded base64.
    Base64,
}

impl ChunkEncoding {
    /// Encodes a payload into its stored string form.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] when the byte array cannot be serialized.
    pub fn encode(self, payload: &[u8]) -> Result<String, serde_json::Error> {
        match self {
            Self::JsonBytes => serde_json::to_string(payload),
            Self::Base64 => Ok(STANDARD.encode(payload)),
        }
    }

    /// Returns the longest stored value a payload of `chunk_size` can produce.
    #[must_use]
    pub const fn max_stored_len(self, chunk_size: usize) -> usize {
        match self {
            Self::JsonBytes => {
                if chunk_size == 0 {
                    EMPTY_CHUNK_VALUE.len()
                } else {
                    chunk_size.saturating_mul(4).saturating_add(1)
                }
            }
            Self::Base64 => chunk_size.div_ceil(3).saturating_mul(4),
        }
    }

    /// Returns the configuration label for this encoding.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::JsonBytes => "json_bytes",
            Self::Base64 => "base64",
        }
    }
}

/// Decodes a stored value written in either encoding.
///
/// # Errors
///
/// Returns a description of the failure when the value is neither a JSON
/// byte array nor valid base64.
pub fn decode_stored(value: &str) -> Result<Vec<u8>, String> {
    if value.trim_start().starts_with('[') {
        serde_json::from_str::<Vec<u8>>(value).map_err(|err| err.to_string())
    } else {
        STANDARD.decode(value.trim()).map_err(|err| err.to_string())
    }
}
