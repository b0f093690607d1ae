// crates/bookmarky-codec/src/codec.rs
// ============================================================================
// Module: Byte Codec
// Description: UTF-8 chunk encoding, reassembly, and byte length helpers.
// Purpose: Provide the pure transformation used by the chunked store.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! [`encode`] splits the UTF-8 bytes of a string into contiguous slices of at
//! most `max_chunk_size` bytes and [`decode`] concatenates such slices and
//! validates the result as UTF-8. [`byte_length`] and [`utf16_byte_length`]
//! size text before it is chunked.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// First UTF-16 code unit that needs two UTF-8 bytes.
const TWO_BYTE_START: u16 = 0x80;
/// Last UTF-16 code unit that needs two UTF-8 bytes.
const TWO_BYTE_END: u16 = 0x7FF;
/// First UTF-16 code unit that needs three UTF-8 bytes.
const THREE_BYTE_START: u16 = 0x800;
/// Leading (high) surrogate range.
const LEAD_SURROGATES: std::ops::RangeInclusive<u16> = 0xD800..=0xDBFF;
/// Trailing (low) surrogate range.
const TRAIL_SURROGATES: std::ops::RangeInclusive<u16> = 0xDC00..=0xDFFF;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Byte codec failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Caller supplied an argument outside the accepted domain.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Reassembled bytes are not valid UTF-8.
    #[error("reassembled chunks are not valid utf-8 (valid up to byte {valid_up_to})")]
    Decode {
        /// Offset of the first byte that failed validation.
        valid_up_to: usize,
    },
}

// ============================================================================
// SECTION: Encoding
// ============================================================================

/// Returns the number of chunks needed for `total_bytes` at `max_chunk_size`.
///
/// # Errors
///
/// Returns [`CodecError::InvalidArgument`] when `max_chunk_size` is zero.
pub fn chunk_count(total_bytes: usize, max_chunk_size: usize) -> Result<usize, CodecError> {
    if max_chunk_size == 0 {
        return Err(CodecError::InvalidArgument(
            "max_chunk_size must be greater than zero".to_string(),
        ));
    }
    Ok(total_bytes.div_ceil(max_chunk_size))
}

/// Splits the UTF-8 encoding of `text` into ordered chunks.
///
/// Produces `ceil(len / max_chunk_size)` buffers; empty text yields none.
///
/// # Errors
///
/// Returns [`CodecError::InvalidArgument`] when `max_chunk_size` is zero.
pub fn encode(text: &str, max_chunk_size: usize) -> Result<Vec<Vec<u8>>, CodecError> {
    let count = chunk_count(text.len(), max_chunk_size)?;
    let mut chunks = Vec::with_capacity(count);
    chunks.extend(text.as_bytes().chunks(max_chunk_size).map(<[u8]>::to_vec));
    Ok(chunks)
}

/// Concatenates `chunks` in order and decodes the bytes as UTF-8.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] when the concatenation is not valid UTF-8,
/// which is what out-of-order or damaged chunks look like.
pub fn decode<B: AsRef<[u8]>>(chunks: &[B]) -> Result<String, CodecError> {
    let total: usize = chunks.iter().map(|chunk| chunk.as_ref().len()).sum();
    let mut merged = Vec::with_capacity(total);
    for chunk in chunks {
        merged.extend_from_slice(chunk.as_ref());
    }
    String::from_utf8(merged).map_err(|err| CodecError::Decode {
        valid_up_to: err.utf8_error().valid_up_to(),
    })
}

// ============================================================================
// SECTION: Sizing
// ============================================================================

/// Returns the UTF-8 byte length of `text`.
#[must_use]
pub const fn byte_length(text: &str) -> usize {
    text.len()
}

/// Returns the UTF-8 byte length of text held as UTF-16 code units.
///
/// Scans from the end: each unit counts one byte, plus one for
/// `0x80..=0x7FF` and two for `0x800..=0xFFFF`. A trailing surrogate
/// swallows its leading surrogate so an astral character totals four bytes.
/// Unpaired surrogates count three bytes, the width of U+FFFD.
#[must_use]
pub fn utf16_byte_length(units: &[u16]) -> usize {
    let mut total = units.len();
    let mut index = units.len();
    while index > 0 {
        index -= 1;
        let unit = units[index];
        if (TWO_BYTE_START..=TWO_BYTE_END).contains(&unit) {
            total += 1;
        } else if unit >= THREE_BYTE_START {
            total += 2;
        }
        if TRAIL_SURROGATES.contains(&unit)
            && index > 0
            && LEAD_SURROGATES.contains(&units[index - 1])
        {
            index -= 1;
        }
    }
    total
}
