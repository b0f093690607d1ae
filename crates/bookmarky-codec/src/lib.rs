// crates/bookmarky-codec/src/lib.rs
// ============================================================================
// Module: Bookmarky Codec Library
// Description: Byte-level chunking of UTF-8 text into bounded buffers.
// Purpose: Split serialized collections into backend-sized chunks and back.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Bookmarky Codec turns a string into an ordered run of byte buffers no
//! larger than a caller-chosen chunk size, and reassembles such a run back
//! into the original string.
//! Invariants:
//! - Chunk boundaries are byte boundaries over the UTF-8 encoding; a
//!   multi-byte character may straddle two chunks.
//! - Every chunk except the last is exactly the chunk size.
//! - Decoding only happens after full concatenation, so a straddling
//!   character is restored intact when the chunks arrive in order.
//!
//! The codec performs no I/O and holds no state.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod codec;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use codec::CodecError;
pub use codec::byte_length;
pub use codec::chunk_count;
pub use codec::decode;
pub use codec::encode;
pub use codec::utf16_byte_length;
