// crates/bookmarky-codec/tests/proptest_codec.rs
// ============================================================================
// Module: Byte Codec Property-Based Tests
// Description: Property tests for round trips and chunk bounds.
// Purpose: Detect boundary bugs across arbitrary unicode input.
// ============================================================================

//! Property-based tests for codec invariants.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use bookmarky_codec::decode;
use bookmarky_codec::encode;
use bookmarky_codec::utf16_byte_length;
use proptest::prelude::*;

proptest! {
    #[test]
    fn decode_inverts_encode(text in any::<String>(), max in 1usize .. 64) {
        let chunks = encode(&text, max).unwrap();
        prop_assert_eq!(decode(&chunks).unwrap(), text);
    }

    #[test]
    fn chunks_respect_size_bound(text in any::<String>(), max in 1usize .. 64) {
        let chunks = encode(&text, max).unwrap();
        prop_assert_eq!(chunks.len(), text.len().div_ceil(max));
        if let Some((last, full)) = chunks.split_last() {
            prop_assert!(!last.is_empty());
            prop_assert!(last.len() <= max);
            for chunk in full {
                prop_assert_eq!(chunk.len(), max);
            }
        }
    }

    #[test]
    fn utf16_scan_agrees_with_lossy_decoding(units in prop::collection::vec(any::<u16>(), 0 .. 64)) {
        let lossy = String::from_utf16_lossy(&units);
        prop_assert_eq!(utf16_byte_length(&units), lossy.len());
    }
}
