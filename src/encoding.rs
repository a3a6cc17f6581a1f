//! Strict CP1252 to UTF-8 conversion for metadata strings.
//!
//! CP1252 coincides with Latin-1 except for the 0x80..0x9F range, which
//! Windows assigns to typographic punctuation. Five slots in that range
//! are unassigned; encountering one is treated as corruption rather than
//! silently substituted.

use crate::error::{Error, Result};

/// UTF-8 expansions for CP1252 bytes 0x80..0x9F. Empty entries are the
/// unassigned slots (0x81, 0x8D, 0x8F, 0x90, 0x9D).
static CP1252_TO_UTF8: [&[u8]; 32] = [
    &[0xe2, 0x82, 0xac], // 0x80 euro sign
    &[],
    &[0xe2, 0x80, 0x9a], // 0x82 single low quote
    &[0xc6, 0x92],       // 0x83 f with hook
    &[0xe2, 0x80, 0x9e], // 0x84 double low quote
    &[0xe2, 0x80, 0xa6], // 0x85 ellipsis
    &[0xe2, 0x80, 0xa0], // 0x86 dagger
    &[0xe2, 0x80, 0xa1], // 0x87 double dagger
    &[0xcb, 0x86],       // 0x88 circumflex accent
    &[0xe2, 0x80, 0xb0], // 0x89 per mille
    &[0xc5, 0xa0],       // 0x8A S with caron
    &[0xe2, 0x80, 0xb9], // 0x8B single left angle quote
    &[0xc5, 0x92],       // 0x8C OE ligature
    &[],
    &[0xc5, 0xbd], // 0x8E Z with caron
    &[],
    &[],
    &[0xe2, 0x80, 0x98], // 0x91 left single quote
    &[0xe2, 0x80, 0x99], // 0x92 right single quote
    &[0xe2, 0x80, 0x9c], // 0x93 left double quote
    &[0xe2, 0x80, 0x9d], // 0x94 right double quote
    &[0xe2, 0x80, 0xa2], // 0x95 bullet
    &[0xe2, 0x80, 0x93], // 0x96 en dash
    &[0xe2, 0x80, 0x94], // 0x97 em dash
    &[0xcb, 0x9c],       // 0x98 small tilde
    &[0xe2, 0x84, 0xa2], // 0x99 trade mark
    &[0xc5, 0xa1],       // 0x9A s with caron
    &[0xe2, 0x80, 0xba], // 0x9B single right angle quote
    &[0xc5, 0x93],       // 0x9C oe ligature
    &[],
    &[0xc5, 0xbe], // 0x9E z with caron
    &[0xc5, 0xb8], // 0x9F Y with diaeresis
];

/// Convert CP1252 bytes to a UTF-8 string. Conversion stops at the first
/// NUL; the output needs at most 3x the input length.
pub fn cp1252_to_utf8(input: &[u8]) -> Result<String> {
    let mut out = Vec::with_capacity(3 * input.len() + 1);
    for &byte in input {
        match byte {
            0 => break,
            b if b < 0x80 => out.push(b),
            b if b < 0xa0 => {
                let expansion = CP1252_TO_UTF8[(b - 0x80) as usize];
                if expansion.is_empty() {
                    return Err(Error::corrupt(format!("unassigned CP1252 byte 0x{b:02x}")));
                }
                out.extend_from_slice(expansion);
            }
            b if b < 0xc0 => {
                out.push(0xc2);
                out.push(b);
            }
            b => {
                out.push(0xc3);
                out.push((b & 0x3f) | 0x80);
            }
        }
    }
    // Every code path above emits well-formed UTF-8 sequences.
    String::from_utf8(out).map_err(|_| Error::corrupt("CP1252 conversion produced invalid UTF-8"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Reference inverse over the convertible range, for the round-trip
    /// property below.
    fn utf8_to_cp1252(s: &str) -> Vec<u8> {
        let mut out = Vec::new();
        for c in s.chars() {
            let code = c as u32;
            if code < 0x80 {
                out.push(code as u8);
            } else if (0xa0..0x100).contains(&code) {
                out.push(code as u8);
            } else {
                let mut utf8 = [0u8; 4];
                let encoded = c.encode_utf8(&mut utf8).as_bytes().to_vec();
                let byte = CP1252_TO_UTF8
                    .iter()
                    .position(|e| *e == encoded.as_slice())
                    .expect("not a CP1252 character");
                out.push(0x80 + byte as u8);
            }
        }
        out
    }

    #[test]
    fn test_ascii_passthrough() {
        assert_eq!(cp1252_to_utf8(b"Hello, world").unwrap(), "Hello, world");
    }

    #[test]
    fn test_stops_at_nul() {
        assert_eq!(cp1252_to_utf8(b"abc\0def").unwrap(), "abc");
    }

    #[test]
    fn test_punctuation_range() {
        assert_eq!(cp1252_to_utf8(&[0x92]).unwrap(), "\u{2019}");
        assert_eq!(cp1252_to_utf8(&[0x80]).unwrap(), "\u{20ac}");
        assert_eq!(cp1252_to_utf8(&[0x85]).unwrap(), "\u{2026}");
    }

    #[test]
    fn test_latin1_ranges() {
        assert_eq!(cp1252_to_utf8(&[0xa9]).unwrap(), "\u{a9}");
        assert_eq!(cp1252_to_utf8(&[0xe9]).unwrap(), "\u{e9}");
        assert_eq!(cp1252_to_utf8(&[0xff]).unwrap(), "\u{ff}");
    }

    #[test]
    fn test_unassigned_bytes_rejected() {
        for byte in [0x81u8, 0x8d, 0x8f, 0x90, 0x9d] {
            assert!(matches!(
                cp1252_to_utf8(&[byte]),
                Err(Error::DataCorrupt(_))
            ));
        }
    }

    proptest! {
        #[test]
        fn roundtrip_printable_range(bytes in proptest::collection::vec(0x20u8..=0xff, 0..64)) {
            prop_assume!(!bytes.iter().any(|b| matches!(b, 0x81 | 0x8d | 0x8f | 0x90 | 0x9d)));
            let utf8 = cp1252_to_utf8(&bytes).unwrap();
            prop_assert_eq!(utf8_to_cp1252(&utf8), bytes);
        }
    }
}
