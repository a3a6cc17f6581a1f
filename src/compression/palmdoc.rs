//! PalmDOC decompression.
//!
//! A byte-level LZ77 variant with a space-run shortcut, used by the bulk
//! of legacy MOBI files. Each input byte selects one of four actions:
//! literal, literal run, two-byte back-reference, or space plus an ASCII
//! character.

use crate::buffer::Buffer;
use crate::error::{Error, Result};

/// Decompress one PalmDOC text record. `limit` caps the output size
/// (text records never exceed 4096 bytes); exceeding it is reported as
/// [`Error::BufferEnd`], an illegal back-reference as
/// [`Error::DataCorrupt`].
pub fn decompress(input: &[u8], limit: usize) -> Result<Vec<u8>> {
    let mut buf = Buffer::new(input);
    let mut out = Vec::with_capacity(limit.min(input.len() * 2));

    while !buf.is_empty() {
        let byte = buf.get_u8()?;
        match byte {
            // Single literal.
            0x00 | 0x09..=0x7F => {
                push(&mut out, byte, limit)?;
            }
            // Copy the next 1..=8 input bytes verbatim.
            0x01..=0x08 => {
                let run = buf.get_bytes(byte as usize)?;
                if out.len() + run.len() > limit {
                    return Err(Error::BufferEnd);
                }
                out.extend_from_slice(run);
            }
            // Two-byte back-reference into the output window.
            0x80..=0xBF => {
                let next = buf.get_u8()?;
                let word = u16::from(byte & 0x3F) << 8 | u16::from(next);
                let distance = (word >> 3) as usize;
                let length = (word & 0x07) as usize + 3;
                if distance == 0 || distance > out.len() {
                    return Err(Error::corrupt(format!(
                        "back-reference distance {distance} into {} bytes of output",
                        out.len()
                    )));
                }
                // Byte-wise forward copy so a distance of 1 expands runs.
                let start = out.len() - distance;
                for i in 0..length {
                    let b = out[start + i];
                    push(&mut out, b, limit)?;
                }
            }
            // Space followed by the byte with its high bit cleared.
            0xC0..=0xFF => {
                push(&mut out, b' ', limit)?;
                push(&mut out, byte ^ 0x80, limit)?;
            }
        }
    }

    Ok(out)
}

fn push(out: &mut Vec<u8>, byte: u8, limit: usize) -> Result<()> {
    if out.len() >= limit {
        return Err(Error::BufferEnd);
    }
    out.push(byte);
    Ok(())
}
