//! Resource record classification and decoding.
//!
//! Non-text records are discriminated by magic bytes: images are stored
//! raw, fonts are obfuscated and usually deflated, audio and video are
//! wrapped with a small offset header. A BOUNDARY record or the
//! end-of-file marker terminates the resource range.

use std::io::Read;

use flate2::read::ZlibDecoder;
use log::debug;

use crate::buffer::Buffer;
use crate::error::{Error, Result};

/// FONT record header: magic, decoded size, flags, data offset, XOR key
/// length, XOR key offset.
const FONT_HEADER_LEN: usize = 24;

/// AUDI/VIDE header: magic, offset, four unknown bytes.
const MEDIA_HEADER_LEN: usize = 12;

/// Only the first 1040 bytes of a font payload are obfuscated.
const FONT_OBFUSCATED_LEN: usize = 1040;

/// End-of-file marker record.
const EOF_MAGIC: &[u8] = b"\xe9\x8e\x0d\x0a";

/// Types of files reconstructed from database records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filetype {
    Unknown,
    // markup
    Html,
    Css,
    Svg,
    Opf,
    Ncx,
    // images
    Jpg,
    Gif,
    Png,
    Bmp,
    // fonts
    Otf,
    Ttf,
    // media
    Mp3,
    Mpg,
    Pdf,
    // containers that need decoding
    Font,
    Audio,
    Video,
    /// End-of-resources sentinel (BOUNDARY or EOF record).
    Break,
}

/// Extension and MIME type for a file type.
#[derive(Debug, Clone, Copy)]
pub struct FileMeta {
    pub kind: Filetype,
    pub extension: &'static str,
    pub mime_type: &'static str,
}

static FILE_META: &[FileMeta] = &[
    FileMeta { kind: Filetype::Html, extension: "html", mime_type: "application/xhtml+xml" },
    FileMeta { kind: Filetype::Css, extension: "css", mime_type: "text/css" },
    FileMeta { kind: Filetype::Svg, extension: "svg", mime_type: "image/svg+xml" },
    FileMeta { kind: Filetype::Jpg, extension: "jpg", mime_type: "image/jpeg" },
    FileMeta { kind: Filetype::Gif, extension: "gif", mime_type: "image/gif" },
    FileMeta { kind: Filetype::Png, extension: "png", mime_type: "image/png" },
    FileMeta { kind: Filetype::Bmp, extension: "bmp", mime_type: "image/bmp" },
    FileMeta { kind: Filetype::Otf, extension: "otf", mime_type: "application/vnd.ms-opentype" },
    FileMeta { kind: Filetype::Ttf, extension: "ttf", mime_type: "application/x-font-truetype" },
    FileMeta { kind: Filetype::Mp3, extension: "mp3", mime_type: "audio/mpeg" },
    FileMeta { kind: Filetype::Mpg, extension: "mpg", mime_type: "video/mpeg" },
    FileMeta { kind: Filetype::Pdf, extension: "pdf", mime_type: "application/pdf" },
    FileMeta { kind: Filetype::Opf, extension: "opf", mime_type: "application/oebps-package+xml" },
    FileMeta { kind: Filetype::Ncx, extension: "ncx", mime_type: "application/x-dtbncx+xml" },
];

const UNKNOWN_META: FileMeta = FileMeta {
    kind: Filetype::Unknown,
    extension: "dat",
    mime_type: "application/unknown",
};

/// Static extension/MIME lookup for a file type.
pub fn file_meta(kind: Filetype) -> &'static FileMeta {
    FILE_META
        .iter()
        .find(|meta| meta.kind == kind)
        .unwrap_or(&UNKNOWN_META)
}

/// Classify a resource record by its magic bytes.
pub fn classify(data: &[u8]) -> Filetype {
    if data.starts_with(b"\xff\xd8\xff") {
        Filetype::Jpg
    } else if data.starts_with(b"GIF8") {
        Filetype::Gif
    } else if data.starts_with(b"\x89PNG\x0d\x0a\x1a\x0a") {
        Filetype::Png
    } else if data.starts_with(b"FONT") {
        Filetype::Font
    } else if data.starts_with(b"BOUNDARY") || data.starts_with(EOF_MAGIC) {
        Filetype::Break
    } else if data.starts_with(b"BM") && bmp_size(data) == Some(data.len()) {
        Filetype::Bmp
    } else if data.starts_with(b"AUDI") {
        Filetype::Audio
    } else if data.starts_with(b"VIDE") {
        Filetype::Video
    } else {
        Filetype::Unknown
    }
}

/// BMP headers embed the file size as a little-endian word; a match
/// against the record size confirms the type.
fn bmp_size(data: &[u8]) -> Option<usize> {
    let bytes = data.get(2..6)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize)
}

/// Classify decoded font bytes by their signature.
pub fn font_type(data: &[u8]) -> Filetype {
    if data.starts_with(b"OTTO") {
        Filetype::Otf
    } else if data.starts_with(b"\x00\x01\x00\x00") || data.starts_with(b"true") {
        Filetype::Ttf
    } else {
        Filetype::Unknown
    }
}

/// Decode a FONT record: undo the XOR obfuscation, inflate when the zlib
/// flag is set, and verify the declared size.
///
/// Returns the font bytes and their detected type.
pub fn decode_font(data: &[u8]) -> Result<(Vec<u8>, Filetype)> {
    if data.len() < FONT_HEADER_LEN {
        return Err(Error::corrupt("font record too short"));
    }
    let mut buf = Buffer::new(data);
    if buf.get_bytes(4)? != b"FONT" {
        return Err(Error::corrupt("bad FONT magic"));
    }
    let decoded_size = buf.get_u32()? as usize;
    let flags = buf.get_u32()?;
    let data_offset = buf.get_u32()? as usize;
    let xor_key_len = buf.get_u32()? as usize;
    let xor_data_offset = buf.get_u32()? as usize;

    let zlib_flag = flags & 0x01 != 0;
    let xor_flag = flags & 0x02 != 0;

    if data_offset >= data.len() {
        return Err(Error::corrupt("font data offset beyond record"));
    }
    let mut payload = data[data_offset..].to_vec();

    if xor_flag {
        let key_end = xor_data_offset
            .checked_add(xor_key_len)
            .filter(|&end| end <= data.len())
            .ok_or_else(|| Error::corrupt("font XOR key beyond record"))?;
        let key = &data[xor_data_offset..key_end];
        if key.is_empty() {
            return Err(Error::corrupt("empty font XOR key"));
        }
        for (i, byte) in payload.iter_mut().take(FONT_OBFUSCATED_LEN).enumerate() {
            *byte ^= key[i % key.len()];
        }
    }

    let font = if zlib_flag {
        let mut decoded = Vec::with_capacity(decoded_size);
        ZlibDecoder::new(payload.as_slice())
            .read_to_end(&mut decoded)
            .map_err(|e| {
                debug!("font inflate failed: {e}");
                Error::corrupt("font resource decompression failed")
            })?;
        if decoded.len() != decoded_size {
            return Err(Error::corrupt(format!(
                "decompressed font size {} differs from declared {decoded_size}",
                decoded.len()
            )));
        }
        decoded
    } else {
        payload
    };

    let kind = font_type(&font);
    Ok((font, kind))
}

/// Decode an AUDI record, returning the raw MP3 stream.
pub fn decode_audio(data: &[u8]) -> Result<Vec<u8>> {
    decode_media(data, b"AUDI")
}

/// Decode a VIDE record, returning the raw MPEG stream.
pub fn decode_video(data: &[u8]) -> Result<Vec<u8>> {
    decode_media(data, b"VIDE")
}

fn decode_media(data: &[u8], magic: &[u8; 4]) -> Result<Vec<u8>> {
    if data.len() < MEDIA_HEADER_LEN {
        return Err(Error::corrupt("media record too short"));
    }
    let mut buf = Buffer::new(data);
    if buf.get_bytes(4)? != magic {
        return Err(Error::corrupt("bad media magic"));
    }
    // The offset is usually 12; the four bytes after it are unknown.
    let offset = buf.get_u32()? as usize;
    if offset > data.len() {
        return Err(Error::corrupt("media offset beyond record"));
    }
    Ok(data[offset..].to_vec())
}
