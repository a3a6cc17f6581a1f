//! EXTH extended metadata block.
//!
//! The block sits right after the MOBI header when bit 6 of `exth_flags`
//! is set: an `EXTH` magic, a declared length, a record count, then
//! `(tag, length, payload)` entries where the length includes the 8-byte
//! entry header. Tags repeat freely (multiple authors, subjects), so the
//! parsed form is an ordered multi-map. The block is padded to a 4-byte
//! boundary after the last entry; the padding is not parsed.

use log::debug;

use crate::buffer::Buffer;
use crate::encoding::cp1252_to_utf8;
use crate::error::{Error, Result};
use crate::headers::TextEncoding;

/// Well-known EXTH tag ids used elsewhere in the crate.
pub mod tags {
    pub const TITLE: u32 = 99;
    pub const AUTHOR: u32 = 100;
    pub const PUBLISHER: u32 = 101;
    pub const DESCRIPTION: u32 = 103;
    pub const ISBN: u32 = 104;
    pub const SUBJECT: u32 = 105;
    pub const PUBLISHING_DATE: u32 = 106;
    pub const RIGHTS: u32 = 109;
    pub const KF8_BOUNDARY: u32 = 121;
    pub const COVER_OFFSET: u32 = 201;
    pub const THUMB_OFFSET: u32 = 202;
    pub const DOC_TYPE: u32 = 501;
    pub const UPDATED_TITLE: u32 = 503;
    pub const LANGUAGE: u32 = 524;
}

/// Declared payload type of an EXTH tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExthType {
    Numeric,
    String,
    Binary,
}

/// Static metadata describing a known EXTH tag.
#[derive(Debug, Clone, Copy)]
pub struct ExthTagMeta {
    pub tag: u32,
    pub kind: ExthType,
    pub name: &'static str,
}

/// One raw EXTH entry.
#[derive(Debug, Clone)]
pub struct ExthRecord {
    pub tag: u32,
    pub data: Vec<u8>,
}

/// Decoded EXTH payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ExthValue {
    Numeric(u32),
    String(String),
    Binary(Vec<u8>),
}

macro_rules! exth_meta {
    ($($tag:expr, $kind:ident, $name:expr;)*) => {
        &[$(ExthTagMeta { tag: $tag, kind: ExthType::$kind, name: $name }),*]
    };
}

/// Registry of known EXTH tags, their payload types and display names.
pub static EXTH_TAGS: &[ExthTagMeta] = exth_meta![
    // numeric
    115, Numeric, "Sample";
    116, Numeric, "Start offset";
    121, Numeric, "K8 boundary offset";
    125, Numeric, "K8 count of resources, fonts, images";
    131, Numeric, "RESC offset";
    201, Numeric, "Cover offset";
    202, Numeric, "Thumbnail offset";
    203, Numeric, "Has fake cover";
    204, Numeric, "Creator software";
    205, Numeric, "Creator major version";
    206, Numeric, "Creator minor version";
    207, Numeric, "Creator build number";
    401, Numeric, "Clipping limit";
    402, Numeric, "Publisher limit";
    404, Numeric, "Text to Speech disabled";
    406, Numeric, "Rental indicator";
    // strings
    1, String, "Drm server id";
    2, String, "Drm commerce id";
    3, String, "Drm Ebookbase book id";
    99, String, "Title";
    100, String, "Creator";
    101, String, "Publisher";
    102, String, "Imprint";
    103, String, "Description";
    104, String, "ISBN";
    105, String, "Subject";
    106, String, "Published";
    107, String, "Review";
    108, String, "Contributor";
    109, String, "Rights";
    110, String, "Subject code";
    111, String, "Type";
    112, String, "Source";
    113, String, "ASIN";
    114, String, "Version number";
    117, String, "Adult";
    118, String, "Price";
    119, String, "Currency";
    122, String, "Fixed layout";
    123, String, "Book type";
    124, String, "Orientation lock";
    126, String, "Original resolution";
    127, String, "Zero gutter";
    128, String, "Zero margin";
    129, String, "K8 masthead/cover image";
    132, String, "Region magnification";
    200, String, "Dictionary short name";
    208, String, "Watermark";
    501, String, "Document type";
    502, String, "Last update time";
    503, String, "Updated title";
    504, String, "ASIN (504)";
    508, String, "Title file as";
    517, String, "Creator file as";
    522, String, "Publisher file as";
    524, String, "Language";
    525, String, "Primary writing mode";
    527, String, "Page progression direction";
    528, String, "Override Kindle fonts";
    529, String, "Original source description";
    534, String, "Unknown (534)";
    535, String, "Kindlegen BuildRev number";
    // binary
    209, Binary, "Tamper proof keys";
    300, Binary, "Font signature";
    403, Binary, "Unknown (403)";
    405, Binary, "Unknown (405)";
    407, Binary, "Unknown (407)";
    450, Binary, "Unknown (450)";
    451, Binary, "Unknown (451)";
    452, Binary, "Unknown (452)";
    453, Binary, "Unknown (453)";
];

/// Look up the static descriptor for a tag.
pub fn tag_meta(tag: u32) -> Option<&'static ExthTagMeta> {
    EXTH_TAGS.iter().find(|meta| meta.tag == tag)
}

/// Parse an EXTH block starting at `data` (the byte right after the MOBI
/// header).
pub fn parse_exth(data: &[u8]) -> Result<Vec<ExthRecord>> {
    let mut buf = Buffer::new(data);
    if buf.get_bytes(4)? != b"EXTH" {
        return Err(Error::corrupt("bad EXTH magic"));
    }
    let header_length = buf.get_u32()? as usize;
    let record_count = buf.get_u32()?;
    if header_length > data.len() {
        return Err(Error::corrupt("EXTH length exceeds record"));
    }

    let mut records = Vec::with_capacity(record_count.min(1024) as usize);
    for i in 0..record_count {
        let tag = buf.get_u32()?;
        let length = buf.get_u32()? as usize;
        // Entry length includes its own 8-byte header.
        let payload = length.checked_sub(8).ok_or_else(|| {
            debug!("EXTH record {i} declares length {length}");
            Error::corrupt(format!("EXTH record {i} too short"))
        })?;
        let data = buf.get_bytes(payload)?.to_vec();
        records.push(ExthRecord { tag, data });
    }
    Ok(records)
}

/// Decode a numeric EXTH payload: big-endian, clamped to four bytes.
pub fn decode_numeric(data: &[u8]) -> u32 {
    let mut val = 0u32;
    for &byte in data.iter().take(4) {
        val = val << 8 | u32::from(byte);
    }
    val
}

/// Decode a string EXTH payload according to the document encoding.
pub fn decode_string(data: &[u8], encoding: TextEncoding) -> Result<String> {
    match encoding {
        TextEncoding::Cp1252 => cp1252_to_utf8(data),
        _ => Ok(String::from_utf8_lossy(data).into_owned()),
    }
}

impl ExthRecord {
    /// Decode the payload using the static tag registry. Tags missing from
    /// the registry are retained as binary.
    pub fn decode(&self, encoding: TextEncoding) -> Result<ExthValue> {
        let kind = tag_meta(self.tag).map_or(ExthType::Binary, |meta| meta.kind);
        Ok(match kind {
            ExthType::Numeric => ExthValue::Numeric(decode_numeric(&self.data)),
            ExthType::String => ExthValue::String(decode_string(&self.data, encoding)?),
            ExthType::Binary => ExthValue::Binary(self.data.clone()),
        })
    }
}
