//! Record 0 parsing: the PalmDOC prefix and the variable-length MOBI
//! header.
//!
//! The MOBI header declares its own length and has grown incrementally
//! over format revisions, so every field after the length word is
//! optional: a field exists only if it fits inside the declared length.
//! Fields that do exist may still hold the `NULL_INDEX` sentinel meaning
//! "no such record". Both states are preserved: `None` for a field absent
//! from the file, `Some(NULL_INDEX)` for a field present but not set.

use crate::buffer::Buffer;
use crate::error::{Error, Result};

/// Sentinel for "no such record" in MOBI header fields.
pub const NULL_INDEX: u32 = 0xFFFF_FFFF;

/// Maximum size of an uncompressed text record.
pub const TEXT_RECORD_SIZE: usize = 4096;

/// Offset of the MOBI header within Record 0.
pub const MOBI_HEADER_OFFSET: usize = 16;

/// Minimum declared MOBI header length.
const MOBI_HEADER_MIN_LEN: u32 = 24;

/// Text compression scheme from the Record 0 prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    PalmDoc,
    HuffCdic,
    Unknown(u16),
}

impl From<u16> for Compression {
    fn from(code: u16) -> Self {
        match code {
            1 => Compression::None,
            2 => Compression::PalmDoc,
            17480 => Compression::HuffCdic,
            n => Compression::Unknown(n),
        }
    }
}

/// Encryption scheme from the Record 0 prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encryption {
    None,
    OldMobipocket,
    Mobipocket,
    Unknown(u16),
}

impl From<u16> for Encryption {
    fn from(code: u16) -> Self {
        match code {
            0 => Encryption::None,
            1 => Encryption::OldMobipocket,
            2 => Encryption::Mobipocket,
            n => Encryption::Unknown(n),
        }
    }
}

/// Text encoding declared in the MOBI header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Cp1252,
    Utf8,
    Unknown(u32),
}

impl From<u32> for TextEncoding {
    fn from(code: u32) -> Self {
        match code {
            1252 => TextEncoding::Cp1252,
            65001 => TextEncoding::Utf8,
            n => TextEncoding::Unknown(n),
        }
    }
}

/// Fixed 16-byte PalmDOC prefix of Record 0.
#[derive(Debug, Clone)]
pub struct Record0Header {
    pub compression: Compression,
    /// Uncompressed length of the entire book text.
    pub text_length: u32,
    /// Number of PDB records holding the text.
    pub text_record_count: u16,
    /// Maximum uncompressed size of each text record, always 4096.
    pub text_record_size: u16,
    pub encryption: Encryption,
}

/// Variable-length MOBI header following the Record 0 prefix.
///
/// Every field is optional; see the module docs for the
/// absent/present/not-set distinction.
#[derive(Debug, Clone, Default)]
pub struct MobiHeader {
    /// Declared header length, counted from the `MOBI` magic.
    pub header_length: u32,
    pub mobi_type: Option<u32>,
    pub text_encoding: Option<u32>,
    pub uid: Option<u32>,
    pub version: Option<u32>,
    pub orth_index: Option<u32>,
    pub infl_index: Option<u32>,
    pub names_index: Option<u32>,
    pub keys_index: Option<u32>,
    pub extra_index: [Option<u32>; 6],
    pub non_text_index: Option<u32>,
    /// Offset of the full book name within Record 0.
    pub full_name_offset: Option<u32>,
    pub full_name_length: Option<u32>,
    pub locale: Option<u32>,
    pub dict_input_lang: Option<u32>,
    pub dict_output_lang: Option<u32>,
    pub min_version: Option<u32>,
    /// First record holding an image resource.
    pub image_index: Option<u32>,
    pub huff_rec_index: Option<u32>,
    pub huff_rec_count: Option<u32>,
    pub datp_rec_index: Option<u32>,
    pub datp_rec_count: Option<u32>,
    pub exth_flags: Option<u32>,
    pub drm_offset: Option<u32>,
    pub drm_count: Option<u32>,
    pub drm_size: Option<u32>,
    pub drm_flags: Option<u32>,
    pub first_text_index: Option<u16>,
    pub last_text_index: Option<u16>,
    /// KF8 reading of the two text-index words.
    pub fdst_index: Option<u32>,
    pub fdst_section_count: Option<u32>,
    pub fcis_index: Option<u32>,
    pub fcis_count: Option<u32>,
    pub flis_index: Option<u32>,
    pub flis_count: Option<u32>,
    pub srcs_index: Option<u32>,
    pub srcs_count: Option<u32>,
    /// Bitfield describing trailing data appended to text records.
    pub extra_flags: Option<u16>,
    pub ncx_index: Option<u32>,
    /// KF8 fragment index record.
    pub fragment_index: Option<u32>,
    /// KF8 skeleton index record.
    pub skeleton_index: Option<u32>,
    pub datp_index: Option<u32>,
    /// KF8 guide index record.
    pub guide_index: Option<u32>,
}

/// True when an optional header field is present and not the `NULL_INDEX`
/// sentinel.
pub fn is_set(field: Option<u32>) -> bool {
    matches!(field, Some(v) if v != NULL_INDEX)
}

impl MobiHeader {
    /// Offset within Record 0 of the first byte past the MOBI header.
    /// The EXTH block, when flagged, starts here.
    pub fn end_offset(&self) -> usize {
        MOBI_HEADER_OFFSET + self.header_length as usize
    }

    /// Bit 6 of `exth_flags` announces an EXTH block.
    pub fn has_exth(&self) -> bool {
        self.exth_flags.is_some_and(|f| f & 0x40 != 0)
    }

    pub fn encoding(&self) -> TextEncoding {
        // CP1252 is the historical default for documents predating the
        // encoding field.
        self.text_encoding.map_or(TextEncoding::Cp1252, TextEncoding::from)
    }
}

/// Parse Record 0: the fixed prefix, then the MOBI header if the `MOBI`
/// magic follows.
pub fn parse_record0(data: &[u8]) -> Result<(Record0Header, Option<MobiHeader>)> {
    let mut buf = Buffer::new(data);
    let compression = Compression::from(buf.get_u16()?);
    buf.seek(2)?; // unused
    let text_length = buf.get_u32()?;
    let text_record_count = buf.get_u16()?;
    let text_record_size = buf.get_u16()?;
    let encryption = Encryption::from(buf.get_u16()?);
    buf.seek(2)?; // unknown, usually zero

    let record0 = Record0Header {
        compression,
        text_length,
        text_record_count,
        text_record_size,
        encryption,
    };

    if buf.remaining() < 8 {
        return Ok((record0, None));
    }
    let mut probe = buf.clone();
    if probe.get_bytes(4)? != b"MOBI" {
        return Ok((record0, None));
    }

    let mobi = parse_mobi_header(&mut buf)?;
    Ok((record0, Some(mobi)))
}

fn parse_mobi_header(buf: &mut Buffer<'_>) -> Result<MobiHeader> {
    buf.seek(4)?; // magic, verified by the caller
    let header_length = buf.get_u32()?;
    if header_length < MOBI_HEADER_MIN_LEN {
        return Err(Error::corrupt(format!("MOBI header length {header_length} below minimum")));
    }
    let body_len = header_length as usize - 8;
    if body_len > buf.remaining() {
        return Err(Error::corrupt("MOBI header length exceeds record"));
    }
    // Fields exist only while the declared length has room for them; a
    // sub-buffer of exactly that length makes each read self-limiting.
    let mut buf = buf.take(body_len)?;

    let mut header = MobiHeader {
        header_length,
        ..MobiHeader::default()
    };
    header.mobi_type = opt_u32(&mut buf);
    header.text_encoding = opt_u32(&mut buf);
    header.uid = opt_u32(&mut buf);
    header.version = opt_u32(&mut buf);
    header.orth_index = opt_u32(&mut buf);
    header.infl_index = opt_u32(&mut buf);
    header.names_index = opt_u32(&mut buf);
    header.keys_index = opt_u32(&mut buf);
    for slot in &mut header.extra_index {
        *slot = opt_u32(&mut buf);
    }
    header.non_text_index = opt_u32(&mut buf);
    header.full_name_offset = opt_u32(&mut buf);
    header.full_name_length = opt_u32(&mut buf);
    header.locale = opt_u32(&mut buf);
    header.dict_input_lang = opt_u32(&mut buf);
    header.dict_output_lang = opt_u32(&mut buf);
    header.min_version = opt_u32(&mut buf);
    header.image_index = opt_u32(&mut buf);
    header.huff_rec_index = opt_u32(&mut buf);
    header.huff_rec_count = opt_u32(&mut buf);
    header.datp_rec_index = opt_u32(&mut buf);
    header.datp_rec_count = opt_u32(&mut buf);
    header.exth_flags = opt_u32(&mut buf);
    skip(&mut buf, 32); // unknown
    skip(&mut buf, 4); // unknown, NULL_INDEX
    header.drm_offset = opt_u32(&mut buf);
    header.drm_count = opt_u32(&mut buf);
    header.drm_size = opt_u32(&mut buf);
    header.drm_flags = opt_u32(&mut buf);
    skip(&mut buf, 8); // unknown
    header.first_text_index = opt_u16(&mut buf);
    header.last_text_index = opt_u16(&mut buf);
    // KF8 documents reuse those four bytes as the FDST record number.
    header.fdst_index = match (header.first_text_index, header.last_text_index) {
        (Some(hi), Some(lo)) => Some(u32::from(hi) << 16 | u32::from(lo)),
        _ => None,
    };
    header.fdst_section_count = opt_u32(&mut buf);
    header.fcis_index = opt_u32(&mut buf);
    header.fcis_count = opt_u32(&mut buf);
    header.flis_index = opt_u32(&mut buf);
    header.flis_count = opt_u32(&mut buf);
    skip(&mut buf, 8); // unknown
    header.srcs_index = opt_u32(&mut buf);
    header.srcs_count = opt_u32(&mut buf);
    skip(&mut buf, 8); // unknown
    skip(&mut buf, 2); // fill
    header.extra_flags = opt_u16(&mut buf);
    header.ncx_index = opt_u32(&mut buf);
    header.fragment_index = opt_u32(&mut buf);
    header.skeleton_index = opt_u32(&mut buf);
    header.datp_index = opt_u32(&mut buf);
    header.guide_index = opt_u32(&mut buf);

    Ok(header)
}

fn opt_u32(buf: &mut Buffer<'_>) -> Option<u32> {
    if buf.remaining() >= 4 { buf.get_u32().ok() } else { None }
}

fn opt_u16(buf: &mut Buffer<'_>) -> Option<u16> {
    if buf.remaining() >= 2 { buf.get_u16().ok() } else { None }
}

fn skip(buf: &mut Buffer<'_>, n: usize) {
    let n = n.min(buf.remaining());
    let _ = buf.seek(n);
}
