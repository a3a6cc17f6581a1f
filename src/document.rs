//! The logical Mobipocket document.
//!
//! [`Mobi`] owns the raw record sequence and the parsed headers, and is
//! the entry point for every query. A hybrid file carries two complete
//! header sets (legacy KF7 and KF8) over one shared record array; the
//! document models that as two halves with an active-half selector, KF8
//! first by default.

use std::io::Write;
use std::path::Path;

use log::{debug, warn};

use crate::compression::{HuffCdic, palmdoc};
use crate::encoding::cp1252_to_utf8;
use crate::error::{Error, Result};
use crate::exth::{self, ExthRecord, tags};
use crate::headers::{
    self, Compression, Encryption, MobiHeader, NULL_INDEX, Record0Header, TEXT_RECORD_SIZE,
    TextEncoding, is_set,
};
use crate::locale;
use crate::pdb::{self, PdbHeader, PdbRecord};
use crate::record::strip_trailers;
use crate::resource::{self, Filetype};

/// One Record 0 header set: the fixed prefix, the optional MOBI header
/// and the EXTH records that follow it.
#[derive(Debug, Clone)]
struct Half {
    record0: Record0Header,
    mobi: Option<MobiHeader>,
    exth: Vec<ExthRecord>,
}

/// A reconstructed resource part: images raw, fonts and media decoded.
#[derive(Debug, Clone)]
pub struct Resource {
    /// Sequence number of the source record.
    pub seq: usize,
    /// Stable record uid.
    pub uid: u32,
    pub kind: Filetype,
    pub data: Vec<u8>,
}

/// A parsed Mobipocket document.
#[derive(Debug, Clone)]
pub struct Mobi {
    pdb: PdbHeader,
    records: Vec<PdbRecord>,
    active: Half,
    /// The inactive half of a hybrid file.
    other: Option<Half>,
    /// Sequence number of the BOUNDARY record of a hybrid file.
    kf8_boundary: Option<u32>,
    use_kf8: bool,
}

impl Mobi {
    /// Parse a document from a complete in-memory file image.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let pdb = PdbHeader::parse(data)?;
        let records = pdb::parse_records(data, pdb.record_count)?;
        let legacy = parse_half(&records, 0)?;

        let mut doc = Mobi {
            pdb,
            records,
            active: legacy,
            other: None,
            kf8_boundary: None,
            use_kf8: true,
        };

        // A KF8 boundary promotes the second header set to the active
        // half; failures here degrade to the legacy view instead of
        // aborting, the headers parsed so far stay valid.
        if let Some(boundary) = doc.locate_kf8_boundary() {
            match parse_half(&doc.records, boundary as usize + 1) {
                Ok(kf8) => {
                    let legacy = std::mem::replace(&mut doc.active, kf8);
                    doc.other = Some(legacy);
                    doc.kf8_boundary = Some(boundary);
                }
                Err(e) => warn!("unreadable KF8 header in hybrid file: {e}"),
            }
        }

        Ok(doc)
    }

    /// Parse a document read from `path`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_bytes(&std::fs::read(path)?)
    }

    /// Parse a document from any reader.
    pub fn from_reader<R: std::io::Read>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes(&data)
    }

    /// EXTH tag 121 names the record after the BOUNDARY marker; verify
    /// the marker before trusting it.
    fn locate_kf8_boundary(&self) -> Option<u32> {
        let record = self.exth_by_tag(tags::KF8_BOUNDARY)?;
        let rec_number = exth::decode_numeric(&record.data);
        if rec_number == NULL_INDEX {
            return None;
        }
        let boundary = rec_number.checked_sub(1)?;
        match self.record_by_seq(boundary as usize) {
            Some(record) if record.data.starts_with(b"BOUNDARY") => Some(boundary),
            _ => {
                debug!("EXTH KF8 boundary {rec_number} does not point past a BOUNDARY record");
                None
            }
        }
    }

    // --- halves -----------------------------------------------------------

    /// True when the file carries both KF7 and KF8 header sets.
    pub fn is_hybrid(&self) -> bool {
        self.kf8_boundary.is_some()
    }

    /// Record offset of the active half's sections: KF8 sections of a
    /// hybrid are shifted past the boundary, KF7 sections start at zero.
    pub fn kf8_offset(&self) -> usize {
        match self.kf8_boundary {
            Some(boundary) if self.use_kf8 => boundary as usize + 1,
            _ => 0,
        }
    }

    /// Sequence number of the BOUNDARY record of a hybrid file.
    pub fn kf8_boundary_seqnumber(&self) -> Option<u32> {
        self.kf8_boundary
    }

    /// Exchange the active and inactive halves of a hybrid file. No-op
    /// otherwise. Calling it twice restores the initial view.
    pub fn swap_halves(&mut self) {
        if let Some(other) = &mut self.other {
            std::mem::swap(&mut self.active, other);
            self.use_kf8 = !self.use_kf8;
        }
    }

    /// Select the modern KF8 half of a hybrid file. Idempotent.
    pub fn use_kf8(&mut self) {
        if !self.use_kf8 {
            self.swap_halves();
            self.use_kf8 = true;
        }
    }

    /// Select the legacy KF7 half of a hybrid file. Idempotent.
    pub fn use_kf7(&mut self) {
        if self.use_kf8 {
            self.swap_halves();
            self.use_kf8 = false;
        }
    }

    // --- records ----------------------------------------------------------

    /// Palm database header of the container.
    pub fn pdb_header(&self) -> &PdbHeader {
        &self.pdb
    }

    /// All records in on-disk order.
    pub fn records(&self) -> &[PdbRecord] {
        &self.records
    }

    /// Record with the given sequence number (the first record is 0).
    pub fn record_by_seq(&self, seq: usize) -> Option<&PdbRecord> {
        self.records.get(seq)
    }

    /// Record with the given directory uid.
    pub fn record_by_uid(&self, uid: u32) -> Option<&PdbRecord> {
        self.records.iter().find(|record| record.uid == uid)
    }

    /// Remove a record and release its payload. Later records shift down
    /// one sequence number; uids are unaffected.
    pub fn delete_record_by_seq(&mut self, seq: usize) -> Result<()> {
        if seq >= self.records.len() {
            return Err(Error::ParamError("record sequence number out of range"));
        }
        self.records.remove(seq);
        Ok(())
    }

    // --- header queries ---------------------------------------------------

    /// Document format version; 1 for ancient files without a MOBI
    /// header.
    pub fn file_version(&self) -> u32 {
        self.active
            .mobi
            .as_ref()
            .and_then(|mh| mh.version)
            .unwrap_or(1)
    }

    pub fn compression(&self) -> Compression {
        self.active.record0.compression
    }

    pub fn encryption(&self) -> Encryption {
        self.active.record0.encryption
    }

    pub fn encoding(&self) -> TextEncoding {
        self.active
            .mobi
            .as_ref()
            .map_or(TextEncoding::Cp1252, MobiHeader::encoding)
    }

    /// Packed Mobipocket locale number from the MOBI header.
    pub fn locale_number(&self) -> u32 {
        self.active
            .mobi
            .as_ref()
            .and_then(|mh| mh.locale)
            .unwrap_or(0)
    }

    /// Locale subtag for the document language, if the locale number is
    /// known.
    pub fn locale(&self) -> Option<&'static str> {
        locale::locale_string(self.locale_number())
    }

    /// Full book name stored in Record 0, decoded to UTF-8.
    pub fn full_name(&self) -> Result<String> {
        let mh = self
            .active
            .mobi
            .as_ref()
            .ok_or(Error::ParamError("document has no MOBI header"))?;
        let (offset, length) = match (mh.full_name_offset, mh.full_name_length) {
            (Some(offset), Some(length)) => (offset as usize, length as usize),
            _ => return Err(Error::ParamError("document has no full name")),
        };
        let record0 = self
            .record_by_seq(self.kf8_offset())
            .ok_or(Error::ParamError("missing Record 0"))?;
        let raw = record0
            .data
            .get(offset..offset + length)
            .ok_or(Error::BufferEnd)?;
        match self.encoding() {
            TextEncoding::Cp1252 => cp1252_to_utf8(raw),
            _ => Ok(String::from_utf8_lossy(raw).into_owned()),
        }
    }

    /// Upper bound of the decompressed text size.
    pub fn text_maxsize(&self) -> usize {
        self.active.record0.text_record_count as usize * TEXT_RECORD_SIZE
    }

    // --- predicates -------------------------------------------------------

    /// True when the PDB type/creator pair is `BOOK`/`MOBI`.
    pub fn is_mobipocket(&self) -> bool {
        self.pdb.type_ == pdb::PDB_TYPE_BOOK && self.pdb.creator == pdb::PDB_CREATOR_MOBI
    }

    /// True when the text records are DRM-protected.
    pub fn is_encrypted(&self) -> bool {
        self.is_mobipocket()
            && matches!(
                self.active.record0.encryption,
                Encryption::OldMobipocket | Encryption::Mobipocket
            )
    }

    pub fn exists_mobi_header(&self) -> bool {
        self.active.mobi.is_some()
    }

    pub fn exists_fdst(&self) -> bool {
        let Some(mh) = self.active.mobi.as_ref() else {
            return false;
        };
        if self.file_version() >= 8 {
            is_set(mh.fdst_index)
        } else {
            mh.fdst_section_count.is_some_and(|count| count > 1)
        }
    }

    /// Sequence number of the FDST record, resolved against the active
    /// half.
    pub fn fdst_record_number(&self) -> Option<u32> {
        let mh = self.active.mobi.as_ref()?;
        if self.file_version() >= 8 && is_set(mh.fdst_index) {
            return mh.fdst_index.map(|index| index + self.kf8_offset() as u32);
        }
        if mh.fdst_section_count.is_some_and(|count| count > 1) {
            // Old documents keep the flow table where the last text
            // record index lives.
            return mh.last_text_index.map(u32::from);
        }
        None
    }

    pub fn exists_skel_index(&self) -> bool {
        self.mobi_field_set(|mh| mh.skeleton_index)
    }

    pub fn exists_frag_index(&self) -> bool {
        self.mobi_field_set(|mh| mh.fragment_index)
    }

    pub fn exists_guide_index(&self) -> bool {
        self.mobi_field_set(|mh| mh.guide_index)
    }

    pub fn exists_ncx(&self) -> bool {
        self.mobi_field_set(|mh| mh.ncx_index)
    }

    pub fn exists_orth(&self) -> bool {
        self.mobi_field_set(|mh| mh.orth_index)
    }

    fn mobi_field_set(&self, field: impl Fn(&MobiHeader) -> Option<u32>) -> bool {
        self.active.mobi.as_ref().is_some_and(|mh| is_set(field(mh)))
    }

    // --- EXTH -------------------------------------------------------------

    /// All EXTH records of the active half, in file order.
    pub fn exth_records(&self) -> &[ExthRecord] {
        &self.active.exth
    }

    /// First EXTH record with the given tag.
    pub fn exth_by_tag(&self, tag: u32) -> Option<&ExthRecord> {
        self.active.exth.iter().find(|record| record.tag == tag)
    }

    /// Every EXTH record with the given tag; tags repeat freely.
    pub fn exth_all(&self, tag: u32) -> impl Iterator<Item = &ExthRecord> {
        self.active.exth.iter().filter(move |record| record.tag == tag)
    }

    // --- text -------------------------------------------------------------

    /// Decompress the whole text flow and convert it to UTF-8.
    pub fn parse_text(&self) -> Result<String> {
        let mut raw = Vec::with_capacity(self.active.record0.text_length as usize);
        self.decompress_text(|chunk| {
            raw.extend_from_slice(chunk);
            Ok(())
        })?;
        match self.encoding() {
            TextEncoding::Cp1252 => cp1252_to_utf8(&raw),
            _ => Ok(String::from_utf8_lossy(&raw).into_owned()),
        }
    }

    /// Stream the raw decompressed text bytes into `sink` without
    /// re-encoding.
    pub fn dump_text<W: Write>(&self, sink: &mut W) -> Result<()> {
        self.decompress_text(|chunk| {
            sink.write_all(chunk)?;
            Ok(())
        })
    }

    fn decompress_text(&self, mut sink: impl FnMut(&[u8]) -> Result<()>) -> Result<()> {
        if self.is_encrypted() {
            return Err(Error::FileEncrypted);
        }
        let record0 = &self.active.record0;
        if record0.text_record_count == 0 {
            return Err(Error::corrupt("no text records"));
        }
        let extra_flags = self
            .active
            .mobi
            .as_ref()
            .and_then(|mh| mh.extra_flags)
            .unwrap_or(0);

        enum Codec {
            Raw,
            PalmDoc,
            Huff(HuffCdic),
        }
        let codec = match record0.compression {
            Compression::None => Codec::Raw,
            Compression::PalmDoc => Codec::PalmDoc,
            Compression::HuffCdic => Codec::Huff(self.load_huffcdic()?),
            Compression::Unknown(code) => {
                return Err(Error::corrupt(format!("unknown compression type {code}")));
            }
        };

        let offset = self.kf8_offset();
        for i in 0..record0.text_record_count as usize {
            let seq = 1 + offset + i;
            let record = self
                .record_by_seq(seq)
                .ok_or_else(|| Error::corrupt(format!("text record {seq} missing")))?;
            let payload = strip_trailers(&record.data, extra_flags)?;
            match &codec {
                Codec::Raw => {
                    if payload.len() > TEXT_RECORD_SIZE {
                        return Err(Error::corrupt(format!("text record {seq} oversized")));
                    }
                    sink(payload)?;
                }
                Codec::PalmDoc => sink(&palmdoc::decompress(payload, TEXT_RECORD_SIZE)?)?,
                Codec::Huff(codec) => sink(&codec.decompress(payload, TEXT_RECORD_SIZE)?)?,
            }
        }
        Ok(())
    }

    /// Load the HUFF record and its CDIC companions for the active half.
    fn load_huffcdic(&self) -> Result<HuffCdic> {
        let mh = self
            .active
            .mobi
            .as_ref()
            .ok_or(Error::ParamError("document has no MOBI header"))?;
        let index = match mh.huff_rec_index {
            Some(index) if index != NULL_INDEX => index as usize,
            _ => return Err(Error::corrupt("Huffman compression without HUFF record")),
        };
        let count = mh.huff_rec_count.unwrap_or(0) as usize;
        if count < 2 {
            return Err(Error::corrupt("Huffman compression without CDIC records"));
        }
        let start = index + self.kf8_offset();
        let huff = self
            .record_by_seq(start)
            .ok_or_else(|| Error::corrupt("HUFF record missing"))?;
        let cdics = (1..count)
            .map(|i| {
                self.record_by_seq(start + i)
                    .map(|record| record.data.as_slice())
                    .ok_or_else(|| Error::corrupt(format!("CDIC record {i} missing")))
            })
            .collect::<Result<Vec<_>>>()?;
        HuffCdic::parse(&huff.data, &cdics)
    }

    // --- resources --------------------------------------------------------

    /// Sequence number of the first resource record. For a hybrid viewed
    /// as KF8, resources are listed in the legacy half's header.
    pub fn first_resource_record(&self) -> Option<usize> {
        if self.is_hybrid() && self.use_kf8
            && let Some(other) = &self.other
            && let Some(mh) = &other.mobi
            && is_set(mh.image_index)
        {
            return mh.image_index.map(|index| index as usize);
        }
        let mh = self.active.mobi.as_ref()?;
        if is_set(mh.image_index) {
            mh.image_index.map(|index| index as usize)
        } else {
            None
        }
    }

    /// Walk the resource records, classify them, and decode FONT and
    /// AUDI/VIDE wrappers. Stops at the BOUNDARY / end-of-file sentinel.
    /// Records that fail to decode are skipped, not fatal.
    pub fn resources(&self) -> Vec<Resource> {
        let Some(first) = self.first_resource_record() else {
            return Vec::new();
        };
        let mut parts = Vec::new();
        for seq in first..self.records.len() {
            let record = &self.records[seq];
            match resource::classify(&record.data) {
                Filetype::Break => break,
                Filetype::Font => match resource::decode_font(&record.data) {
                    Ok((data, kind)) => parts.push(Resource {
                        seq,
                        uid: record.uid,
                        kind,
                        data,
                    }),
                    Err(e) => warn!("skipping undecodable font record {seq}: {e}"),
                },
                Filetype::Audio => match resource::decode_audio(&record.data) {
                    Ok(data) => parts.push(Resource {
                        seq,
                        uid: record.uid,
                        kind: Filetype::Mp3,
                        data,
                    }),
                    Err(e) => warn!("skipping undecodable audio record {seq}: {e}"),
                },
                Filetype::Video => match resource::decode_video(&record.data) {
                    Ok(data) => parts.push(Resource {
                        seq,
                        uid: record.uid,
                        kind: Filetype::Mpg,
                        data,
                    }),
                    Err(e) => warn!("skipping undecodable video record {seq}: {e}"),
                },
                Filetype::Unknown => {
                    debug!("record {seq} is not a resource");
                }
                kind => parts.push(Resource {
                    seq,
                    uid: record.uid,
                    kind,
                    data: record.data.clone(),
                }),
            }
        }
        parts
    }
}

fn parse_half(records: &[PdbRecord], seq: usize) -> Result<Half> {
    let record0 = records
        .get(seq)
        .ok_or_else(|| Error::corrupt(format!("Record 0 missing at {seq}")))?;
    let (record0_header, mobi) = headers::parse_record0(&record0.data)?;

    // EXTH problems leave the metadata empty but keep the document
    // usable for text.
    let exth = match &mobi {
        Some(mh) if mh.has_exth() => {
            let start = mh.end_offset();
            match record0.data.get(start..) {
                Some(block) => exth::parse_exth(block).unwrap_or_else(|e| {
                    warn!("discarding unparsable EXTH block: {e}");
                    Vec::new()
                }),
                None => {
                    warn!("EXTH flagged but MOBI header fills Record 0");
                    Vec::new()
                }
            }
        }
        _ => Vec::new(),
    };

    Ok(Half {
        record0: record0_header,
        mobi,
        exth,
    })
}
