//! Palm Database container parsing.
//!
//! A Mobipocket file is a Palm database: a 78-byte header, a record
//! directory of 8-byte entries, then the record payloads back to back.
//! Record sizes are not stored; they are the differences between
//! consecutive directory offsets, with the last record running to the end
//! of the file.

use log::debug;

use crate::buffer::Buffer;
use crate::error::{Error, Result};

/// Length of the fixed Palm database header.
pub const PDB_HEADER_LEN: usize = 78;

/// Database type of Mobipocket files.
pub const PDB_TYPE_BOOK: &str = "BOOK";
/// Creator id of Mobipocket files.
pub const PDB_CREATOR_MOBI: &str = "MOBI";

/// Seconds between the Mac epoch (1904-01-01) and the Unix epoch.
const EPOCH_MAC_DIFF: i64 = 2_082_844_800;

/// Parsed Palm database header.
#[derive(Debug, Clone)]
pub struct PdbHeader {
    /// Database name, NUL-trimmed (usually the abbreviated title).
    pub name: String,
    pub attributes: u16,
    pub version: u16,
    pub ctime: u32,
    pub mtime: u32,
    pub btime: u32,
    pub mod_num: u32,
    pub appinfo_offset: u32,
    pub sortinfo_offset: u32,
    /// Database type, `"BOOK"` for Mobipocket.
    pub type_: String,
    /// Creator id, `"MOBI"` for Mobipocket.
    pub creator: String,
    pub uid: u32,
    pub next_rec: u32,
    pub record_count: u16,
}

impl PdbHeader {
    /// Parse the fixed 78-byte header. Rejects containers whose
    /// type/creator pair is not `BOOK`/`MOBI`.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < PDB_HEADER_LEN {
            return Err(Error::corrupt("PDB header too short"));
        }
        let mut buf = Buffer::new(data);
        let name = buf.get_string(32)?;
        let attributes = buf.get_u16()?;
        let version = buf.get_u16()?;
        let ctime = buf.get_u32()?;
        let mtime = buf.get_u32()?;
        let btime = buf.get_u32()?;
        let mod_num = buf.get_u32()?;
        let appinfo_offset = buf.get_u32()?;
        let sortinfo_offset = buf.get_u32()?;
        let type_ = buf.get_string(4)?;
        let creator = buf.get_string(4)?;
        let uid = buf.get_u32()?;
        let next_rec = buf.get_u32()?;
        let record_count = buf.get_u16()?;

        if type_ != PDB_TYPE_BOOK || creator != PDB_CREATOR_MOBI {
            return Err(Error::FileUnsupported(format!("{type_}{creator}")));
        }

        Ok(PdbHeader {
            name,
            attributes,
            version,
            ctime,
            mtime,
            btime,
            mod_num,
            appinfo_offset,
            sortinfo_offset,
            type_,
            creator,
            uid,
            next_rec,
            record_count,
        })
    }

    /// Creation time as seconds since the Unix epoch.
    pub fn created_unix(&self) -> i64 {
        pdb_time_to_unix(self.ctime)
    }

    /// Modification time as seconds since the Unix epoch.
    pub fn modified_unix(&self) -> i64 {
        pdb_time_to_unix(self.mtime)
    }
}

/// Convert a PDB timestamp to Unix seconds.
///
/// Older files store seconds since the Mac 1904 epoch, newer ones since the
/// Unix epoch. Bit 31 set means Mac epoch.
pub fn pdb_time_to_unix(time: u32) -> i64 {
    if time & 0x8000_0000 != 0 {
        i64::from(time) - EPOCH_MAC_DIFF
    } else {
        i64::from(time)
    }
}

/// One Palm database record: directory metadata plus its owned payload.
#[derive(Debug, Clone)]
pub struct PdbRecord {
    /// Byte offset of the payload within the original file.
    pub offset: u32,
    pub attributes: u8,
    /// Stable unique id from the directory (usually sequential even
    /// numbers).
    pub uid: u32,
    pub data: Vec<u8>,
}

/// Parse the record directory following the header and materialize all
/// record payloads in on-disk order.
pub fn parse_records(data: &[u8], count: u16) -> Result<Vec<PdbRecord>> {
    let mut buf = Buffer::new(data);
    buf.seek(PDB_HEADER_LEN)?;

    let mut records = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let offset = buf.get_u32()?;
        let attributes = buf.get_u8()?;
        let uid = buf.get_u24()?;
        records.push(PdbRecord {
            offset,
            attributes,
            uid,
            data: Vec::new(),
        });
    }

    // Derive sizes from consecutive offsets; the last record extends to
    // the end of the file.
    for i in 0..records.len() {
        let start = records[i].offset as usize;
        let end = if i + 1 < records.len() {
            records[i + 1].offset as usize
        } else {
            data.len()
        };
        if start > end || end > data.len() {
            debug!("record {i} offsets {start}..{end} exceed file length {}", data.len());
            return Err(Error::corrupt(format!("record {i} directory offsets out of order")));
        }
        records[i].data = data[start..end].to_vec();
    }

    Ok(records)
}
