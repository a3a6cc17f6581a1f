//! Builders for synthetic Mobipocket containers used across the
//! integration tests.

#![allow(dead_code)]

pub const NULL_INDEX: u32 = 0xFFFF_FFFF;

const PDB_HEADER_LEN: usize = 78;
const MOBI_HEADER_LEN: u32 = 264;

/// Assemble a Palm database from finished record payloads.
pub fn build_book(records: &[Vec<u8>]) -> Vec<u8> {
    let dir_end = PDB_HEADER_LEN + records.len() * 8;
    let mut data = vec![0u8; dir_end];
    data[..9].copy_from_slice(b"test-book");
    data[60..68].copy_from_slice(b"BOOKMOBI");
    data[76..78].copy_from_slice(&(records.len() as u16).to_be_bytes());

    let mut offset = dir_end as u32;
    for (i, record) in records.iter().enumerate() {
        let pos = PDB_HEADER_LEN + i * 8;
        data[pos..pos + 4].copy_from_slice(&offset.to_be_bytes());
        // Directory uids are sequential even numbers.
        let uid = (i as u32) * 2;
        data[pos + 5..pos + 8].copy_from_slice(&uid.to_be_bytes()[1..]);
        offset += record.len() as u32;
    }
    for record in records {
        data.extend_from_slice(record);
    }
    data
}

/// Builder for Record 0: prefix, MOBI header, EXTH block and full name.
pub struct Record0Builder {
    compression: u16,
    text_length: u32,
    text_record_count: u16,
    encryption: u16,
    mobi_header: bool,
    version: u32,
    encoding: u32,
    locale: Option<u32>,
    extra_flags: Option<u16>,
    huff: Option<(u32, u32)>,
    image_index: Option<u32>,
    full_name: Option<String>,
    exth: Vec<(u32, Vec<u8>)>,
}

impl Record0Builder {
    pub fn new(compression: u16, text_length: u32, text_record_count: u16) -> Self {
        Record0Builder {
            compression,
            text_length,
            text_record_count,
            encryption: 0,
            mobi_header: false,
            version: 6,
            encoding: 1252,
            locale: None,
            extra_flags: None,
            huff: None,
            image_index: None,
            full_name: None,
            exth: Vec::new(),
        }
    }

    pub fn encryption(mut self, code: u16) -> Self {
        self.encryption = code;
        self
    }

    pub fn mobi_version(mut self, version: u32) -> Self {
        self.mobi_header = true;
        self.version = version;
        self
    }

    pub fn encoding(mut self, codepage: u32) -> Self {
        self.mobi_header = true;
        self.encoding = codepage;
        self
    }

    pub fn locale(mut self, locale: u32) -> Self {
        self.mobi_header = true;
        self.locale = Some(locale);
        self
    }

    pub fn extra_flags(mut self, flags: u16) -> Self {
        self.mobi_header = true;
        self.extra_flags = Some(flags);
        self
    }

    pub fn huff_records(mut self, index: u32, count: u32) -> Self {
        self.mobi_header = true;
        self.huff = Some((index, count));
        self
    }

    pub fn image_index(mut self, index: u32) -> Self {
        self.mobi_header = true;
        self.image_index = Some(index);
        self
    }

    pub fn full_name(mut self, name: &str) -> Self {
        self.mobi_header = true;
        self.full_name = Some(name.to_string());
        self
    }

    pub fn exth(mut self, tag: u32, payload: &[u8]) -> Self {
        self.mobi_header = true;
        self.exth.push((tag, payload.to_vec()));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut data = vec![0u8; 16];
        data[0..2].copy_from_slice(&self.compression.to_be_bytes());
        data[4..8].copy_from_slice(&self.text_length.to_be_bytes());
        data[8..10].copy_from_slice(&self.text_record_count.to_be_bytes());
        data[10..12].copy_from_slice(&4096u16.to_be_bytes());
        data[12..14].copy_from_slice(&self.encryption.to_be_bytes());

        if !self.mobi_header {
            return data;
        }

        // MOBI header body, with every index field defaulting to the
        // not-set sentinel like real writers emit.
        let mut body = vec![0u8; MOBI_HEADER_LEN as usize - 8];
        let set_u32 = |body: &mut [u8], offset: usize, value: u32| {
            body[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
        };
        for offset in [
            16, 20, 24, 28, // orth, infl, names, keys
            32, 36, 40, 44, 48, 52, // extra indices
            56, // non-text index
            84, // image index
            88, // huff index
            96, // datp records
            140, // unknown, not set
            144, 148, // drm offset / count
            176, 184, // fcis / flis
            200, // srcs
            220, // ncx
            224, 228, 232, 236, // fragment, skeleton, datp, guide
        ] {
            set_u32(&mut body, offset, NULL_INDEX);
        }
        set_u32(&mut body, 4, self.encoding);
        set_u32(&mut body, 12, self.version);
        set_u32(&mut body, 68, self.locale.unwrap_or(0));
        // first/last text record indices
        body[168..170].copy_from_slice(&1u16.to_be_bytes());
        body[170..172].copy_from_slice(&self.text_record_count.to_be_bytes());
        if let Some((index, count)) = self.huff {
            set_u32(&mut body, 88, index);
            set_u32(&mut body, 92, count);
        }
        if let Some(index) = self.image_index {
            set_u32(&mut body, 84, index);
        }
        if let Some(flags) = self.extra_flags {
            body[218..220].copy_from_slice(&flags.to_be_bytes());
        }
        if !self.exth.is_empty() {
            set_u32(&mut body, 104, 0x40);
        }

        let exth_block = if self.exth.is_empty() {
            Vec::new()
        } else {
            build_exth(&self.exth)
        };
        if let Some(name) = &self.full_name {
            let offset = 16 + MOBI_HEADER_LEN as usize + exth_block.len();
            set_u32(&mut body, 60, offset as u32);
            set_u32(&mut body, 64, name.len() as u32);
        }

        data.extend_from_slice(b"MOBI");
        data.extend_from_slice(&MOBI_HEADER_LEN.to_be_bytes());
        data.extend_from_slice(&body);
        data.extend_from_slice(&exth_block);
        if let Some(name) = &self.full_name {
            data.extend_from_slice(name.as_bytes());
            data.push(0);
            while data.len() % 4 != 0 {
                data.push(0);
            }
        }
        data
    }
}

fn build_exth(entries: &[(u32, Vec<u8>)]) -> Vec<u8> {
    let mut body = Vec::new();
    for (tag, payload) in entries {
        body.extend_from_slice(&tag.to_be_bytes());
        body.extend_from_slice(&((payload.len() + 8) as u32).to_be_bytes());
        body.extend_from_slice(payload);
    }
    let mut block = Vec::new();
    block.extend_from_slice(b"EXTH");
    block.extend_from_slice(&((body.len() + 12) as u32).to_be_bytes());
    block.extend_from_slice(&(entries.len() as u32).to_be_bytes());
    block.extend_from_slice(&body);
    while block.len() % 4 != 0 {
        block.push(0);
    }
    block
}

/// HUFF record where every 8-bit pattern is a terminal code and
/// `assignments` maps a leading byte to a symbol index.
pub fn build_huff(assignments: &[(u8, u32)]) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(b"HUFF");
    data.extend_from_slice(&24u32.to_be_bytes());
    data.extend_from_slice(&24u32.to_be_bytes());
    data.extend_from_slice(&(24u32 + 1024).to_be_bytes());
    for byte in 0u32..256 {
        let symbol = assignments
            .iter()
            .find(|(b, _)| u32::from(*b) == byte)
            .map_or(0, |(_, s)| *s);
        let word = (byte + symbol) << 8 | 0x80 | 8;
        data.extend_from_slice(&word.to_be_bytes());
    }
    for _ in 0..32 {
        data.extend_from_slice(&0u32.to_be_bytes());
        data.extend_from_slice(&0x00ff_ffffu32.to_be_bytes());
    }
    data
}

/// CDIC record holding the given literal symbols.
pub fn build_cdic(symbols: &[&[u8]], code_length: u32) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(b"CDIC");
    data.extend_from_slice(&16u32.to_be_bytes());
    data.extend_from_slice(&(symbols.len() as u32).to_be_bytes());
    data.extend_from_slice(&code_length.to_be_bytes());

    let table_len = symbols.len() * 2;
    let mut offsets = Vec::new();
    let mut entries = Vec::new();
    for bytes in symbols {
        offsets.push((table_len + entries.len()) as u16);
        entries.extend_from_slice(&(bytes.len() as u16 | 0x8000).to_be_bytes());
        entries.extend_from_slice(bytes);
    }
    for offset in offsets {
        data.extend_from_slice(&offset.to_be_bytes());
    }
    data.extend_from_slice(&entries);
    data
}

/// FONT resource record wrapping `font`, optionally XOR-obfuscated and
/// deflated.
pub fn build_font_record(font: &[u8], xor_key: Option<&[u8]>, zlib: bool) -> Vec<u8> {
    use flate2::Compression;
    use flate2::write::ZlibEncoder;
    use std::io::Write;

    const FONT_HEADER_LEN: usize = 24;

    let mut payload = if zlib {
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(font).unwrap();
        enc.finish().unwrap()
    } else {
        font.to_vec()
    };
    let key = xor_key.unwrap_or(&[]);
    let flags = u32::from(zlib) | u32::from(!key.is_empty()) << 1;
    if !key.is_empty() {
        for (i, byte) in payload.iter_mut().take(1040).enumerate() {
            *byte ^= key[i % key.len()];
        }
    }
    let data_offset = FONT_HEADER_LEN + key.len();

    let mut data = Vec::new();
    data.extend_from_slice(b"FONT");
    data.extend_from_slice(&(font.len() as u32).to_be_bytes());
    data.extend_from_slice(&flags.to_be_bytes());
    data.extend_from_slice(&(data_offset as u32).to_be_bytes());
    data.extend_from_slice(&(key.len() as u32).to_be_bytes());
    data.extend_from_slice(&(FONT_HEADER_LEN as u32).to_be_bytes());
    data.extend_from_slice(key);
    data.extend_from_slice(&payload);
    data
}

/// AUDI/VIDE media record with the standard 12-byte header.
pub fn build_media_record(magic: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(magic);
    data.extend_from_slice(&12u32.to_be_bytes());
    data.extend_from_slice(&[0; 4]);
    data.extend_from_slice(body);
    data
}
