mod common;

use common::{Record0Builder, build_book, build_cdic, build_huff};
use kindling::{Error, Mobi};

#[test]
fn palmdoc_document() {
    // Compressed form of "Hi there": literal run, literals and a
    // space-prefix byte.
    let compressed = vec![0x02, b'H', b'i', 0xF4, b'h', b'e', b'r', b'e'];
    let record0 = Record0Builder::new(2, 8, 1).build();
    let book = build_book(&[record0, compressed]);

    let doc = Mobi::from_bytes(&book).unwrap();
    assert_eq!(doc.parse_text().unwrap(), "Hi there");
}

#[test]
fn palmdoc_with_back_reference() {
    // "abcabc": three literals then a back-reference (distance 3,
    // length 3).
    let word: u16 = (3 << 3) | 0;
    let compressed = vec![b'a', b'b', b'c', 0x80 | (word >> 8) as u8, word as u8];
    let record0 = Record0Builder::new(2, 6, 1).build();
    let book = build_book(&[record0, compressed]);

    let doc = Mobi::from_bytes(&book).unwrap();
    assert_eq!(doc.parse_text().unwrap(), "abcabc");
}

#[test]
fn corrupt_palmdoc_reported() {
    // A back-reference with an empty output window.
    let word: u16 = (5 << 3) | 0;
    let compressed = vec![0x80 | (word >> 8) as u8, word as u8];
    let record0 = Record0Builder::new(2, 8, 1).build();
    let book = build_book(&[record0, compressed]);

    let doc = Mobi::from_bytes(&book).unwrap();
    assert!(matches!(doc.parse_text(), Err(Error::DataCorrupt(_))));
}

#[test]
fn unknown_compression_rejected() {
    let record0 = Record0Builder::new(9, 4, 1).build();
    let book = build_book(&[record0, b"text".to_vec()]);

    let doc = Mobi::from_bytes(&book).unwrap();
    assert!(matches!(doc.parse_text(), Err(Error::DataCorrupt(_))));
}

#[test]
fn trailers_stripped_before_decompression() {
    // extra_flags bit 1: a three-byte trailing section (two data bytes
    // plus the backward varint 0x83) follows the compressed text.
    let mut record = vec![0x02, b'H', b'i'];
    record.extend_from_slice(&[0xAA, 0xBB, 0x83]);
    let record0 = Record0Builder::new(2, 2, 1).extra_flags(0b10).build();
    let book = build_book(&[record0, record]);

    let doc = Mobi::from_bytes(&book).unwrap();
    assert_eq!(doc.parse_text().unwrap(), "Hi");
}

#[test]
fn multibyte_trailer_stripped() {
    // Bit 0: the final byte's low two bits give the multibyte count - 1.
    let mut record = b"plain".to_vec();
    record.extend_from_slice(&[0xE4, 0x01]);
    let record0 = Record0Builder::new(1, 5, 1).extra_flags(0b1).build();
    let book = build_book(&[record0, record]);

    let doc = Mobi::from_bytes(&book).unwrap();
    assert_eq!(doc.parse_text().unwrap(), "plain");
}

#[test]
fn oversized_trailer_is_corrupt() {
    // The varint claims more bytes than the record holds.
    let record = vec![b'a', 0x90];
    let record0 = Record0Builder::new(1, 1, 1).extra_flags(0b10).build();
    let book = build_book(&[record0, record]);

    let doc = Mobi::from_bytes(&book).unwrap();
    assert!(matches!(doc.parse_text(), Err(Error::DataCorrupt(_))));
}

#[test]
fn huffcdic_document() {
    // Every code is eight bits wide, so the "compressed" text is the
    // byte stream itself; the dictionary maps H->0, i->1.
    let huff = build_huff(&[(b'H', 0), (b'i', 1)]);
    let cdic = build_cdic(&[b"H", b"i"], 1);
    let record0 = Record0Builder::new(17480, 2, 1).huff_records(2, 2).build();
    let book = build_book(&[record0, b"Hi".to_vec(), huff, cdic]);

    let doc = Mobi::from_bytes(&book).unwrap();
    assert_eq!(doc.parse_text().unwrap(), "Hi");
}

#[test]
fn huffcdic_multiple_text_records() {
    let huff = build_huff(&[(b'a', 0), (b'b', 1)]);
    let cdic = build_cdic(&[b"a", b"b"], 1);
    let record0 = Record0Builder::new(17480, 5, 2).huff_records(3, 2).build();
    let book = build_book(&[record0, b"ab".to_vec(), b"aba".to_vec(), huff, cdic]);

    let doc = Mobi::from_bytes(&book).unwrap();
    assert_eq!(doc.parse_text().unwrap(), "ababa");
}

#[test]
fn huffcdic_missing_dictionary_is_corrupt() {
    // Compression says HUFF/CDIC but the header points at no records.
    let record0 = Record0Builder::new(17480, 2, 1).mobi_version(6).build();
    let book = build_book(&[record0, b"Hi".to_vec()]);

    let doc = Mobi::from_bytes(&book).unwrap();
    assert!(matches!(doc.parse_text(), Err(Error::DataCorrupt(_))));
}
