//! Text decompression engines: PalmDOC LZ77 and HUFF/CDIC Huffman.

pub mod huffcdic;
pub mod palmdoc;

pub use huffcdic::HuffCdic;
