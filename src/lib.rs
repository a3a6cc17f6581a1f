//! # kindling
//!
//! A decoder for Mobipocket ebooks: the MOBI/AZW family built on the Palm
//! Database container, covering legacy KF7, KF8 (AZW3) and hybrid files.
//!
//! ## Features
//!
//! - PalmDOC (LZ77) and HUFF/CDIC (Huffman) text decompression
//! - EXTH metadata with the full known-tag registry
//! - Hybrid KF7/KF8 files exposed as two switchable halves
//! - Resource extraction: images, obfuscated fonts, audio and video
//! - Strict CP1252 to UTF-8 conversion and locale resolution
//!
//! Encrypted documents are detected and rejected; their metadata stays
//! readable.
//!
//! ## Quick Start
//!
//! ```no_run
//! use kindling::Mobi;
//!
//! let doc = Mobi::from_path("book.mobi")?;
//! println!("{} ({})", doc.full_name()?, doc.file_version());
//!
//! // Decompressed markup flow
//! let html = doc.parse_text()?;
//!
//! // Embedded resources
//! for part in doc.resources() {
//!     let meta = kindling::resource::file_meta(part.kind);
//!     println!("record {}: {} bytes ({})", part.seq, part.data.len(), meta.extension);
//! }
//! # Ok::<(), kindling::Error>(())
//! ```
//!
//! Hybrid files parse to the modern KF8 half by default:
//!
//! ```no_run
//! use kindling::Mobi;
//!
//! let mut doc = Mobi::from_path("hybrid.azw")?;
//! if doc.is_hybrid() {
//!     doc.use_kf7(); // switch to the legacy half
//! }
//! # Ok::<(), kindling::Error>(())
//! ```

pub mod buffer;
pub mod compression;
pub mod document;
pub mod encoding;
pub mod error;
pub mod exth;
pub mod headers;
pub mod locale;
pub mod pdb;
pub mod record;
pub mod resource;

pub use document::{Mobi, Resource};
pub use error::{Error, Result};
pub use exth::ExthValue;
pub use headers::{Compression, Encryption, NULL_INDEX, TextEncoding};
pub use resource::Filetype;
