//! Error types for kindling operations.

use thiserror::Error;

/// Errors that can occur while decoding a Mobipocket document.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A read ran past the end of a record or sub-buffer.
    #[error("unexpected end of buffer")]
    BufferEnd,

    /// Structurally invalid data: bad magic, non-monotonic offsets,
    /// illegal back-references, inflate mismatches and the like.
    #[error("corrupted data: {0}")]
    DataCorrupt(String),

    /// The document text is DRM-protected. Metadata stays readable.
    #[error("document is encrypted")]
    FileEncrypted,

    /// The container is a Palm database, but not a Mobipocket book.
    #[error("unsupported database type: {0}")]
    FileUnsupported(String),

    /// Caller error: missing header, undersized output buffer.
    #[error("invalid parameter: {0}")]
    ParamError(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Shorthand used by the parsers.
    pub(crate) fn corrupt(what: impl Into<String>) -> Self {
        Error::DataCorrupt(what.into())
    }
}
