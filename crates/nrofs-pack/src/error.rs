use std::io;

use thiserror::Error;

/// Errors that can occur while creating or reading an archive
#[derive(Error, Debug)]
pub enum PackError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("Bad magic bytes: {found:?}")]
    BadMagic { found: [u8; 8] },

    #[error("Unsupported version: {found}")]
    UnsupportedVersion { found: u8 },

    #[error("String too large: {len} bytes (max 255)")]
    StringTooLarge { len: usize },

    #[error("Truncated archive: not enough bytes for {what}")]
    Truncated { what: &'static str },

    #[error("Duplicate or empty input: {0}")]
    DuplicateOrEmptyInput(String),

    #[error("Invalid block size exponent: {0}")]
    InvalidBlockSize(u8),

    #[error("File too large for archive: {name} ({size} bytes)")]
    FileTooLarge { name: String, size: u64 },

    #[error("Archive exceeds 32-bit offsets")]
    ArchiveTooLarge,

    #[error("File changed during copy: {name} (expected {expected} bytes, got {actual})")]
    SizeChanged {
        name: String,
        expected: u64,
        actual: u64,
    },

    #[error("Stored name is not valid UTF-8")]
    InvalidName,

    #[error("Entry not found in archive: {name}")]
    NotFound { name: String },
}

pub type Result<T> = std::result::Result<T, PackError>;

impl PackError {
    /// Map an `UnexpectedEof` to [`PackError::Truncated`], keep other I/O errors.
    pub(crate) fn from_read(err: io::Error, what: &'static str) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            PackError::Truncated { what }
        } else {
            PackError::Io(err)
        }
    }
}
