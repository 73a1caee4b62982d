//! On-disk encoding of the header, entry records and name strings.
//!
//! Fixed-width structures go through `bincode`'s default options, which
//! encode integers little-endian at their natural width and byte arrays
//! without a length prefix. That makes the serde structs below byte-exact
//! mirrors of the archive layout.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::error::{PackError, Result};

/// Magic bytes for archive identification
pub const MAGIC: &[u8; 8] = b"NrRdOnly";
/// The only archive format version understood by this crate
pub const VERSION: u8 = 0;
/// Encoded header length in bytes
pub const HEADER_SIZE: u64 = 16;
/// Encoded entry record length in bytes
pub const ENTRY_SIZE: u64 = 12;
/// Longest name a string record can hold
pub const MAX_NAME_LEN: usize = u8::MAX as usize;

/// Header as laid out on disk (16 bytes)
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawHeader {
    magic: [u8; 8],
    version: u8,
    block_size: u8,
    reserved: [u8; 2],
    file_count: u32,
}

/// Decoded archive header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Block size as a power of two
    pub block_size: u8,
    /// Number of entry records following the header
    pub file_count: u32,
}

/// Fixed-size entry record (12 bytes on disk)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Absolute archive offset of the length-prefixed name
    pub name_offset: u32,
    /// Payload start, in blocks
    pub block_offset: u32,
    /// Unpadded payload length in bytes
    pub size: u32,
}

impl Entry {
    /// Absolute byte offset of the payload.
    #[inline]
    pub fn byte_offset(&self, block_size: u8) -> u64 {
        u64::from(self.block_offset) << block_size
    }

    /// Number of blocks the payload occupies.
    #[inline]
    pub fn blocks(&self, block_size: u8) -> u64 {
        let mask = (1u64 << block_size) - 1;
        (u64::from(self.size) + mask) >> block_size
    }
}

pub fn write_header<W: Write>(out: &mut W, block_size: u8, file_count: u32) -> Result<()> {
    let raw = RawHeader {
        magic: *MAGIC,
        version: VERSION,
        block_size,
        reserved: [0; 2],
        file_count,
    };
    bincode::serialize_into(out, &raw)?;
    Ok(())
}

/// Read and validate the header.
///
/// Fails with [`PackError::BadMagic`] or [`PackError::UnsupportedVersion`]
/// when the input is not an archive this crate can read.
pub fn read_header<R: Read>(input: &mut R) -> Result<Header> {
    let mut buf = [0u8; HEADER_SIZE as usize];
    input
        .read_exact(&mut buf)
        .map_err(|e| PackError::from_read(e, "header"))?;
    let raw: RawHeader = bincode::deserialize(&buf)?;

    if &raw.magic != MAGIC {
        return Err(PackError::BadMagic { found: raw.magic });
    }
    if raw.version != VERSION {
        return Err(PackError::UnsupportedVersion { found: raw.version });
    }

    Ok(Header {
        block_size: raw.block_size,
        file_count: raw.file_count,
    })
}

pub fn write_entry<W: Write>(out: &mut W, entry: &Entry) -> Result<()> {
    bincode::serialize_into(out, entry)?;
    Ok(())
}

pub fn read_entry<R: Read>(input: &mut R) -> Result<Entry> {
    let mut buf = [0u8; ENTRY_SIZE as usize];
    input
        .read_exact(&mut buf)
        .map_err(|e| PackError::from_read(e, "entry record"))?;
    Ok(bincode::deserialize(&buf)?)
}

/// Write a length-prefixed name. Names over 255 encoded bytes are rejected.
pub fn write_string<W: Write>(out: &mut W, s: &str) -> Result<()> {
    let bytes = s.as_bytes();
    let len = u8::try_from(bytes.len()).map_err(|_| PackError::StringTooLarge { len: bytes.len() })?;
    out.write_all(&[len])?;
    out.write_all(bytes)?;
    Ok(())
}

pub fn read_string<R: Read>(input: &mut R) -> Result<String> {
    let mut len = [0u8; 1];
    input
        .read_exact(&mut len)
        .map_err(|e| PackError::from_read(e, "name length"))?;
    let mut buf = vec![0u8; len[0] as usize];
    input
        .read_exact(&mut buf)
        .map_err(|e| PackError::from_read(e, "name"))?;
    String::from_utf8(buf).map_err(|_| PackError::InvalidName)
}
