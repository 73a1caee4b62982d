//! Zero-copy access to an archive held in memory.
//!
//! Payloads are block-aligned, so a mapped archive can hand out each file as
//! a plain slice of the mapping.

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;

use crate::codec::{self, Entry, Header, ENTRY_SIZE, HEADER_SIZE};
use crate::error::{PackError, Result};
use crate::layout::BlockSize;
use crate::reader::ListedEntry;

/// Archive backed by a byte buffer, usually a memory map
pub struct MappedArchive<B = Mmap> {
    data: B,
    header: Header,
}

impl MappedArchive<Mmap> {
    /// Map an archive file read-only
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        // SAFETY: archives are immutable once written; the map is read-only.
        let mmap = unsafe { Mmap::map(&file) }?;
        Self::from_bytes(mmap)
    }
}

impl<B: AsRef<[u8]>> MappedArchive<B> {
    pub fn from_bytes(data: B) -> Result<Self> {
        let header = codec::read_header(&mut data.as_ref())?;
        BlockSize::new(header.block_size)?;
        Ok(Self { data, header })
    }

    pub fn header(&self) -> Header {
        self.header
    }

    pub fn len(&self) -> usize {
        self.header.file_count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.header.file_count == 0
    }

    /// Bounds-checked slice of the archive.
    fn slice(&self, offset: u64, len: u64, what: &'static str) -> Result<&[u8]> {
        let bytes = self.data.as_ref();
        let end = offset.checked_add(len).ok_or(PackError::Truncated { what })?;
        if end > bytes.len() as u64 {
            return Err(PackError::Truncated { what });
        }
        Ok(&bytes[offset as usize..end as usize])
    }

    /// Entry record at `index`.
    pub fn entry(&self, index: u32) -> Result<Entry> {
        if index >= self.header.file_count {
            return Err(PackError::NotFound {
                name: format!("#{}", index),
            });
        }
        let pos = HEADER_SIZE + u64::from(index) * ENTRY_SIZE;
        let mut record = self.slice(pos, ENTRY_SIZE, "entry record")?;
        codec::read_entry(&mut record)
    }

    /// Name of an entry, borrowed from the archive.
    pub fn name(&self, entry: &Entry) -> Result<&str> {
        let offset = u64::from(entry.name_offset);
        let len = self.slice(offset, 1, "name length")?[0];
        let bytes = self.slice(offset + 1, u64::from(len), "name")?;
        std::str::from_utf8(bytes).map_err(|_| PackError::InvalidName)
    }

    pub fn entries(&self) -> impl Iterator<Item = Result<ListedEntry>> + '_ {
        (0..self.header.file_count).map(move |i| {
            let entry = self.entry(i)?;
            let name = self.name(&entry)?.to_string();
            Ok(ListedEntry { name, entry })
        })
    }

    /// Look up an entry by its stored name.
    pub fn find(&self, name: &str) -> Result<Option<Entry>> {
        for i in 0..self.header.file_count {
            let entry = self.entry(i)?;
            if self.name(&entry)? == name {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }

    /// Payload bytes of an entry.
    pub fn data(&self, entry: &Entry) -> Result<&[u8]> {
        self.slice(
            entry.byte_offset(self.header.block_size),
            u64::from(entry.size),
            "payload",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn archive(names: &[(&str, &[u8])]) -> Vec<u8> {
        let mut buf = Vec::new();
        codec::write_header(&mut buf, 4, names.len() as u32).unwrap();
        let strings_at = 16 + 12 * names.len() as u32;
        let strings_len: u32 = names.iter().map(|(n, _)| 1 + n.len() as u32).sum();
        let mut block = (strings_at + strings_len + 15) / 16;
        let mut name_offset = strings_at;
        let mut payloads = Vec::new();
        for (name, data) in names {
            codec::write_entry(
                &mut buf,
                &Entry {
                    name_offset,
                    block_offset: block,
                    size: data.len() as u32,
                },
            )
            .unwrap();
            payloads.push((block, *data));
            name_offset += 1 + name.len() as u32;
            block += (data.len() as u32 + 15) / 16;
        }
        for (name, _) in names {
            codec::write_string(&mut buf, name).unwrap();
        }
        for (block, data) in payloads {
            buf.resize(block as usize * 16, 0);
            buf.extend_from_slice(data);
        }
        buf
    }

    #[test]
    fn test_zero_copy_access() {
        let bytes = archive(&[
            ("one", &b"first payload"[..]),
            ("two", &b"second payload here"[..]),
        ]);
        let mapped = MappedArchive::from_bytes(bytes).unwrap();
        assert_eq!(mapped.len(), 2);

        let listed: Vec<_> = mapped.entries().collect::<Result<_>>().unwrap();
        assert_eq!(listed[0].name, "one");
        assert_eq!(listed[1].name, "two");

        let two = mapped.find("two").unwrap().unwrap();
        assert_eq!(mapped.name(&two).unwrap(), "two");
        assert_eq!(mapped.data(&two).unwrap(), b"second payload here");
        assert_eq!(two.byte_offset(4) % 16, 0);
    }

    #[test]
    fn test_out_of_range() {
        let bytes = archive(&[("a", &b"xyz"[..])]);
        let mut short = bytes.clone();
        short.truncate(short.len() - 1);

        let mapped = MappedArchive::from_bytes(short).unwrap();
        let entry = mapped.entry(0).unwrap();
        assert!(matches!(
            mapped.data(&entry),
            Err(PackError::Truncated { what: "payload" })
        ));
        assert!(matches!(mapped.entry(1), Err(PackError::NotFound { .. })));
    }

    #[test]
    fn test_bad_header() {
        assert!(matches!(
            MappedArchive::from_bytes(vec![0u8; 4]),
            Err(PackError::Truncated { what: "header" })
        ));
        assert!(matches!(
            MappedArchive::from_bytes(vec![0u8; 32]),
            Err(PackError::BadMagic { .. })
        ));
    }
}
