//! Archive listing and payload access over any seekable source.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::{debug, instrument};

use crate::codec::{self, Entry, Header, ENTRY_SIZE, HEADER_SIZE};
use crate::error::{PackError, Result};
use crate::layout::BlockSize;

/// An entry record together with its resolved name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedEntry {
    pub name: String,
    pub entry: Entry,
}

impl ListedEntry {
    #[inline]
    pub fn size(&self) -> u32 {
        self.entry.size
    }

    #[inline]
    pub fn block_offset(&self) -> u32 {
        self.entry.block_offset
    }
}

/// Reader for archives
///
/// Entry records are scanned in order while each name is fetched with a
/// separate positioned read, so listing never touches payload bytes.
pub struct ArchiveReader<R> {
    inner: R,
    header: Header,
}

impl ArchiveReader<BufReader<File>> {
    /// Open an archive file for reading
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::new(BufReader::new(file))
    }
}

impl<R: Read + Seek> ArchiveReader<R> {
    /// Parse and validate the header.
    #[instrument(skip_all)]
    pub fn new(mut inner: R) -> Result<Self> {
        inner.seek(SeekFrom::Start(0))?;
        let header = codec::read_header(&mut inner)?;
        BlockSize::new(header.block_size)?;
        debug!(
            block_size = header.block_size,
            file_count = header.file_count,
            "Opened archive"
        );
        Ok(Self { inner, header })
    }

    pub fn header(&self) -> Header {
        self.header
    }

    pub fn block_size(&self) -> u8 {
        self.header.block_size
    }

    pub fn len(&self) -> usize {
        self.header.file_count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.header.file_count == 0
    }

    /// Iterate over all entries in archive order.
    ///
    /// The iterator stops after the first error.
    pub fn entries(&mut self) -> Entries<'_, R> {
        Entries {
            inner: &mut self.inner,
            next: 0,
            count: self.header.file_count,
        }
    }

    /// Collect every entry.
    pub fn list(&mut self) -> Result<Vec<ListedEntry>> {
        self.entries().collect()
    }

    /// Look up an entry by its stored name.
    pub fn find(&mut self, name: &str) -> Result<Option<ListedEntry>> {
        for entry in self.entries() {
            let entry = entry?;
            if entry.name == name {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }

    /// Read an entry's payload into memory.
    pub fn read_data(&mut self, entry: &ListedEntry) -> Result<Vec<u8>> {
        self.seek_payload(entry)?;
        let mut data = vec![0u8; entry.size() as usize];
        self.inner
            .read_exact(&mut data)
            .map_err(|e| PackError::from_read(e, "payload"))?;
        Ok(data)
    }

    /// Stream an entry's payload into `out`, returning the bytes copied.
    pub fn copy_data<W: Write>(&mut self, entry: &ListedEntry, out: &mut W) -> Result<u64> {
        self.seek_payload(entry)?;
        let expected = u64::from(entry.size());
        let copied = io::copy(&mut (&mut self.inner).take(expected), out)?;
        if copied != expected {
            return Err(PackError::Truncated { what: "payload" });
        }
        Ok(copied)
    }

    fn seek_payload(&mut self, entry: &ListedEntry) -> Result<()> {
        let offset = entry.entry.byte_offset(self.header.block_size);
        self.inner.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    /// Return the underlying source.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// Iterator over archive entries, see [`ArchiveReader::entries`].
pub struct Entries<'a, R> {
    inner: &'a mut R,
    next: u32,
    count: u32,
}

impl<R: Read + Seek> Entries<'_, R> {
    fn read_next(&mut self) -> Result<ListedEntry> {
        let pos = HEADER_SIZE + u64::from(self.next) * ENTRY_SIZE;
        self.inner.seek(SeekFrom::Start(pos))?;
        let entry = codec::read_entry(&mut *self.inner)?;

        self.inner
            .seek(SeekFrom::Start(u64::from(entry.name_offset)))?;
        let name = codec::read_string(&mut *self.inner)?;

        Ok(ListedEntry { name, entry })
    }
}

impl<R: Read + Seek> Iterator for Entries<'_, R> {
    type Item = Result<ListedEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.count {
            return None;
        }
        let item = self.read_next();
        self.next = if item.is_ok() { self.next + 1 } else { self.count };
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.count - self.next) as usize;
        (0, Some(remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Hand-assemble a single-entry archive with 16-byte blocks.
    fn tiny_archive() -> Vec<u8> {
        let mut buf = Vec::new();
        codec::write_header(&mut buf, 4, 1).unwrap();
        codec::write_entry(
            &mut buf,
            &Entry {
                name_offset: 28,
                block_offset: 3,
                size: 5,
            },
        )
        .unwrap();
        codec::write_string(&mut buf, "hello").unwrap();
        buf.resize(48, 0);
        buf.extend_from_slice(b"world");
        buf
    }

    #[test]
    fn test_list_and_read() {
        let mut reader = ArchiveReader::new(Cursor::new(tiny_archive())).unwrap();
        assert_eq!(reader.len(), 1);
        assert_eq!(reader.block_size(), 4);

        let entries = reader.list().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "hello");
        assert_eq!(entries[0].size(), 5);
        assert_eq!(entries[0].block_offset(), 3);

        assert_eq!(reader.read_data(&entries[0]).unwrap(), b"world");

        let mut out = Vec::new();
        assert_eq!(reader.copy_data(&entries[0], &mut out).unwrap(), 5);
        assert_eq!(out, b"world");
    }

    #[test]
    fn test_find() {
        let mut reader = ArchiveReader::new(Cursor::new(tiny_archive())).unwrap();
        assert!(reader.find("hello").unwrap().is_some());
        assert!(reader.find("nope").unwrap().is_none());
    }

    #[test]
    fn test_truncated_entry_table() {
        let mut bytes = tiny_archive();
        bytes.truncate(20);
        let mut reader = ArchiveReader::new(Cursor::new(bytes)).unwrap();

        let mut entries = reader.entries();
        assert!(matches!(
            entries.next(),
            Some(Err(PackError::Truncated { .. }))
        ));
        assert!(entries.next().is_none());
    }

    #[test]
    fn test_truncated_payload() {
        let mut bytes = tiny_archive();
        bytes.truncate(50);
        let mut reader = ArchiveReader::new(Cursor::new(bytes)).unwrap();
        let entry = reader.find("hello").unwrap().unwrap();

        assert!(matches!(
            reader.read_data(&entry),
            Err(PackError::Truncated { what: "payload" })
        ));
        assert!(matches!(
            reader.copy_data(&entry, &mut Vec::<u8>::new()),
            Err(PackError::Truncated { what: "payload" })
        ));
    }

    #[test]
    fn test_invalid_block_size_rejected() {
        let mut bytes = tiny_archive();
        bytes[9] = 200;
        assert!(matches!(
            ArchiveReader::new(Cursor::new(bytes)),
            Err(PackError::InvalidBlockSize(200))
        ));
    }

    #[test]
    fn test_not_an_archive() {
        let bytes = b"definitely not an archive".to_vec();
        assert!(matches!(
            ArchiveReader::new(Cursor::new(bytes)),
            Err(PackError::BadMagic { .. })
        ));
    }
}
