//! Block arithmetic and metadata layout.

use crate::codec::{Entry, ENTRY_SIZE, HEADER_SIZE, MAX_NAME_LEN};
use crate::error::{PackError, Result};

/// Largest supported block size exponent (2 GiB blocks)
pub const MAX_BLOCK_SIZE: u8 = 31;
/// Default block size exponent (4 KiB blocks)
pub const DEFAULT_BLOCK_SIZE: u8 = 12;

/// Block size, stored as a power-of-two exponent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSize(u8);

impl BlockSize {
    pub fn new(exponent: u8) -> Result<Self> {
        if exponent > MAX_BLOCK_SIZE {
            return Err(PackError::InvalidBlockSize(exponent));
        }
        Ok(Self(exponent))
    }

    #[inline]
    pub fn exponent(self) -> u8 {
        self.0
    }

    /// Block length in bytes.
    #[inline]
    pub fn bytes(self) -> u64 {
        1u64 << self.0
    }

    #[inline]
    pub fn mask(self) -> u64 {
        self.bytes() - 1
    }

    /// Number of blocks needed to hold `n` bytes.
    #[inline]
    pub fn blocks(self, n: u64) -> u64 {
        (n + self.mask()) >> self.0
    }

    /// Round `n` up to the next block boundary.
    #[inline]
    pub fn align_up(self, n: u64) -> u64 {
        self.blocks(n) << self.0
    }
}

impl Default for BlockSize {
    fn default() -> Self {
        Self(DEFAULT_BLOCK_SIZE)
    }
}

/// Offsets of every structure in an archive, computed before anything is written.
#[derive(Debug, Clone)]
pub struct Layout {
    pub block_size: BlockSize,
    /// Sum of the encoded name lengths, excluding length bytes
    pub total_strings_size: u64,
    /// Header + entry table + string table
    pub total_meta_size: u64,
    pub total_meta_blocks: u64,
    /// One record per file, in input order
    pub entries: Vec<Entry>,
}

impl Layout {
    /// Compute the layout for `(name, size)` pairs, already in archive order.
    ///
    /// Name offsets start right after the entry table and advance by
    /// `1 + len(name)`; block offsets start at the first boundary after the
    /// metadata region and advance by `blocks(size)`.
    pub fn compute<'a, I>(block_size: BlockSize, files: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, u64)>,
        I::IntoIter: Clone,
    {
        let files = files.into_iter();

        let mut file_count = 0u64;
        let mut total_strings_size = 0u64;
        for (name, _) in files.clone() {
            if name.len() > MAX_NAME_LEN {
                return Err(PackError::StringTooLarge { len: name.len() });
            }
            file_count += 1;
            total_strings_size += name.len() as u64;
        }

        // `total_meta_size` leaves out the one-byte length prefixes. Payload
        // starts at the first boundary after the real end of the string table.
        let total_meta_size = HEADER_SIZE + ENTRY_SIZE * file_count + total_strings_size;
        let data_start = block_size.align_up(total_meta_size + file_count);
        let total_meta_blocks = data_start >> block_size.exponent();

        let mut next_name = total_meta_size - total_strings_size;
        let mut next_block = total_meta_blocks;
        let mut entries = Vec::with_capacity(file_count as usize);
        for (name, size) in files {
            let size32 = u32::try_from(size).map_err(|_| PackError::FileTooLarge {
                name: name.to_string(),
                size,
            })?;
            let entry = Entry {
                name_offset: u32::try_from(next_name).map_err(|_| PackError::ArchiveTooLarge)?,
                block_offset: u32::try_from(next_block).map_err(|_| PackError::ArchiveTooLarge)?,
                size: size32,
            };
            next_block += entry.blocks(block_size.exponent());
            entries.push(entry);
            next_name += 1 + name.len() as u64;
        }

        Ok(Self {
            block_size,
            total_strings_size,
            total_meta_size,
            total_meta_blocks,
            entries,
        })
    }

    /// Byte offset where the payload region begins.
    #[inline]
    pub fn data_start(&self) -> u64 {
        self.total_meta_blocks << self.block_size.exponent()
    }

    /// Byte offset of the first string record.
    #[inline]
    pub fn strings_start(&self) -> u64 {
        self.total_meta_size - self.total_strings_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_math() {
        let bs = BlockSize::new(12).unwrap();
        assert_eq!(bs.bytes(), 4096);
        assert_eq!(bs.mask(), 4095);
        assert_eq!(bs.blocks(0), 0);
        assert_eq!(bs.blocks(1), 1);
        assert_eq!(bs.blocks(4096), 1);
        assert_eq!(bs.blocks(4097), 2);
        assert_eq!(bs.align_up(4097), 8192);
    }

    #[test]
    fn test_block_size_range() {
        assert!(BlockSize::new(0).is_ok());
        assert!(BlockSize::new(MAX_BLOCK_SIZE).is_ok());
        assert!(matches!(
            BlockSize::new(MAX_BLOCK_SIZE + 1),
            Err(PackError::InvalidBlockSize(32))
        ));
        assert_eq!(BlockSize::default().exponent(), 12);
    }

    #[test]
    fn test_two_file_layout() {
        let layout = Layout::compute(
            BlockSize::new(12).unwrap(),
            [("a.txt", 3u64), ("b.txt", 1u64)],
        )
        .unwrap();

        assert_eq!(layout.total_strings_size, 10);
        assert_eq!(layout.total_meta_size, 16 + 24 + 10);
        assert_eq!(layout.strings_start(), 40);
        assert_eq!(layout.total_meta_blocks, 1);
        assert_eq!(layout.data_start(), 4096);

        assert_eq!(layout.entries[0].name_offset, 40);
        assert_eq!(layout.entries[1].name_offset, 46);
        assert_eq!(layout.entries[0].block_offset, 1);
        assert_eq!(layout.entries[1].block_offset, 2);
    }

    #[test]
    fn test_exact_block_sized_file() {
        let bs = BlockSize::new(9).unwrap();
        let layout = Layout::compute(bs, [("x", 512u64), ("y", 513u64), ("z", 0u64)]).unwrap();

        assert_eq!(layout.entries[0].block_offset, 1);
        // 512 bytes take one block
        assert_eq!(layout.entries[1].block_offset, 2);
        // 513 bytes take two
        assert_eq!(layout.entries[2].block_offset, 4);
    }

    #[test]
    fn test_metadata_spanning_blocks() {
        // Tiny blocks force the metadata across several of them.
        let bs = BlockSize::new(4).unwrap();
        let layout = Layout::compute(bs, [("abcdefgh", 1u64)]).unwrap();

        // 16 + 12 + 8 = 36 bytes, plus one length byte = 37 -> 3 blocks
        assert_eq!(layout.total_meta_size, 36);
        assert_eq!(layout.total_meta_blocks, 3);
        assert_eq!(layout.data_start(), 48);
    }

    #[test]
    fn test_length_bytes_never_overlap_payload() {
        // Strings end exactly one byte past a boundary once length bytes count.
        let bs = BlockSize::new(5).unwrap();
        let layout = Layout::compute(bs, [("abcd", 1u64)]).unwrap();

        // 16 + 12 + 4 = 32 fits a block, but the string record ends at 33.
        assert_eq!(layout.total_meta_size, 32);
        assert_eq!(layout.data_start(), 64);
    }

    #[test]
    fn test_name_too_long() {
        let name = "n".repeat(256);
        let result = Layout::compute(BlockSize::default(), [(name.as_str(), 1u64)]);
        assert!(matches!(result, Err(PackError::StringTooLarge { len: 256 })));
    }

    #[test]
    fn test_file_too_large() {
        let result = Layout::compute(BlockSize::default(), [("big", u64::from(u32::MAX) + 1)]);
        assert!(matches!(result, Err(PackError::FileTooLarge { .. })));
    }
}
