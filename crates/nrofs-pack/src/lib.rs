//! # nrofs-pack
//!
//! Read-only archive format for nrofs.
//!
//! An archive bundles a set of files into one container whose payloads all
//! start on a block boundary, so each file can be mapped or read at an
//! independent page-aligned offset without touching the others.
//!
//! ## Archive Format
//!
//! ```text
//! +----------------------+  offset 0
//! | Header (16B)         |  magic "NrRdOnly", version, block size, file count
//! +----------------------+  offset 16
//! | Entry Table          |  [name offset, block offset, size] × N (12B each)
//! +----------------------+
//! | String Table         |  [len: u8, UTF-8 bytes] × N
//! +----------------------+  first block boundary after the string table
//! | Payload Blocks       |  one contiguous run per file, block-aligned
//! +----------------------+
//! ```
//!
//! All integers are little-endian. Entries, strings and payloads share the
//! same order: names sorted bytewise, which makes archives reproducible.
//!
//! ## Example
//!
//! ```no_run
//! use nrofs_pack::{ArchiveBuilder, ArchiveReader, BlockSize};
//! use std::path::Path;
//!
//! let mut builder = ArchiveBuilder::new(BlockSize::new(12)?);
//! builder.add_path(Path::new("."), "README.md")?;
//! builder.create("init.nrofs")?;
//!
//! let mut reader = ArchiveReader::open("init.nrofs")?;
//! for entry in reader.entries() {
//!     let entry = entry?;
//!     println!("{:8}  {}", entry.size(), entry.name);
//! }
//! # Ok::<(), nrofs_pack::PackError>(())
//! ```

mod builder;
pub mod codec;
mod error;
mod layout;
mod mapped;
mod reader;

pub use builder::{ArchiveBuilder, InputFile, Summary};
pub use codec::{Entry, Header, MAGIC, VERSION};
pub use error::{PackError, Result};
pub use layout::{BlockSize, Layout, DEFAULT_BLOCK_SIZE, MAX_BLOCK_SIZE};
pub use mapped::MappedArchive;
pub use reader::{ArchiveReader, Entries, ListedEntry};
