//! Archive creation.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::codec;
use crate::error::{PackError, Result};
use crate::layout::{BlockSize, Layout};

/// Payload copy chunk (64 KiB)
const COPY_CHUNK: usize = 1 << 16;

/// A file to be stored: its archive name, where to read it from, and its size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    /// Name recorded in the string table
    pub name: String,
    /// Location of the payload on disk
    pub source: PathBuf,
    /// Payload length, taken when the file was collected
    pub size: u64,
}

impl InputFile {
    pub fn new(name: impl Into<String>, source: impl Into<PathBuf>, size: u64) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            size,
        }
    }

    /// Resolve `name` against `base` and take its size from the filesystem.
    pub fn stat(base: &Path, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let source = base.join(&name);
        let size = fs::metadata(&source)?.len();
        Ok(Self { name, source, size })
    }
}

/// What a finished archive looks like
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub file_count: u32,
    pub block_size: u8,
    pub total_meta_size: u64,
    /// Byte offset of the first payload block
    pub data_start: u64,
    /// Final archive length in bytes
    pub archive_len: u64,
}

/// Builder for creating new archives
///
/// Files are stored sorted by name, so the same input set always produces
/// the same bytes.
#[derive(Debug, Default)]
pub struct ArchiveBuilder {
    block_size: BlockSize,
    files: BTreeMap<String, InputFile>,
}

impl ArchiveBuilder {
    pub fn new(block_size: BlockSize) -> Self {
        Self {
            block_size,
            files: BTreeMap::new(),
        }
    }

    /// Add a file. A second file with the same name is rejected.
    pub fn add(&mut self, file: InputFile) -> Result<()> {
        if self.files.contains_key(&file.name) {
            return Err(PackError::DuplicateOrEmptyInput(format!(
                "duplicate name: {}",
                file.name
            )));
        }
        self.files.insert(file.name.clone(), file);
        Ok(())
    }

    /// Stat `base/name` and add it under `name`.
    pub fn add_path(&mut self, base: &Path, name: impl Into<String>) -> Result<()> {
        self.add(InputFile::stat(base, name)?)
    }

    pub fn block_size(&self) -> BlockSize {
        self.block_size
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Names in archive order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// Compute the layout without writing anything.
    pub fn layout(&self) -> Result<Layout> {
        if self.files.is_empty() {
            return Err(PackError::DuplicateOrEmptyInput("no input files".to_string()));
        }
        u32::try_from(self.files.len()).map_err(|_| PackError::ArchiveTooLarge)?;
        Layout::compute(
            self.block_size,
            self.files.values().map(|f| (f.name.as_str(), f.size)),
        )
    }

    /// Write the archive to a seekable sink.
    ///
    /// The metadata region is written first, then each payload at its block
    /// offset. Gaps are left by seeking, so the archive ends at the last
    /// payload byte.
    #[instrument(skip_all, fields(files = self.files.len(), block_size = self.block_size.exponent()))]
    pub fn write_to<W: Write + Seek>(&self, out: &mut W) -> Result<Summary> {
        let layout = self.layout()?;
        let file_count = layout.entries.len() as u32;

        out.seek(SeekFrom::Start(0))?;
        codec::write_header(out, self.block_size.exponent(), file_count)?;
        for entry in &layout.entries {
            codec::write_entry(out, entry)?;
        }
        out.seek(SeekFrom::Start(layout.strings_start()))?;
        for name in self.files.keys() {
            codec::write_string(out, name)?;
        }

        let mut buf = vec![0u8; COPY_CHUNK];
        for (file, entry) in self.files.values().zip(&layout.entries) {
            let offset = entry.byte_offset(self.block_size.exponent());
            debug!(name = %file.name, size = file.size, offset, "Writing payload");
            out.seek(SeekFrom::Start(offset))?;
            copy_payload(file, out, &mut buf)?;
        }

        out.flush()?;
        let archive_len = out.seek(SeekFrom::End(0))?;

        info!(
            files = file_count,
            data_start = layout.data_start(),
            archive_len,
            "Archive written"
        );

        Ok(Summary {
            file_count,
            block_size: self.block_size.exponent(),
            total_meta_size: layout.total_meta_size,
            data_start: layout.data_start(),
            archive_len,
        })
    }

    /// Create the archive at `path`, replacing any existing file.
    ///
    /// The archive is written to a temporary file next to `path` and renamed
    /// into place only once every payload has been copied and synced. On
    /// failure the destination is left untouched.
    pub fn create<P: AsRef<Path>>(&self, path: P) -> Result<Summary> {
        let path = path.as_ref();
        self.layout()?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let tmp = tempfile::Builder::new()
            .prefix(".nrofs-")
            .suffix(".tmp")
            .tempfile_in(dir)?;

        let mut writer = BufWriter::new(tmp);
        let summary = self.write_to(&mut writer)?;
        let tmp = writer.into_inner().map_err(|e| e.into_error())?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(fs::Permissions::from_mode(0o644))?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;

        debug!(path = %path.display(), "Archive persisted");
        Ok(summary)
    }
}

/// Stream exactly `file.size` bytes from the source into `out`.
fn copy_payload<W: Write>(file: &InputFile, out: &mut W, buf: &mut [u8]) -> Result<()> {
    let mut src = File::open(&file.source)?.take(file.size);
    let mut copied = 0u64;
    loop {
        let n = match src.read(buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        out.write_all(&buf[..n])?;
        copied += n as u64;
    }

    if copied != file.size {
        return Err(PackError::SizeChanged {
            name: file.name.clone(),
            expected: file.size,
            actual: copied,
        });
    }
    Ok(())
}
