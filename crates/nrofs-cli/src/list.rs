//! Archive listing.

use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use nrofs_pack::{ArchiveReader, ListedEntry};

pub fn run(archive: &Path, verbose: bool) -> Result<()> {
    let mut reader = ArchiveReader::open(archive)
        .with_context(|| format!("Failed to open archive {}", archive.display()))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if verbose {
        writeln!(out, "block size: {}", reader.block_size())?;
        writeln!(out, "file count: {}", reader.len())?;
    }

    // Entries are printed as they are decoded.
    for entry in reader.entries() {
        let entry = entry.context("Failed to read archive entry")?;
        writeln!(out, "{}", format_entry(&entry, verbose))?;
    }
    out.flush()?;
    Ok(())
}

/// `size  name`, or `block  size  name` when verbose.
pub fn format_entry(entry: &ListedEntry, verbose: bool) -> String {
    if verbose {
        format!(
            "{:8}  {:8}  {}",
            entry.block_offset(),
            entry.size(),
            entry.name
        )
    } else {
        format!("{:8}  {}", entry.size(), entry.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nrofs_pack::Entry;

    fn entry() -> ListedEntry {
        ListedEntry {
            name: "bin/init".to_string(),
            entry: Entry {
                name_offset: 28,
                block_offset: 1,
                size: 1234,
            },
        }
    }

    #[test]
    fn test_format_plain() {
        assert_eq!(format_entry(&entry(), false), "    1234  bin/init");
    }

    #[test]
    fn test_format_verbose() {
        assert_eq!(
            format_entry(&entry(), true),
            "       1      1234  bin/init"
        );
    }
}
