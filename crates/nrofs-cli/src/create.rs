//! Archive creation: collect inputs, then hand them to the builder.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use nrofs_config::path::archive_name;
use nrofs_config::{log_cli_debug, log_cli_info};
use nrofs_pack::{ArchiveBuilder, BlockSize};
use walkdir::WalkDir;

pub struct CreateOptions {
    /// Destination archive, already resolved against the base directory
    pub output: PathBuf,
    pub files: Vec<PathBuf>,
    pub recursive: bool,
    pub verbose: bool,
    pub block_size: u8,
}

pub fn run(base: &Path, opts: &CreateOptions) -> Result<()> {
    let block_size = BlockSize::new(opts.block_size).context("Invalid --block-size")?;

    if opts.files.is_empty() {
        bail!("No input files given");
    }

    let names = collect_inputs(base, &opts.files, opts.recursive)?;
    log_cli_debug!("Collected inputs", count = names.len());

    let mut builder = ArchiveBuilder::new(block_size);
    for name in &names {
        if opts.verbose {
            println!("{}", name);
        }
        builder
            .add_path(base, name.as_str())
            .with_context(|| format!("Failed to read {}", name))?;
    }

    let summary = builder
        .create(&opts.output)
        .with_context(|| format!("Failed to create archive {}", opts.output.display()))?;

    log_cli_info!(
        "Archive created",
        files = summary.file_count,
        block_size = summary.block_size,
        bytes = summary.archive_len
    );
    Ok(())
}

/// Turn command-line paths into a sorted, de-duplicated set of archive names.
///
/// Names stay relative to `base` exactly as given (normalized), so
/// `-C root a/b` stores `a/b`. Directories are expanded into their regular
/// files only when `recursive` is set.
pub fn collect_inputs(base: &Path, files: &[PathBuf], recursive: bool) -> Result<BTreeSet<String>> {
    let mut names = BTreeSet::new();

    for file in files {
        let full = base.join(file);
        if full.is_dir() {
            if !recursive {
                bail!("{} is a directory (use --recursive)", file.display());
            }
            for entry in WalkDir::new(&full).min_depth(1) {
                let entry = entry
                    .with_context(|| format!("Failed to walk {}", full.display()))?;
                // Follow symlinks to files, skip everything else.
                if !entry.path().is_file() {
                    continue;
                }
                let relative = entry
                    .path()
                    .strip_prefix(&full)
                    .context("Walked outside the input directory")?;
                names.insert(archive_name(file.join(relative))?);
            }
        } else {
            names.insert(archive_name(file)?);
        }
    }

    Ok(names)
}
