//! # nrofs CLI
//!
//! Command-line interface for creating and listing nrofs read-only archives.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use nrofs_config::logging::{init_logging, LogLevel};
use nrofs_config::path::resolve_base;
use nrofs_config::Config;

mod create;
mod list;

/// nrofs - block-aligned read-only archives
#[derive(Parser, Debug)]
#[command(name = "nrofs")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Archive to create, or to read with --list
    #[arg(value_name = "ARCHIVE")]
    output: PathBuf,

    /// Files to store (directories need --recursive)
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,

    /// List all files
    #[arg(short, long)]
    list: bool,

    /// Extract one or more files
    #[arg(short = 'd', long)]
    extract: bool,

    /// Store the regular files inside directory arguments
    #[arg(short, long)]
    recursive: bool,

    #[arg(short, long)]
    verbose: bool,

    /// Block size as a power of 2 [default: 12, or archive.block_size from config]
    #[arg(short, long, value_name = "POWER")]
    block_size: Option<u8>,

    /// Resolve input paths (and a relative ARCHIVE) against this directory
    #[arg(short = 'C', long, value_name = "DIR")]
    change_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    #[cfg(unix)]
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }

    let cli = Cli::parse();

    // Only creation resolves paths against --change-dir.
    let base = if cli.list || cli.extract {
        resolve_base(None)?
    } else {
        resolve_base(cli.change_dir.as_deref())?
    };
    let config = Config::load_from(&base).context("Failed to load config")?;

    let configured: LogLevel = config
        .logging
        .level
        .parse()
        .map_err(anyhow::Error::msg)
        .context("Invalid logging.level in config")?;
    let level = if cli.verbose { LogLevel::Info } else { configured };
    init_logging(level);

    if cli.list {
        list::run(&cli.output, cli.verbose)
    } else if cli.extract {
        bail!("extraction is not supported yet")
    } else {
        let opts = create::CreateOptions {
            output: base.join(&cli.output),
            files: cli.files,
            recursive: cli.recursive,
            verbose: cli.verbose,
            block_size: cli.block_size.unwrap_or(config.archive.block_size),
        };
        create::run(&base, &opts)
    }
}
