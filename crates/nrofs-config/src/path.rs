//! Path helpers for turning input paths into archive names.
//!
//! Input paths are resolved against an explicit base directory rather than
//! by changing the process working directory.

use anyhow::{bail, Context, Result};
use std::path::{Component, Path, PathBuf};

/// Resolve the base directory input paths are relative to.
///
/// `None` means the current working directory. A relative directory is
/// taken relative to the current working directory.
pub fn resolve_base(change_dir: Option<&Path>) -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let base = match change_dir {
        Some(dir) => cwd.join(dir),
        None => return Ok(cwd),
    };
    if !base.is_dir() {
        bail!("Not a directory: {}", base.display());
    }
    Ok(base)
}

/// Normalize an input path into the name stored in an archive.
///
/// `.` components are dropped and separators collapse to a single `/`, so
/// `./a//b` and `a/b` name the same entry. Absolute paths keep their
/// leading `/`. Non-UTF-8 paths are rejected.
///
/// # Example
/// ```
/// use std::path::Path;
/// use nrofs_config::path::archive_name;
///
/// assert_eq!(archive_name(Path::new("./bin//init")).unwrap(), "bin/init");
/// ```
pub fn archive_name(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let mut parts: Vec<&str> = Vec::new();
    let mut absolute = false;

    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => absolute = true,
            Component::CurDir => {}
            Component::ParentDir => parts.push(".."),
            Component::Normal(part) => parts.push(
                part.to_str()
                    .with_context(|| format!("Path is not valid UTF-8: {}", path.display()))?,
            ),
        }
    }

    if parts.is_empty() {
        bail!("Path does not name a file: {}", path.display());
    }

    let joined = parts.join("/");
    Ok(if absolute {
        format!("/{}", joined)
    } else {
        joined
    })
}
