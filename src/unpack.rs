//! Extract a fetched branch archive into its package directory.
//!
//! GitHub branch archives put everything under a single `<base>-<branch>/`
//! directory. Extraction rewrites that prefix to the package directory name
//! `<base>#<branch>/`, then stamps the package with an ignore file and a
//! version marker.

use std::fs::File;
use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use zip::ZipArchive;

use crate::marker;
use crate::paths::PackagePaths;
use crate::reconcile::remove_path;
use crate::types::PackageKey;

/// Ignore rules written into each package: hide everything but package.json.
pub const IGNORE_RULES: &str = "*\n!package.json\n";

/// Errors returned while unpacking an archive.
#[derive(Error, Debug)]
pub enum UnpackError {
    /// An entry sits outside `<base>-<branch>/` or escapes the package directory.
    #[error("{key} has malformed entry {entry}")]
    MalformedEntry { key: PackageKey, entry: String },
    /// The archive itself could not be read.
    #[error("cannot read archive {}: {source}", .path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
    /// A filesystem operation failed.
    #[error("io error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> UnpackError + '_ {
    move |source| UnpackError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Map an archive entry name onto a path relative to the package directory.
///
/// Returns None if the entry is outside `prefix` or its remainder is not a
/// plain relative path. The bare prefix maps to an empty path.
fn relative_entry_path(name: &str, prefix: &str) -> Option<PathBuf> {
    let rest = name.strip_prefix(prefix)?;
    let relative = PathBuf::from(rest);
    if relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
    {
        Some(relative)
    } else {
        None
    }
}

/// Replace the package directory for `key` with the contents of `archive_path`.
///
/// Every entry name is checked before anything is written, so a malformed
/// archive leaves no extracted files behind. On success the archive is deleted.
pub fn unpack_archive(
    paths: &PackagePaths,
    key: &PackageKey,
    archive_path: &Path,
    tool_version: &str,
) -> Result<(), UnpackError> {
    let package_dir = paths.package_dir(key);
    remove_path(&package_dir).map_err(io_error(&package_dir))?;

    let file = File::open(archive_path).map_err(io_error(archive_path))?;
    let mut archive = ZipArchive::new(file).map_err(|source| UnpackError::Archive {
        path: archive_path.to_path_buf(),
        source,
    })?;

    let prefix = key.archive_prefix();
    let mut targets = Vec::with_capacity(archive.len());
    for name in archive.file_names() {
        let relative =
            relative_entry_path(name, &prefix).ok_or_else(|| UnpackError::MalformedEntry {
                key: key.clone(),
                entry: name.to_string(),
            })?;
        targets.push((name.to_string(), relative, name.ends_with('/')));
    }

    std::fs::create_dir_all(&package_dir).map_err(io_error(&package_dir))?;

    let mut written = 0usize;
    for (name, relative, is_dir) in targets {
        let dest = package_dir.join(&relative);
        if is_dir {
            std::fs::create_dir_all(&dest).map_err(io_error(&dest))?;
            continue;
        }
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(io_error(parent))?;
        }

        let mut entry = archive
            .by_name(&name)
            .map_err(|source| UnpackError::Archive {
                path: archive_path.to_path_buf(),
                source,
            })?;
        let mut out = File::create(&dest).map_err(io_error(&dest))?;
        io::copy(&mut entry, &mut out).map_err(io_error(&dest))?;
        written += 1;
    }
    log::debug!("Extracted {} files into {}", written, package_dir.display());

    let ignore_path = paths.ignore_path(key);
    std::fs::write(&ignore_path, IGNORE_RULES).map_err(io_error(&ignore_path))?;

    let marker_path = paths.marker_path(key);
    marker::write_version(&marker_path, tool_version).map_err(io_error(&marker_path))?;

    std::fs::remove_file(archive_path).map_err(io_error(archive_path))?;
    Ok(())
}
