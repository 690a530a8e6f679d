//! Package directory path management
//!
//! This module provides the `PackagePaths` struct which manages all filesystem
//! paths for the packages directory layout:
//!
//! ```text
//! packages/
//! ├── config.json                 # Manifest (never pruned)
//! ├── <base>#<branch>/            # One directory per manifest entry
//! │   ├── ...                     # Extracted archive contents
//! │   ├── .gitignore              # Ignores everything but package.json
//! │   └── tinkerforge.json        # Version marker
//! ├── <base>#<branch>.zip         # Fetched archive (deleted after unpack)
//! └── <base>#<branch>.zip.tmp     # In-flight download
//! ```

use std::path::{Path, PathBuf};

use crate::types::PackageKey;

/// File name of the manifest inside the packages root.
pub const MANIFEST_FILE_NAME: &str = "config.json";

/// File name of the version marker inside each package directory.
pub const MARKER_FILE_NAME: &str = "tinkerforge.json";

/// File name of the ignore rules inside each package directory.
pub const IGNORE_FILE_NAME: &str = ".gitignore";

/// Manages all filesystem paths for the packages directory layout
#[derive(Debug, Clone)]
pub struct PackagePaths {
    root: PathBuf,
}

impl PackagePaths {
    /// Creates a new PackagePaths with the specified root directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the packages root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the default manifest path: `{root}/config.json`
    pub fn default_manifest(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE_NAME)
    }

    /// Returns the package directory: `{root}/{base}#{branch}`
    pub fn package_dir(&self, key: &PackageKey) -> PathBuf {
        self.root.join(key.to_string())
    }

    /// Returns the version marker path: `{root}/{base}#{branch}/tinkerforge.json`
    pub fn marker_path(&self, key: &PackageKey) -> PathBuf {
        self.package_dir(key).join(MARKER_FILE_NAME)
    }

    /// Returns the ignore file path: `{root}/{base}#{branch}/.gitignore`
    pub fn ignore_path(&self, key: &PackageKey) -> PathBuf {
        self.package_dir(key).join(IGNORE_FILE_NAME)
    }

    /// Returns the fetched archive path: `{root}/{base}#{branch}.zip`
    pub fn archive_path(&self, key: &PackageKey) -> PathBuf {
        self.root.join(format!("{}.zip", key))
    }

    /// Returns the in-flight download path: `{root}/{base}#{branch}.zip.tmp`
    pub fn temp_archive_path(&self, key: &PackageKey) -> PathBuf {
        self.root.join(format!("{}.zip.tmp", key))
    }
}

impl Default for PackagePaths {
    /// Packages live in `packages/` relative to the invocation directory.
    fn default() -> Self {
        Self::new("packages")
    }
}
