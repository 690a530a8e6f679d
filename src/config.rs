//! Run configuration and manifest loading.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::paths::PackagePaths;
use crate::types::{PackageKey, ParseError};

/// Errors returned while loading the manifest.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// The manifest file could not be read.
    #[error("cannot read manifest {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The manifest is not a JSON array of `{base, branch, url}` objects.
    #[error("malformed manifest {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// An entry's base or branch cannot be used as a package name.
    #[error("manifest entry {index} ({base}#{branch}): {source}")]
    InvalidEntry {
        index: usize,
        base: String,
        branch: String,
        #[source]
        source: ParseError,
    },
}

/// Everything a run needs to know, resolved once at startup.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub paths: PackagePaths,
    pub manifest_path: PathBuf,
    /// Stamped into every version marker; markers with any other value are stale.
    pub tool_version: String,
}

impl SyncConfig {
    /// Configuration rooted at `packages_root` with the manifest inside it.
    pub fn new(packages_root: impl Into<PathBuf>) -> Self {
        let paths = PackagePaths::new(packages_root);
        Self {
            manifest_path: paths.default_manifest(),
            paths,
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn with_manifest(mut self, manifest_path: impl Into<PathBuf>) -> Self {
        self.manifest_path = manifest_path.into();
        self
    }

    pub fn with_tool_version(mut self, version: impl Into<String>) -> Self {
        self.tool_version = version.into();
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new(PackagePaths::default().root())
    }
}

/// One configured package as written in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ManifestEntry {
    pub base: String,
    pub branch: String,
    /// Repository URL, e.g. `https://github.com/owner/repo`.
    pub url: String,
}

impl ManifestEntry {
    /// Branch snapshot URL: `{url}/archive/refs/heads/{branch}.zip`
    pub fn archive_url(&self) -> String {
        format!(
            "{}/archive/refs/heads/{}.zip",
            self.url.trim_end_matches('/'),
            self.branch
        )
    }
}

/// Manifest entries indexed by identity key.
pub type Manifest = BTreeMap<PackageKey, ManifestEntry>;

/// Read and index the manifest at `path`.
pub fn load_manifest(path: &Path) -> Result<Manifest, ManifestError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_manifest(&contents).map_err(|err| match err {
        ManifestError::Malformed { source, .. } => ManifestError::Malformed {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })
}

fn parse_manifest(contents: &str) -> Result<Manifest, ManifestError> {
    let entries: Vec<ManifestEntry> =
        serde_json::from_str(contents).map_err(|source| ManifestError::Malformed {
            path: PathBuf::new(),
            source,
        })?;

    let mut manifest = Manifest::new();
    for (index, entry) in entries.into_iter().enumerate() {
        let key = PackageKey::new(&entry.base, &entry.branch).map_err(|source| {
            ManifestError::InvalidEntry {
                index,
                base: entry.base.clone(),
                branch: entry.branch.clone(),
                source,
            }
        })?;
        if manifest.insert(key.clone(), entry).is_some() {
            log::warn!("Manifest lists {} more than once, using the last entry", key);
        }
    }

    log::debug!("Manifest has {} packages", manifest.len());
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parses_entries_into_keyed_map() {
        let manifest = parse_manifest(
            r#"[
                {"base": "foo", "branch": "master", "url": "https://example.com/foo"},
                {"base": "bar", "branch": "dev", "url": "https://example.com/bar"}
            ]"#,
        )
        .unwrap();

        assert_eq!(manifest.len(), 2);
        let foo = &manifest[&"foo#master".parse::<PackageKey>().unwrap()];
        assert_eq!(foo.url, "https://example.com/foo");
        assert!(manifest.contains_key(&"bar#dev".parse::<PackageKey>().unwrap()));
    }

    #[test]
    fn empty_array_is_empty_manifest() {
        assert!(parse_manifest("[]").unwrap().is_empty());
    }

    #[test]
    fn duplicate_keys_keep_last_entry() {
        let manifest = parse_manifest(
            r#"[
                {"base": "foo", "branch": "master", "url": "https://old.example.com/foo"},
                {"base": "foo", "branch": "master", "url": "https://new.example.com/foo"}
            ]"#,
        )
        .unwrap();

        assert_eq!(manifest.len(), 1);
        let entry = manifest.values().next().unwrap();
        assert_eq!(entry.url, "https://new.example.com/foo");
    }

    #[test]
    fn rejects_non_array() {
        let err = parse_manifest(r#"{"base": "foo"}"#).unwrap_err();
        assert!(matches!(err, ManifestError::Malformed { .. }));
    }

    #[test]
    fn rejects_missing_field() {
        let err = parse_manifest(r#"[{"base": "foo", "branch": "master"}]"#).unwrap_err();
        assert!(matches!(err, ManifestError::Malformed { .. }));
    }

    #[test]
    fn rejects_unusable_branch() {
        let err = parse_manifest(
            r#"[{"base": "foo", "branch": "feature/x", "url": "https://example.com/foo"}]"#,
        )
        .unwrap_err();
        match err {
            ManifestError::InvalidEntry { index, branch, .. } => {
                assert_eq!(index, 0);
                assert_eq!(branch, "feature/x");
            }
            other => panic!("Expected InvalidEntry, got {:?}", other),
        }
    }

    #[test]
    fn load_reports_path_on_parse_failure() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();

        match load_manifest(&path).unwrap_err() {
            ManifestError::Malformed { path: p, .. } => assert_eq!(p, path),
            other => panic!("Expected Malformed, got {:?}", other),
        }
    }

    #[test]
    fn load_missing_file_is_read_error() {
        let dir = tempdir().unwrap();
        let err = load_manifest(&dir.path().join("config.json")).unwrap_err();
        assert!(matches!(err, ManifestError::Read { .. }));
    }

    #[test]
    fn archive_url_follows_branch_layout() {
        let entry = ManifestEntry {
            base: "foo".into(),
            branch: "master".into(),
            url: "https://github.com/acme/foo/".into(),
        };
        assert_eq!(
            entry.archive_url(),
            "https://github.com/acme/foo/archive/refs/heads/master.zip"
        );
    }

    #[test]
    fn config_defaults_to_packages_dir() {
        let config = SyncConfig::default();
        assert_eq!(config.paths.root(), Path::new("packages"));
        assert_eq!(config.manifest_path, Path::new("packages").join("config.json"));
        assert_eq!(config.tool_version, env!("CARGO_PKG_VERSION"));
    }
}
