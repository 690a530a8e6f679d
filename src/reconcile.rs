//! Compare the manifest against the packages directory.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::{Manifest, SyncConfig};
use crate::marker;
use crate::types::PackageKey;

/// What a run has to do to make the packages directory mirror the manifest.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncPlan {
    /// Directory entries with no manifest counterpart, by raw file name.
    pub extraneous: Vec<OsString>,
    /// Packages whose marker matches the tool version.
    pub current: Vec<PackageKey>,
    /// Packages that are missing or carry an outdated marker.
    pub stale: Vec<PackageKey>,
}

impl SyncPlan {
    pub fn is_noop(&self) -> bool {
        self.extraneous.is_empty() && self.stale.is_empty()
    }
}

/// Scan the packages root and classify every entry. Touches nothing.
///
/// A missing packages root means every manifest entry is stale.
pub fn plan(config: &SyncConfig, manifest: &Manifest) -> io::Result<SyncPlan> {
    let root = config.paths.root();
    let mut plan = SyncPlan::default();
    let mut seen = BTreeSet::new();

    let entries = match std::fs::read_dir(root) {
        Ok(entries) => Some(entries),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => return Err(e),
    };

    for entry in entries.into_iter().flatten() {
        let entry = entry?;
        let path = entry.path();
        if is_manifest(&path, &config.manifest_path) {
            continue;
        }

        let name = entry.file_name();
        match name.to_str().and_then(|s| s.parse::<PackageKey>().ok()) {
            Some(key) if manifest.contains_key(&key) => {
                seen.insert(key);
            }
            _ => plan.extraneous.push(name),
        }
    }
    plan.extraneous.sort();

    for key in manifest.keys() {
        let marker_path = config.paths.marker_path(key);
        if seen.contains(key) && marker::is_current(&marker_path, &config.tool_version) {
            plan.current.push(key.clone());
        } else {
            plan.stale.push(key.clone());
        }
    }

    Ok(plan)
}

fn is_manifest(path: &Path, manifest_path: &Path) -> bool {
    if path == manifest_path {
        return true;
    }
    match (std::fs::canonicalize(path), std::fs::canonicalize(manifest_path)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Remove a file or directory tree at `path`.
///
/// Returns false if there was nothing to remove.
pub fn remove_path(path: &Path) -> io::Result<bool> {
    let metadata = match std::fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };

    let result = if metadata.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };

    match result {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Display names and paths of the extraneous entries of `plan` under `root`.
///
/// The path is built from the raw file name, so entries that are not valid
/// UTF-8 still resolve to what is on disk.
pub fn extraneous_paths<'a>(
    root: &'a Path,
    plan: &'a SyncPlan,
) -> impl Iterator<Item = (Cow<'a, str>, PathBuf)> + 'a {
    plan.extraneous
        .iter()
        .map(move |name| (name.to_string_lossy(), root.join(name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ManifestEntry;
    use tempfile::TempDir;

    fn manifest_of(keys: &[&str]) -> Manifest {
        keys.iter()
            .map(|k| {
                let key: PackageKey = k.parse().unwrap();
                let entry = ManifestEntry {
                    base: key.base().to_string(),
                    branch: key.branch().to_string(),
                    url: format!("https://example.com/{}", key.base()),
                };
                (key, entry)
            })
            .collect()
    }

    fn setup() -> (TempDir, SyncConfig) {
        let dir = TempDir::new().unwrap();
        let config = SyncConfig::new(dir.path()).with_tool_version("1.0.0");
        std::fs::write(&config.manifest_path, "[]").unwrap();
        (dir, config)
    }

    #[test]
    fn empty_root_makes_everything_stale() {
        let (_dir, config) = setup();
        let manifest = manifest_of(&["foo#master", "bar#dev"]);

        let plan = plan(&config, &manifest).unwrap();
        assert!(plan.extraneous.is_empty());
        assert!(plan.current.is_empty());
        let expected: Vec<PackageKey> =
            vec!["bar#dev".parse().unwrap(), "foo#master".parse().unwrap()];
        assert_eq!(plan.stale, expected);
    }

    #[test]
    fn missing_root_makes_everything_stale() {
        let dir = TempDir::new().unwrap();
        let config = SyncConfig::new(dir.path().join("absent"));
        let plan = plan(&config, &manifest_of(&["foo#master"])).unwrap();
        assert_eq!(plan.stale.len(), 1);
    }

    #[test]
    fn manifest_file_is_never_extraneous() {
        let (_dir, config) = setup();
        let plan = plan(&config, &Manifest::new()).unwrap();
        assert!(plan.is_noop());
    }

    #[test]
    fn unknown_entries_are_extraneous() {
        let (dir, config) = setup();
        std::fs::create_dir(dir.path().join("old#master")).unwrap();
        std::fs::write(dir.path().join("foo#master.zip.tmp"), b"partial").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let plan = plan(&config, &Manifest::new()).unwrap();
        assert_eq!(
            plan.extraneous,
            vec!["foo#master.zip.tmp", "notes.txt", "old#master"]
        );
    }

    #[test]
    fn current_marker_skips_package() {
        let (_dir, config) = setup();
        let key: PackageKey = "foo#master".parse().unwrap();
        std::fs::create_dir(config.paths.package_dir(&key)).unwrap();
        marker::write_version(&config.paths.marker_path(&key), "1.0.0").unwrap();

        let plan = plan(&config, &manifest_of(&["foo#master"])).unwrap();
        assert_eq!(plan.current, vec![key]);
        assert!(plan.is_noop());
    }

    #[test]
    fn outdated_or_missing_marker_is_stale() {
        let (_dir, config) = setup();
        let old: PackageKey = "old#master".parse().unwrap();
        let bare: PackageKey = "bare#master".parse().unwrap();
        std::fs::create_dir(config.paths.package_dir(&old)).unwrap();
        std::fs::create_dir(config.paths.package_dir(&bare)).unwrap();
        marker::write_version(&config.paths.marker_path(&old), "0.9.0").unwrap();

        let plan = plan(&config, &manifest_of(&["old#master", "bare#master"])).unwrap();
        assert!(plan.current.is_empty());
        assert_eq!(plan.stale, vec![bare, old]);
    }

    #[test]
    fn file_residue_with_package_name_is_stale() {
        let (dir, config) = setup();
        std::fs::write(dir.path().join("foo#master"), b"residue").unwrap();

        let plan = plan(&config, &manifest_of(&["foo#master"])).unwrap();
        assert!(plan.extraneous.is_empty());
        assert_eq!(plan.stale.len(), 1);
    }

    #[test]
    fn remove_path_handles_dirs_files_and_absence() {
        let dir = TempDir::new().unwrap();
        let tree = dir.path().join("tree");
        std::fs::create_dir_all(tree.join("nested")).unwrap();
        std::fs::write(tree.join("nested").join("file"), b"x").unwrap();
        let file = dir.path().join("file");
        std::fs::write(&file, b"x").unwrap();

        assert!(remove_path(&tree).unwrap());
        assert!(!tree.exists());
        assert!(remove_path(&file).unwrap());
        assert!(!file.exists());
        assert!(!remove_path(&dir.path().join("missing")).unwrap());
    }

    #[test]
    fn extraneous_paths_join_root() {
        let plan = SyncPlan {
            extraneous: vec!["a".into()],
            ..SyncPlan::default()
        };
        let root = Path::new("pkgs");
        let paths: Vec<_> = extraneous_paths(root, &plan).collect();
        assert_eq!(paths, vec![(Cow::Borrowed("a"), root.join("a"))]);
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn non_utf8_entries_resolve_to_real_paths() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let (dir, config) = setup();
        let junk = dir.path().join(OsStr::from_bytes(b"junk\xff"));
        std::fs::write(&junk, b"x").unwrap();

        let plan = plan(&config, &Manifest::new()).unwrap();
        assert_eq!(plan.extraneous, vec![OsStr::from_bytes(b"junk\xff").to_os_string()]);

        let paths: Vec<_> = extraneous_paths(config.paths.root(), &plan).collect();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].0, "junk\u{fffd}");
        assert_eq!(paths[0].1, junk);
        assert!(remove_path(&paths[0].1).unwrap());
        assert!(!junk.exists());
    }
}
