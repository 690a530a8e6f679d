//! Version marker stamped into each unpacked package.

use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Contents of the marker file: `{"version": "<tool version>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionMarker {
    pub version: Option<String>,
}

/// Read the marker version at `path`.
///
/// Returns None if the marker is missing, unreadable, or not valid JSON;
/// any of those just means the package has to be fetched again.
pub fn read_version(path: &Path) -> Option<String> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            if e.kind() != io::ErrorKind::NotFound {
                log::debug!("Cannot read marker {}: {}", path.display(), e);
            }
            return None;
        }
    };

    match serde_json::from_str::<VersionMarker>(&contents) {
        Ok(marker) => marker.version,
        Err(e) => {
            log::debug!("Ignoring malformed marker {}: {}", path.display(), e);
            None
        }
    }
}

/// Whether the marker at `path` was written by `version`.
pub fn is_current(path: &Path, version: &str) -> bool {
    read_version(path).as_deref() == Some(version)
}

/// Write a marker for `version` at `path`, replacing any existing one.
pub fn write_version(path: &Path, version: &str) -> io::Result<()> {
    let marker = VersionMarker {
        version: Some(version.to_string()),
    };
    let json = serde_json::to_string(&marker).map_err(io::Error::other)?;
    std::fs::write(path, json)
}
