//! Download branch archives into the packages root.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::ManifestEntry;
use crate::paths::PackagePaths;
use crate::reconcile::remove_path;
use crate::types::PackageKey;

/// Errors returned while fetching an archive.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The server answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    /// The request never completed.
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },
    /// Writing the downloaded bytes failed.
    #[error("io error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The response body could not be streamed.
    #[error("reading response from {url} failed: {source}")]
    Body {
        url: String,
        #[source]
        source: io::Error,
    },
}

/// Where archive bytes come from.
pub trait ArchiveSource {
    /// Stream the resource at `url` into `dest`, returning the byte count.
    fn fetch(&self, url: &str, dest: &mut dyn Write) -> Result<u64, FetchError>;
}

/// Fetches archives over HTTP(S), relying on the transport's default timeouts.
pub struct HttpSource {
    agent: ureq::Agent,
    user_agent: String,
}

impl HttpSource {
    pub fn new(tool_version: &str) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().build(),
            user_agent: format!("update-packages/{}", tool_version),
        }
    }
}

impl ArchiveSource for HttpSource {
    fn fetch(&self, url: &str, dest: &mut dyn Write) -> Result<u64, FetchError> {
        let response = match self
            .agent
            .get(url)
            .set("User-Agent", &self.user_agent)
            .call()
        {
            Ok(response) => response,
            Err(ureq::Error::Status(status, _)) => {
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status,
                });
            }
            Err(ureq::Error::Transport(e)) => {
                return Err(FetchError::Transport {
                    url: url.to_string(),
                    reason: e.to_string(),
                });
            }
        };

        let mut reader = response.into_reader();
        io::copy(&mut reader, dest).map_err(|source| FetchError::Body {
            url: url.to_string(),
            source,
        })
    }
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> FetchError + '_ {
    move |source| FetchError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Download the branch archive for `key` and move it to its final path.
///
/// Leftover archives from earlier runs are removed first. The download
/// lands in the temporary path and is renamed into place only once complete.
pub fn download_archive(
    paths: &PackagePaths,
    key: &PackageKey,
    entry: &ManifestEntry,
    source: &dyn ArchiveSource,
) -> Result<PathBuf, FetchError> {
    let archive_path = paths.archive_path(key);
    let temp_path = paths.temp_archive_path(key);

    std::fs::create_dir_all(paths.root()).map_err(io_error(paths.root()))?;
    remove_path(&archive_path).map_err(io_error(&archive_path))?;
    remove_path(&temp_path).map_err(io_error(&temp_path))?;

    let url = entry.archive_url();
    log::debug!("Fetching {} into {}", url, temp_path.display());

    let result = fetch_to_file(source, &url, &temp_path);
    let bytes = match result {
        Ok(bytes) => bytes,
        Err(e) => {
            let _ = std::fs::remove_file(&temp_path);
            return Err(e);
        }
    };
    log::debug!("Fetched {} bytes for {}", bytes, key);

    std::fs::rename(&temp_path, &archive_path).map_err(io_error(&archive_path))?;
    Ok(archive_path)
}

fn fetch_to_file(source: &dyn ArchiveSource, url: &str, path: &Path) -> Result<u64, FetchError> {
    let file = File::create(path).map_err(io_error(path))?;
    let mut writer = BufWriter::new(file);
    let bytes = source.fetch(url, &mut writer)?;
    let file = writer
        .into_inner()
        .map_err(|e| FetchError::Io {
            path: path.to_path_buf(),
            source: e.into_error(),
        })?;
    file.sync_all().map_err(io_error(path))?;
    Ok(bytes)
}
