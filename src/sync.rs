//! Top-level driver: load, reconcile, fetch, unpack.
//!
//! Runs strictly in sequence and stops at the first error. A package is
//! fetched and unpacked to completion before the next one starts.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::{ManifestError, SyncConfig, load_manifest};
use crate::fetch::{ArchiveSource, FetchError, download_archive};
use crate::reconcile::{SyncPlan, extraneous_paths, plan, remove_path};
use crate::types::PackageKey;
use crate::unpack::{UnpackError, unpack_archive};

/// Errors that abort a run.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error("cannot scan packages directory {}: {source}", .path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot remove {}: {source}", .path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("downloading {key} failed: {source}")]
    Fetch {
        key: PackageKey,
        #[source]
        source: FetchError,
    },
    #[error(transparent)]
    Unpack(#[from] UnpackError),
}

/// What a completed run did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub removed: Vec<String>,
    pub skipped: Vec<PackageKey>,
    pub updated: Vec<PackageKey>,
}

/// Load the manifest and compute the plan without changing anything.
pub fn status(config: &SyncConfig) -> Result<SyncPlan, SyncError> {
    let manifest = load_manifest(&config.manifest_path)?;
    plan(config, &manifest).map_err(|source| SyncError::Scan {
        path: config.paths.root().to_path_buf(),
        source,
    })
}

/// Bring the packages directory in line with the manifest.
pub fn run(config: &SyncConfig, source: &dyn ArchiveSource) -> Result<SyncReport, SyncError> {
    println!("Updating packages");

    let manifest = load_manifest(&config.manifest_path)?;
    let plan = plan(config, &manifest).map_err(|source| SyncError::Scan {
        path: config.paths.root().to_path_buf(),
        source,
    })?;
    log::debug!(
        "Plan: {} extraneous, {} current, {} stale",
        plan.extraneous.len(),
        plan.current.len(),
        plan.stale.len()
    );

    let mut report = SyncReport::default();

    for (name, path) in extraneous_paths(config.paths.root(), &plan) {
        println!("Removing {}", name);
        let removed = remove_path(&path).map_err(|source| SyncError::Remove {
            path: path.clone(),
            source,
        })?;
        if removed {
            report.removed.push(name.into_owned());
        } else {
            log::warn!("{} disappeared before it could be removed", path.display());
        }
    }

    for key in &plan.current {
        println!("Skipping {}", key);
        report.skipped.push(key.clone());
    }

    for key in &plan.stale {
        let entry = &manifest[key];

        println!("Downloading {}", key);
        let archive_path = download_archive(&config.paths, key, entry, source).map_err(
            |source| SyncError::Fetch {
                key: key.clone(),
                source,
            },
        )?;

        println!("Unpacking {}", key);
        unpack_archive(&config.paths, key, &archive_path, &config.tool_version)?;
        log::info!("{} is now at version {}", key, config.tool_version);
        report.updated.push(key.clone());
    }

    Ok(report)
}
