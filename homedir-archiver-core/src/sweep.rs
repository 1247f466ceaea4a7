//! Top-level sweep: enumerate candidate directories under the root and run
//! the per-directory pipeline over them with bounded concurrency.
//!
//! # Responsibilities
//! - Candidate selection: immediate subdirectories of the root, symlinks
//!   excluded, optionally restricted to a single user.
//! - Fan-out: directories are processed concurrently up to the configured
//!   limit; one directory's failure never halts the others.
//! - Aggregation: per-directory reports and failures are collected into a
//!   [`SweepReport`] with aggregate counters and byte totals, logged as a
//!   closing summary. Callers decide how failures affect the process exit.
//!
//! # Callable From
//! - Used by the CLI crate and integration tests, against the real
//!   object-store client or a mock.

use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::path::PathBuf;
use std::{fs, io};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::config::RunConfig;
use crate::contract::ArchiveStore;
use crate::process::{process_dir, DirOutcome, DirReport, Upload};

#[derive(Debug, Clone, Serialize)]
pub struct DirFailure {
    pub name: String,
    pub error: String,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct SweepTotals {
    pub active: usize,
    pub too_big: usize,
    pub archived: usize,
    pub uploaded: usize,
    pub validated: usize,
    pub deleted: usize,
    pub failed: usize,
    /// Accumulated source size of stale directories.
    pub stale_bytes: u64,
    /// Compressed size of their archives.
    pub archive_bytes: u64,
}

#[derive(Debug, Serialize)]
pub struct SweepReport {
    pub reports: Vec<DirReport>,
    pub failures: Vec<DirFailure>,
    pub totals: SweepTotals,
}

#[derive(Debug, Error)]
pub enum SweepError {
    #[error("failed to read root directory `{path}`: {source}")]
    ReadRoot {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("user directory `{0}` does not exist or is not a directory")]
    UserNotFound(String),
}

/// Process every candidate directory under the root. Per-directory failures
/// are collected, not propagated.
pub async fn sweep<S>(config: &RunConfig, store: &S) -> Result<SweepReport, SweepError>
where
    S: ArchiveStore + ?Sized,
{
    let dirs = candidate_dirs(config)?;
    info!(candidates = dirs.len(), "Starting sweep");

    let results: Vec<(String, Result<DirReport, crate::process::ProcessError>)> =
        stream::iter(dirs.into_iter().map(|dir| {
            let name = dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| dir.display().to_string());
            async move {
                let result = process_dir(config, store, &dir).await;
                (name, result)
            }
        }))
        .buffer_unordered(config.concurrency.max(1))
        .collect()
        .await;

    let mut reports = Vec::new();
    let mut failures = Vec::new();
    let mut totals = SweepTotals::default();
    for (name, result) in results {
        match result {
            Ok(report) => {
                match &report.outcome {
                    DirOutcome::Active => totals.active += 1,
                    DirOutcome::TooBig { .. } => totals.too_big += 1,
                    DirOutcome::Archived {
                        bytes,
                        archive_bytes,
                        upload,
                        deleted,
                    } => {
                        totals.archived += 1;
                        totals.stale_bytes += bytes;
                        totals.archive_bytes += archive_bytes;
                        match upload {
                            Upload::Uploaded => totals.uploaded += 1,
                            Upload::Validated => totals.validated += 1,
                        }
                        if *deleted {
                            totals.deleted += 1;
                        }
                    }
                }
                reports.push(report);
            }
            Err(e) => {
                error!(dir = %name, error = %e, "Directory processing failed");
                totals.failed += 1;
                failures.push(DirFailure {
                    name,
                    error: e.to_string(),
                });
            }
        }
    }
    reports.sort_by(|a, b| a.name.cmp(&b.name));
    failures.sort_by(|a, b| a.name.cmp(&b.name));

    let report = SweepReport {
        reports,
        failures,
        totals,
    };
    info!(totals = ?report.totals, "Sweep complete");
    match serde_json::to_string_pretty(&report) {
        Ok(json) => debug!(json = %json, "Sweep report"),
        Err(e) => error!(error = ?e, "Failed to serialize sweep report"),
    }
    Ok(report)
}

/// Immediate subdirectories of the root, sorted by name. Symlinked entries
/// are never candidates. With a user restriction, exactly that directory.
fn candidate_dirs(config: &RunConfig) -> Result<Vec<PathBuf>, SweepError> {
    if let Some(user) = &config.user {
        let dir = config.root_dir.join(user);
        let meta = fs::symlink_metadata(&dir)
            .map_err(|_| SweepError::UserNotFound(user.clone()))?;
        if !meta.is_dir() {
            return Err(SweepError::UserNotFound(user.clone()));
        }
        return Ok(vec![dir]);
    }

    let read_root_err = |source: io::Error| SweepError::ReadRoot {
        path: config.root_dir.display().to_string(),
        source,
    };
    let mut dirs = Vec::new();
    for entry in fs::read_dir(&config.root_dir).map_err(read_root_err)? {
        let entry = entry.map_err(read_root_err)?;
        // file_type does not follow symlinks, so symlinked homes are skipped
        if entry.file_type().map_err(read_root_err)?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}
