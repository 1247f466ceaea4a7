//! Per-directory pipeline: scan → stage archive → reconcile with the store →
//! optionally notice-and-delete.
//!
//! The reconciliation loop is what makes repeated runs safe:
//!   1. If there is no object currently in storage, the freshly created
//!      archive is uploaded together with its checksum.
//!   2. If the recorded remote checksum equals the local archive's, there is
//!      nothing to do.
//!   3. If a remote archive exists with a different checksum (or with no
//!      recorded checksum at all), that directory fails hard and is never
//!      deleted in that state.
//!
//! Deletion is therefore only reached in the same invocation that verified
//! the upload; a delete pass never trusts an earlier run.

use serde::Serialize;
use std::ffi::OsStr;
use std::path::Path;
use std::time::SystemTime;
use std::{fs, io};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::archive::{archive_dir, ArchiveError};
use crate::checksum::md5_base64;
use crate::config::RunConfig;
use crate::contract::{ArchiveStore, StoreSeamError};
use crate::notice::render_notice;
use crate::scan::{scan_dir, ScanOutcome};

#[derive(Debug, Clone, Serialize)]
pub enum Upload {
    /// The archive was missing remotely and has been uploaded.
    Uploaded,
    /// The remote archive already matched the local content.
    Validated,
}

#[derive(Debug, Clone, Serialize)]
pub enum DirOutcome {
    /// A fresh file (or a notice from an earlier delete pass) was found; the
    /// walk aborts early, so no size is reported.
    Active,
    /// Stale, but at or above the size cap; never archived or deleted.
    TooBig { bytes: u64 },
    Archived {
        /// Accumulated size of the source tree.
        bytes: u64,
        /// Size of the compressed archive.
        archive_bytes: u64,
        upload: Upload,
        deleted: bool,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct DirReport {
    pub name: String,
    pub outcome: DirOutcome,
}

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("directory `{0}` has no usable name")]
    BadName(String),
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error("store operation failed for `{key}`: {source}")]
    Store {
        key: String,
        #[source]
        source: StoreSeamError,
    },
    #[error(
        "remote archive `{key}` does not match local content: local {local}, remote {remote}"
    )]
    ChecksumMismatch {
        key: String,
        local: String,
        remote: String,
    },
    #[error("blocking task failed: {0}")]
    Task(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Run the full pipeline for one directory.
pub async fn process_dir<S>(
    config: &RunConfig,
    store: &S,
    dir: &Path,
) -> Result<DirReport, ProcessError>
where
    S: ArchiveStore + ?Sized,
{
    let name = dir
        .file_name()
        .and_then(OsStr::to_str)
        .map(str::to_owned)
        .ok_or_else(|| ProcessError::BadName(dir.display().to_string()))?;
    let ignored = config.ignored_filenames();
    let cutoff: SystemTime = config.cutoff.into();

    let scan_path = dir.to_path_buf();
    let scan_ignored = ignored.clone();
    let outcome =
        tokio::task::spawn_blocking(move || scan_dir(&scan_path, cutoff, &scan_ignored))
            .await
            .map_err(|e| ProcessError::Task(e.to_string()))??;

    let bytes = match outcome {
        ScanOutcome::Active => {
            info!(dir = %name, "Active, skipped");
            return Ok(DirReport {
                name,
                outcome: DirOutcome::Active,
            });
        }
        ScanOutcome::Stale { bytes } => bytes,
    };
    if bytes >= config.max_source_bytes {
        info!(dir = %name, bytes, "Too big, skipped");
        return Ok(DirReport {
            name,
            outcome: DirOutcome::TooBig { bytes },
        });
    }

    // Stage and digest on a blocking thread; tarring is CPU bound.
    let stage_path = dir.to_path_buf();
    let stage_name = name.clone();
    let stage_ignored = ignored.clone();
    let (archive, local_md5) =
        tokio::task::spawn_blocking(move || -> Result<_, ProcessError> {
            let archive = archive_dir(&stage_path, &stage_name, &stage_ignored)?;
            let md5 = md5_base64(archive.path())?;
            Ok((archive, md5))
        })
        .await
        .map_err(|e| ProcessError::Task(e.to_string()))??;

    let archive_bytes = archive.len()?;
    let key = archive.file_name();
    debug!(dir = %name, key = %key, archive_bytes, md5 = %local_md5, "Archive staged, reconciling");

    let remote = store
        .stored_checksum(&key)
        .await
        .map_err(|source| ProcessError::Store {
            key: key.clone(),
            source,
        })?;
    let upload = match remote {
        None => {
            store
                .put_archive(&key, archive.path(), &local_md5)
                .await
                .map_err(|source| ProcessError::Store {
                    key: key.clone(),
                    source,
                })?;
            info!(dir = %name, key = %key, "Uploaded");
            Upload::Uploaded
        }
        Some(remote) if remote == local_md5 => {
            info!(dir = %name, key = %key, "Validated");
            Upload::Validated
        }
        Some(remote) => {
            error!(dir = %name, key = %key, local = %local_md5, remote = %remote, "Remote archive does not match local content");
            return Err(ProcessError::ChecksumMismatch {
                key,
                local: local_md5,
                remote,
            });
        }
    };

    let mut deleted = false;
    if config.delete {
        // Only reached once the upload above was verified. Destructive.
        let location = store.location(&key);
        let delete_path = dir.to_path_buf();
        let delete_ignored = ignored.clone();
        let notice_name = config.notice_file_name.clone();
        tokio::task::spawn_blocking(move || {
            delete_contents(&delete_path, &notice_name, &location, &delete_ignored)
        })
        .await
        .map_err(|e| ProcessError::Task(e.to_string()))??;
        deleted = true;
        info!(dir = %name, "Notice dropped and contents deleted");
    }

    Ok(DirReport {
        name,
        outcome: DirOutcome::Archived {
            bytes,
            archive_bytes,
            upload,
            deleted,
        },
    })
}

/// Write the retrieval notice, then remove every child except ignored names.
/// The notice file name is itself in the ignored set, so it survives.
fn delete_contents(
    dir: &Path,
    notice_file_name: &str,
    location: &str,
    ignored: &[String],
) -> io::Result<()> {
    let notice_path = dir.join(notice_file_name);
    fs::write(&notice_path, render_notice(location))?;

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if ignored
            .iter()
            .any(|i| entry.file_name().as_os_str() == OsStr::new(i))
        {
            continue;
        }
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(entry.path())?;
        } else {
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}
