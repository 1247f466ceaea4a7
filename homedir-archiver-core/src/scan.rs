use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::Path;
use std::time::SystemTime;

use tracing::trace;

/// Result of a staleness scan over one directory tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// A regular file at or after the cutoff was found, or an ignored file
    /// name is present (the directory was already handled by a delete pass).
    Active,
    /// No fresh regular file anywhere in the tree; `bytes` is the accumulated
    /// size of the tree's files and directory entries.
    Stale { bytes: u64 },
}

/// Walk `path` once, deciding staleness and accumulating size together.
///
/// Only regular files are tested against the cutoff. Directory mtimes are not
/// consulted, so notice files and file deletions in a parent do not keep a
/// tree active. Symlinks and special files are skipped for the freshness test
/// (tar archives them regardless). Files in a directory are checked before
/// recursing, so an active tree is abandoned without walking all of it.
pub fn scan_dir(path: &Path, cutoff: SystemTime, ignored: &[String]) -> io::Result<ScanOutcome> {
    let mut total = path.symlink_metadata()?.len();
    let mut subdirs = Vec::new();

    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let name = entry.file_name();
        if ignored.iter().any(|i| name.as_os_str() == OsStr::new(i)) {
            trace!(path = %entry.path().display(), "Ignored file name present, tree counts as active");
            return Ok(ScanOutcome::Active);
        }
        let file_type = entry.file_type()?;
        if file_type.is_file() {
            let meta = entry.metadata()?;
            if meta.modified()? >= cutoff {
                trace!(path = %entry.path().display(), "Fresh file found, tree is active");
                return Ok(ScanOutcome::Active);
            }
            total += meta.len();
        } else if file_type.is_dir() {
            subdirs.push(entry.path());
        }
    }

    for subdir in subdirs {
        match scan_dir(&subdir, cutoff, ignored)? {
            ScanOutcome::Active => return Ok(ScanOutcome::Active),
            ScanOutcome::Stale { bytes } => total += bytes,
        }
    }

    Ok(ScanOutcome::Stale { bytes: total })
}
