use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

/// Default name of the retrieval notice dropped into a directory before its
/// contents are deleted. Always part of the ignored set.
pub const DEFAULT_NOTICE_FILE_NAME: &str = "WHERE-ARE-MY-FILES.txt";

/// Directories at or above this accumulated size are reported and skipped.
pub const DEFAULT_MAX_SOURCE_BYTES: u64 = 100_000_000_000;

/// Bound on concurrently processed directories.
pub const DEFAULT_CONCURRENCY: usize = 8;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Directory whose immediate subdirectories are the candidate home dirs.
    pub root_dir: PathBuf,
    /// A directory with no regular file modified at or after this instant is
    /// considered inactive.
    pub cutoff: DateTime<Utc>,
    /// Destructive pass: drop the notice and delete archived directories.
    pub delete: bool,
    /// Restrict the run to this single subdirectory of the root.
    pub user: Option<String>,
    /// Name of the notice file written before deletion.
    pub notice_file_name: String,
    /// Additional file names excluded from the freshness test and the archive.
    pub extra_ignored: Vec<String>,
    /// Skip directories whose accumulated size meets or exceeds this.
    pub max_source_bytes: u64,
    /// How many directories are processed at once.
    pub concurrency: usize,
}

impl RunConfig {
    /// File names excluded from the staleness test and the archive. The
    /// notice file name is always first.
    pub fn ignored_filenames(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(1 + self.extra_ignored.len());
        names.push(self.notice_file_name.clone());
        names.extend(self.extra_ignored.iter().cloned());
        names
    }

    pub fn trace_loaded(&self) {
        info!(
            root_dir = %self.root_dir.display(),
            cutoff = %self.cutoff,
            delete = self.delete,
            user = ?self.user,
            "Loaded RunConfig"
        );
        debug!(?self, "RunConfig loaded (full debug)");
    }
}
