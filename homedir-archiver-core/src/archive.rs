//! Reproducible tar.gz staging for a directory, ahead of upload.
//!
//! Archives are built with the system `tar` so that re-archiving unchanged
//! content yields identical bytes: members sorted by name, numeric owners,
//! and gzip fed through a pipe (no input mtime in the gzip header). The
//! staging directory lives under the system temp location, so `TMPDIR`
//! selects where archives are staged.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::{fs, io};

use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("tar exited with {status} for `{dir}`: {output}")]
    Tar {
        dir: String,
        status: String,
        output: String,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// A staged archive. The staging directory is removed when this is dropped,
/// so keep it alive until the upload has finished.
#[derive(Debug)]
pub struct StagedArchive {
    staging: TempDir,
    path: PathBuf,
}

impl StagedArchive {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size in bytes of the compressed archive.
    pub fn len(&self) -> io::Result<u64> {
        Ok(fs::metadata(&self.path)?.len())
    }

    /// File name of the archive, e.g. `alice.tar.gz`.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn stage(&self) -> &Path {
        self.staging.path()
    }
}

/// Archive `dir` into a staged `<name>.tar.gz`, excluding `ignored` names.
pub fn archive_dir(dir: &Path, name: &str, ignored: &[String]) -> Result<StagedArchive, ArchiveError> {
    let staging = TempDir::new()?;
    let target = staging.path().join(format!("{name}.tar.gz"));

    let mut cmd = Command::new("tar");
    cmd.arg(format!("--directory={}", dir.display()))
        .arg("--sort=name")
        .arg("--numeric-owner")
        .arg("--create")
        .arg("--gzip")
        .arg(format!("--file={}", target.display()));
    for ignored_file in ignored {
        cmd.arg(format!("--exclude={ignored_file}"));
    }
    cmd.arg(".");

    debug!(dir = %dir.display(), target = %target.display(), "Invoking tar");
    // Capture output and fail explicitly on non-zero exit, primarily to keep
    // tar's "Removing leading `/'" chatter out of the run logs.
    let output = cmd.output()?;
    if !output.status.success() {
        return Err(ArchiveError::Tar {
            dir: dir.display().to_string(),
            status: output.status.to_string(),
            output: format!(
                "stdout: {} stderr: {}",
                String::from_utf8_lossy(&output.stdout).trim(),
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }

    let archive = StagedArchive {
        staging,
        path: target,
    };
    info!(
        dir = %dir.display(),
        archive = %archive.path().display(),
        stage = %archive.stage().display(),
        "Staged archive"
    );
    Ok(archive)
}
