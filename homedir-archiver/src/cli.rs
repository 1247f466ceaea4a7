/// This module implements the CLI interface for homedir-archiver: argument
/// parsing, validation, and the async entrypoint.
///
/// All archiving logic (scanning, staging, reconciliation, deletion) lives in
/// the `homedir-archiver-core` crate. This module is strictly CLI glue and
/// orchestration.
///
/// The surface is positional (`root_dir days_ago destination`) so the tool
/// can be driven from cron entries and thin wrapper scripts, with flags only
/// for the destructive and situational options.
use crate::load_config::load_config;
use anyhow::Result;
use chrono::{Duration, Utc};
use clap::Parser;
use homedir_archiver_core::config::{
    RunConfig, DEFAULT_CONCURRENCY, DEFAULT_MAX_SOURCE_BYTES, DEFAULT_NOTICE_FILE_NAME,
};
use homedir_archiver_core::store::ObjectStoreClient;
use homedir_archiver_core::sweep::{sweep, SweepReport};
use std::path::PathBuf;

/// CLI for homedir-archiver: archive inactive home directories to object
/// storage, and delete them once the upload is verified.
#[derive(Parser)]
#[clap(
    name = "homedir-archiver",
    version,
    about = "Archive inactive user home directories to object storage"
)]
pub struct Cli {
    /// Root directory containing user home directories
    pub root_dir: PathBuf,

    /// If a user directory was last touched this many days ago, it is
    /// considered inactive
    pub days_ago: i64,

    /// Destination to upload archived directories to:
    /// s3://host/bucket[/prefix], file:///path, or memory://
    pub destination: String,

    /// Drop a retrieval notice and delete archived directories
    #[clap(long)]
    pub delete: bool,

    /// Only perform the action for this user
    #[clap(long)]
    pub user: Option<String>,

    /// Name of file to create with instructions on how to retrieve the
    /// archive
    #[clap(long, default_value = DEFAULT_NOTICE_FILE_NAME)]
    pub notice_file_name: String,

    /// Optional YAML file with operational overrides (extra ignored file
    /// names, size cap, concurrency)
    #[clap(long)]
    pub config: Option<PathBuf>,
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    let knobs = match &cli.config {
        Some(path) => load_config(path)?,
        None => Default::default(),
    };

    let run_config = RunConfig {
        root_dir: cli.root_dir.clone(),
        cutoff: Utc::now() - Duration::days(cli.days_ago),
        delete: cli.delete,
        user: cli.user.clone(),
        notice_file_name: cli.notice_file_name.clone(),
        extra_ignored: knobs.ignored_filenames,
        max_source_bytes: knobs.max_source_bytes.unwrap_or(DEFAULT_MAX_SOURCE_BYTES),
        concurrency: knobs.concurrency.unwrap_or(DEFAULT_CONCURRENCY),
    };
    run_config.trace_loaded();

    let store = ObjectStoreClient::from_dsn(&cli.destination)?;

    let report = sweep(&run_config, &store).await?;
    surface(&report)
}

/// Log the closing summary and turn collected per-directory failures into a
/// non-zero exit.
fn surface(report: &SweepReport) -> Result<()> {
    tracing::info!(
        active = report.totals.active,
        archived = report.totals.archived,
        uploaded = report.totals.uploaded,
        validated = report.totals.validated,
        deleted = report.totals.deleted,
        failed = report.totals.failed,
        stale_bytes = report.totals.stale_bytes,
        archive_bytes = report.totals.archive_bytes,
        "Sweep finished"
    );
    if !report.failures.is_empty() {
        anyhow::bail!(
            "{} of {} directories failed, see logs for details",
            report.failures.len(),
            report.reports.len() + report.failures.len()
        );
    }
    Ok(())
}
