//! # store contract: interface for archive upload and reconciliation
//!
//! This module defines the single trait (`ArchiveStore`) the pipeline needs
//! from a storage backend: upload an archive together with its checksum, and
//! report the checksum already recorded for a key. Keeping the seam this
//! narrow lets the reconciliation loop run against the real object-store
//! client, a local filesystem store, or a mock.
//!
//! ## Mocking & Testing
//! - The trait is annotated for `mockall` so consumers can generate
//!   deterministic mocks for unit/integration tests (behind the
//!   `test-export-mocks` feature, like every other seam in this workspace).
//!
//! ## Adding New Backends
//! - Implement the trait for your backend.
//! - Convert all meaningful upstream errors to a boxed error; `None` from
//!   `stored_checksum` must mean "no archive recorded", never a swallowed
//!   transport failure.

use async_trait::async_trait;
use mockall::automock;
use std::path::Path;

/// Boxed error type used across the store seam.
pub type StoreSeamError = Box<dyn std::error::Error + Send + Sync>;

/// Trait for uploading archives and reading back their recorded checksums.
/// The implementor is responsible for connecting to a backing service or
/// storage API.
///
/// The trait is implemented by real clients and by test mocks.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ArchiveStore: Send + Sync {
    /// Upload the staged archive at `file` under `key`, recording `md5`
    /// (base64) as its checksum. Must not return before both are durable.
    async fn put_archive(&self, key: &str, file: &Path, md5: &str)
        -> Result<(), StoreSeamError>;

    /// The base64 md5 recorded for `key`, or `None` when no archive exists.
    /// An archive that exists without a recorded checksum is an error, not
    /// `None`.
    async fn stored_checksum(&self, key: &str) -> Result<Option<String>, StoreSeamError>;

    /// Human-facing location of `key`, e.g. `s3://host/bucket/prefix/key`.
    /// Quoted in the retrieval notice.
    fn location(&self, key: &str) -> String;
}
