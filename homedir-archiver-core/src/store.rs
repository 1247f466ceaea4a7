//! Destination DSN parsing and the `object_store`-backed [`ArchiveStore`].
//!
//! Supported destinations:
//! - `file:///path`: local filesystem, created if absent
//! - `memory://`: in-memory store (tests)
//! - `s3://[access_key:secret_key@]host[:port]/bucket[/prefix]`: S3 or an
//!   S3-compatible endpoint (MinIO etc); credentials fall back to the
//!   standard `AWS_*` environment variables
//!
//! Each uploaded archive gets a `<key>.md5` sidecar object carrying its
//! base64 md5. Reconciliation reads the sidecar rather than backend ETags,
//! which are not md5 across backends and multipart uploads.

use async_trait::async_trait;
use bytes::Bytes;
use object_store::buffered::BufWriter;
use object_store::path::Path as ObjectPath;
use object_store::{aws::AmazonS3Builder, local::LocalFileSystem, memory::InMemory, ObjectStore};
use std::io;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;

use crate::contract::{ArchiveStore, StoreSeamError};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid destination DSN `{dsn}`: {reason}")]
    InvalidDsn { dsn: String, reason: String },
    #[error("archive `{key}` exists remotely but has no recorded checksum")]
    MissingChecksum { key: String },
    #[error("checksum object for `{key}` is not valid UTF-8")]
    BadChecksum { key: String },
    #[error(transparent)]
    ObjectStore(#[from] object_store::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Archive store over any `object_store` backend, addressed by DSN.
#[derive(Debug)]
pub struct ObjectStoreClient {
    store: Arc<dyn ObjectStore>,
    prefix: ObjectPath,
    /// Display form of the destination, without credentials.
    base: String,
}

impl ObjectStoreClient {
    /// Build a client from a destination DSN.
    pub fn from_dsn(dsn: &str) -> StoreResult<Self> {
        let url = Url::parse(dsn).map_err(|e| StoreError::InvalidDsn {
            dsn: dsn.to_string(),
            reason: e.to_string(),
        })?;

        let client = match url.scheme() {
            "file" => {
                let path = url.path();
                if path.is_empty() || path == "/" {
                    return Err(StoreError::InvalidDsn {
                        dsn: dsn.to_string(),
                        reason: "file DSN must specify a path: file:///path/to/storage".into(),
                    });
                }
                // /.data/storage is a relative path, /tmp/data stays absolute
                let path = if path.starts_with("/.") {
                    &path[1..]
                } else {
                    path
                };
                std::fs::create_dir_all(path)?;
                Self {
                    store: Arc::new(LocalFileSystem::new_with_prefix(path)?),
                    prefix: ObjectPath::default(),
                    base: format!("file://{path}"),
                }
            }
            "memory" => Self {
                store: Arc::new(InMemory::new()),
                prefix: ObjectPath::default(),
                base: "memory://".to_string(),
            },
            "s3" => {
                let (store, bucket, prefix) = build_s3(&url, dsn)?;
                let host = url.host_str().unwrap_or_default();
                let base = match url.port() {
                    Some(p) => format!("s3://{host}:{p}/{bucket}"),
                    None => format!("s3://{host}/{bucket}"),
                };
                Self {
                    store,
                    prefix,
                    base,
                }
            }
            scheme => {
                return Err(StoreError::InvalidDsn {
                    dsn: dsn.to_string(),
                    reason: format!(
                        "unsupported destination scheme: {scheme}. Supported: file, memory, s3"
                    ),
                })
            }
        };

        info!(destination = %client.base, prefix = %client.prefix, "Destination store ready");
        Ok(client)
    }

    fn full_path(&self, key: &str) -> ObjectPath {
        if self.prefix.as_ref().is_empty() {
            ObjectPath::from(key)
        } else {
            self.prefix.child(key)
        }
    }

    async fn put_archive_inner(&self, key: &str, file: &Path, md5: &str) -> StoreResult<()> {
        let archive_path = self.full_path(key);
        let mut reader = tokio::fs::File::open(file).await?;
        let mut writer = BufWriter::new(Arc::clone(&self.store), archive_path.clone());
        let written = tokio::io::copy(&mut reader, &mut writer).await?;
        writer.shutdown().await?;
        debug!(key, bytes = written, "Archive body uploaded");

        // The sidecar goes last: an archive without it is treated as a
        // conflict on later runs, not as a completed upload.
        let sidecar = self.full_path(&format!("{key}.md5"));
        self.store
            .put(&sidecar, Bytes::from(md5.as_bytes().to_vec()).into())
            .await?;
        info!(key, md5, "Archive and checksum uploaded");
        Ok(())
    }

    async fn stored_checksum_inner(&self, key: &str) -> StoreResult<Option<String>> {
        let sidecar = self.full_path(&format!("{key}.md5"));
        match self.store.get(&sidecar).await {
            Ok(result) => {
                let data = result.bytes().await?;
                let text =
                    String::from_utf8(data.to_vec()).map_err(|_| StoreError::BadChecksum {
                        key: key.to_string(),
                    })?;
                Ok(Some(text.trim().to_string()))
            }
            Err(object_store::Error::NotFound { .. }) => {
                // No recorded checksum. An archive body on its own means a
                // previous upload did not complete cleanly.
                match self.store.head(&self.full_path(key)).await {
                    Ok(_) => Err(StoreError::MissingChecksum {
                        key: key.to_string(),
                    }),
                    Err(object_store::Error::NotFound { .. }) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl ArchiveStore for ObjectStoreClient {
    async fn put_archive(&self, key: &str, file: &Path, md5: &str) -> Result<(), StoreSeamError> {
        self.put_archive_inner(key, file, md5)
            .await
            .map_err(Into::into)
    }

    async fn stored_checksum(&self, key: &str) -> Result<Option<String>, StoreSeamError> {
        self.stored_checksum_inner(key).await.map_err(Into::into)
    }

    fn location(&self, key: &str) -> String {
        let full = self.full_path(key);
        if self.base.ends_with("//") {
            format!("{}{}", self.base, full)
        } else {
            format!("{}/{}", self.base, full)
        }
    }
}

/// S3 builder from a DSN: `s3://[access_key:secret_key@]host[:port]/bucket[/prefix]`.
fn build_s3(url: &Url, dsn: &str) -> StoreResult<(Arc<dyn ObjectStore>, String, ObjectPath)> {
    let host = url.host_str().ok_or_else(|| StoreError::InvalidDsn {
        dsn: dsn.to_string(),
        reason: "missing s3 host".into(),
    })?;
    let port = url.port();

    let mut segments = url.path().trim_matches('/').splitn(2, '/');
    let bucket = segments.next().unwrap_or_default();
    if bucket.is_empty() {
        return Err(StoreError::InvalidDsn {
            dsn: dsn.to_string(),
            reason: "s3 DSN must specify a bucket: s3://host/bucket".into(),
        });
    }
    let prefix = match segments.next() {
        Some(rest) if !rest.is_empty() => ObjectPath::from(rest),
        _ => ObjectPath::default(),
    };

    let mut builder = AmazonS3Builder::new()
        .with_bucket_name(bucket)
        .with_region("us-east-1");

    let access_key = url.username();
    let secret_key = url.password().unwrap_or("");
    if !access_key.is_empty() {
        builder = builder
            .with_access_key_id(access_key)
            .with_secret_access_key(secret_key);
    }

    // Real S3 needs no custom endpoint; S3-compatibles (MinIO etc) do, and
    // require path-style URLs.
    if !host.contains("amazonaws.com") {
        let scheme = if port == Some(443) { "https" } else { "http" };
        let endpoint = match port {
            Some(p) => format!("{scheme}://{host}:{p}"),
            None => format!("{scheme}://{host}"),
        };
        builder = builder
            .with_endpoint(endpoint)
            .with_allow_http(true)
            .with_virtual_hosted_style_request(false);
    }

    if access_key.is_empty() {
        if let Ok(env_key) = std::env::var("AWS_ACCESS_KEY_ID") {
            builder = builder.with_access_key_id(env_key);
        }
        if let Ok(env_secret) = std::env::var("AWS_SECRET_ACCESS_KEY") {
            builder = builder.with_secret_access_key(env_secret);
        }
        if let Ok(env_region) = std::env::var("AWS_DEFAULT_REGION") {
            builder = builder.with_region(env_region);
        }
    }

    Ok((Arc::new(builder.build()?), bucket.to_string(), prefix))
}
