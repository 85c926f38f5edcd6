//! Blob stores that published record sets are written to.
//!
//! [`BlobStore`] is the seam to durable storage: bucket provisioning, object
//! writes and presigned read links. Two implementations ship here: an
//! in-memory store backed by `DashMap`, and a directory-per-bucket store on
//! local disk.

use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use url::Url;

#[derive(thiserror::Error, Debug)]
pub enum BlobStoreError {
    #[error("bucket {0} does not exist")]
    BucketMissing(String),
    #[error("invalid object key {0:?}")]
    InvalidKey(String),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Durable key/value storage with presigned read access.
#[allow(async_fn_in_trait)]
pub trait BlobStore {
    /// URI scheme used when reporting object references.
    fn scheme(&self) -> &'static str;

    async fn exists(&self, bucket: &str) -> Result<bool, BlobStoreError>;

    async fn create(&self, bucket: &str, region: &str) -> Result<(), BlobStoreError>;

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), BlobStoreError>;

    /// A URL granting read access to `key` for `ttl`.
    async fn presign(&self, bucket: &str, key: &str, ttl: Duration)
        -> Result<String, BlobStoreError>;
}

/// A stored object.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredBlob {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Thread-safe in-memory blob store.
///
/// Counts every call so tests can assert that storage was (or was not)
/// touched.
#[derive(Default)]
pub struct MemoryBlobStore {
    buckets: DashMap<String, String>,
    objects: DashMap<(String, String), StoredBlob>,
    calls: AtomicUsize,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the object stored under `bucket`/`key`.
    pub fn get(&self, bucket: &str, key: &str) -> Option<StoredBlob> {
        self.objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|entry| entry.value().clone())
    }

    /// Region the bucket was created in, if it exists.
    pub fn bucket_region(&self, bucket: &str) -> Option<String> {
        self.buckets.get(bucket).map(|r| r.value().clone())
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Number of trait calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl BlobStore for MemoryBlobStore {
    fn scheme(&self) -> &'static str {
        "mem"
    }

    async fn exists(&self, bucket: &str) -> Result<bool, BlobStoreError> {
        self.record_call();
        Ok(self.buckets.contains_key(bucket))
    }

    async fn create(&self, bucket: &str, region: &str) -> Result<(), BlobStoreError> {
        self.record_call();
        self.buckets.insert(bucket.to_string(), region.to_string());
        Ok(())
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), BlobStoreError> {
        self.record_call();
        if !self.buckets.contains_key(bucket) {
            return Err(BlobStoreError::BucketMissing(bucket.to_string()));
        }
        self.objects.insert(
            (bucket.to_string(), key.to_string()),
            StoredBlob {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn presign(
        &self,
        bucket: &str,
        key: &str,
        ttl: Duration,
    ) -> Result<String, BlobStoreError> {
        self.record_call();
        if !self.buckets.contains_key(bucket) {
            return Err(BlobStoreError::BucketMissing(bucket.to_string()));
        }
        Ok(format!(
            "mem://{}/{}?expires={}",
            bucket,
            key,
            expiry_timestamp(ttl)
        ))
    }
}

/// Blob store rooted at a local directory; each bucket is a subdirectory.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn bucket_dir(&self, bucket: &str) -> Result<PathBuf, BlobStoreError> {
        let rel = checked_relative(bucket)?;
        Ok(self.root.join(rel))
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, BlobStoreError> {
        Ok(self.bucket_dir(bucket)?.join(checked_relative(key)?))
    }
}

impl BlobStore for FsBlobStore {
    fn scheme(&self) -> &'static str {
        "file"
    }

    async fn exists(&self, bucket: &str) -> Result<bool, BlobStoreError> {
        let dir = self.bucket_dir(bucket)?;
        match tokio::fs::metadata(&dir).await {
            Ok(meta) => Ok(meta.is_dir()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn create(&self, bucket: &str, region: &str) -> Result<(), BlobStoreError> {
        let dir = self.bucket_dir(bucket)?;
        tokio::fs::create_dir_all(&dir).await?;
        tracing::info!("created bucket {} ({}) at {}", bucket, region, dir.display());
        Ok(())
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), BlobStoreError> {
        if !self.exists(bucket).await? {
            return Err(BlobStoreError::BucketMissing(bucket.to_string()));
        }
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        Ok(())
    }

    async fn presign(
        &self,
        bucket: &str,
        key: &str,
        ttl: Duration,
    ) -> Result<String, BlobStoreError> {
        let path = tokio::fs::canonicalize(self.object_path(bucket, key)?).await?;
        let mut url = Url::from_file_path(&path)
            .map_err(|_| BlobStoreError::InvalidKey(key.to_string()))?;
        url.query_pairs_mut()
            .append_pair("expires", &expiry_timestamp(ttl).to_string());
        Ok(url.to_string())
    }
}

/// Rejects absolute paths and parent-directory components.
fn checked_relative(part: &str) -> Result<&Path, BlobStoreError> {
    let path = Path::new(part);
    let ok = !part.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if ok {
        Ok(path)
    } else {
        Err(BlobStoreError::InvalidKey(part.to_string()))
    }
}

fn expiry_timestamp(ttl: Duration) -> i64 {
    let secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
    Utc::now().timestamp().saturating_add(secs)
}
