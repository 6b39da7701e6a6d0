//! Blob storage for conditioning images and generated images.
//!
//! Objects are addressed by a bucket and a key. A missing object is reported
//! by `exists` returning `false`; only genuine failures are errors.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use crate::error::StoreError;

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn exists(&self, bucket: &str, key: &str) -> Result<bool, StoreError>;

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError>;

    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<(), StoreError>;

    /// Human-readable location of an object, used in confirmation messages.
    fn location(&self, bucket: &str, key: &str) -> String {
        format!("{bucket}/{key}")
    }
}

/// Filesystem-backed store laid out as `<root>/<bucket>/<key>`.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve an object path, refusing keys that escape the bucket.
    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(bucket).join(key);
        let escapes = key.is_empty()
            || bucket.is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)));
        if escapes {
            return Err(StoreError::InvalidKey {
                key: format!("{bucket}/{key}"),
            });
        }
        Ok(self.root.join(relative))
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn exists(&self, bucket: &str, key: &str) -> Result<bool, StoreError> {
        let path = self.object_path(bucket, key)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error(&path, e)),
        }
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.object_path(bucket, key)?;
        tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StoreError::NotFound {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                }
            } else {
                io_error(&path, e)
            }
        })
    }

    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, e))?;
        }
        debug!(path = %path.display(), bytes = bytes.len(), "Writing object");
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| io_error(&path, e))
    }

    fn location(&self, bucket: &str, key: &str) -> String {
        self.root.join(bucket).join(key).display().to_string()
    }
}

/// A single `put` observed by [`MemoryBlobStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutRecord {
    pub bucket: String,
    pub key: String,
    pub bytes: Vec<u8>,
}

/// In-memory store that also records every write.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    puts: Mutex<Vec<PutRecord>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object without recording it as a put.
    pub fn insert(&self, bucket: &str, key: &str, bytes: Vec<u8>) {
        if let Ok(mut objects) = self.objects.lock() {
            objects.insert((bucket.to_string(), key.to_string()), bytes);
        }
    }

    pub fn puts(&self) -> Vec<PutRecord> {
        self.puts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn exists(&self, bucket: &str, key: &str) -> Result<bool, StoreError> {
        Ok(self
            .objects
            .lock()
            .map(|o| o.contains_key(&(bucket.to_string(), key.to_string())))
            .unwrap_or(false))
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        self.objects
            .lock()
            .ok()
            .and_then(|o| o.get(&(bucket.to_string(), key.to_string())).cloned())
            .ok_or_else(|| StoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }

    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        if let Ok(mut puts) = self.puts.lock() {
            puts.push(PutRecord {
                bucket: bucket.to_string(),
                key: key.to_string(),
                bytes: bytes.clone(),
            });
        }
        self.insert(bucket, key, bytes);
        Ok(())
    }

    fn location(&self, bucket: &str, key: &str) -> String {
        format!("memory://{bucket}/{key}")
    }
}
