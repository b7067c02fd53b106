//! Storage backend capability.
//!
//! The rest of the service talks to object storage only through
//! [`ObjectStore`]. Implementations know nothing about HTTP types; they
//! produce [`FileRecord`]s and opaque presigned URLs. A single put/get/delete
//! call is assumed atomic at the backend, so callers never retry writes
//! (an ambiguous retry could leave duplicate-looking objects behind).

pub mod local;

use std::io;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::models::file::FileRecord;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid object key")]
    InvalidObjectKey,
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Minimal object-storage surface consumed by the upload and file services.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write an object. Assumed atomic: either the object exists with the
    /// full payload afterwards or not at all.
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StoreResult<FileRecord>;

    /// Fetch metadata for a key, `None` if absent.
    async fn head(&self, key: &str) -> StoreResult<Option<FileRecord>>;

    /// List up to `max_keys` objects under `prefix`, newest first.
    async fn list(&self, prefix: &str, max_keys: usize) -> StoreResult<Vec<FileRecord>>;

    /// Delete an object. `Ok(false)` means there was nothing at the key.
    async fn delete(&self, key: &str) -> StoreResult<bool>;

    /// Issue a time-bounded retrieval URL. `filename` forces an attachment
    /// disposition under that name.
    async fn presign(&self, key: &str, filename: Option<&str>, ttl_secs: u64)
    -> StoreResult<String>;
}

/// Render a byte count as `1.5 MB` style text.
pub fn humanize_bytes(size: i64) -> String {
    let mut value = size as f64;
    for unit in ["B", "KB", "MB", "GB", "TB"] {
        if value.abs() < 1024.0 {
            return format!("{:.1} {}", value, unit);
        }
        value /= 1024.0;
    }
    format!("{:.1} PB", value)
}
