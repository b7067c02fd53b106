//! Keyed read/list/delete/presign access and aggregate statistics.
//!
//! Every caller-supplied key passes [`validate_key`] before the storage
//! backend is touched; this service is the only path from a key to the
//! backend for reads and deletes.

use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::info;

use crate::{
    models::{file::FileRecord, stats::UploadStats},
    services::{ErrorCategory, keys::InvalidKey, keys::validate_key},
    storage::{ObjectStore, StoreError, humanize_bytes},
};

/// Cap on how many objects a stats scan considers.
const STATS_SCAN_LIMIT: usize = 10_000;

/// Listing limit bounds exposed to callers.
const LIST_LIMIT_MAX: usize = 1000;

#[derive(Debug, Error)]
pub enum FileError {
    #[error(transparent)]
    InvalidKey(#[from] InvalidKey),
    #[error("File not found")]
    NotFound,
    #[error("Limit must be between 1 and 1000")]
    InvalidLimit,
    #[error("storage backend error: {0}")]
    Backend(#[from] StoreError),
}

impl FileError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            FileError::InvalidKey(_) | FileError::InvalidLimit => ErrorCategory::BadRequest,
            FileError::NotFound => ErrorCategory::NotFound,
            FileError::Backend(_) => ErrorCategory::ServerError,
        }
    }
}

/// Process-wide count of download URLs issued. Reset on restart, never
/// persisted. One URL issued is one increment, regardless of how often the
/// URL is eventually used.
#[derive(Clone, Default)]
pub struct DownloadCounter(Arc<Mutex<u64>>);

impl DownloadCounter {
    pub fn record(&self) {
        let mut count = self.0.lock().expect("download counter poisoned");
        *count += 1;
    }

    pub fn total(&self) -> u64 {
        *self.0.lock().expect("download counter poisoned")
    }
}

/// Read-side accessor over the storage backend.
#[derive(Clone)]
pub struct FileService {
    store: Arc<dyn ObjectStore>,
    downloads: DownloadCounter,
    presign_ttl_secs: u64,
}

impl FileService {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        downloads: DownloadCounter,
        presign_ttl_secs: u64,
    ) -> Self {
        Self {
            store,
            downloads,
            presign_ttl_secs,
        }
    }

    /// List current objects under `prefix`, newest first.
    pub async fn list(&self, prefix: &str, limit: usize) -> Result<Vec<FileRecord>, FileError> {
        if limit < 1 || limit > LIST_LIMIT_MAX {
            return Err(FileError::InvalidLimit);
        }
        Ok(self.store.list(prefix, limit).await?)
    }

    /// Fetch metadata for one key.
    pub async fn get(&self, key: &str) -> Result<FileRecord, FileError> {
        validate_key(key)?;
        self.store.head(key).await?.ok_or(FileError::NotFound)
    }

    /// Issue a time-bounded download URL for an existing object.
    ///
    /// The attachment filename comes from the resolved record, never from
    /// the caller. Counts one issued URL on success.
    pub async fn download_url(&self, key: &str) -> Result<String, FileError> {
        validate_key(key)?;
        let record = self.store.head(key).await?.ok_or(FileError::NotFound)?;
        let url = self
            .store
            .presign(key, Some(&record.filename), self.presign_ttl_secs)
            .await?;
        self.downloads.record();
        Ok(url)
    }

    /// Delete one object. Missing objects report as not found; the backend
    /// call itself failing surfaces as a server error.
    pub async fn remove(&self, key: &str) -> Result<(), FileError> {
        validate_key(key)?;
        if !self.store.delete(key).await? {
            return Err(FileError::NotFound);
        }
        info!(key, "file deleted");
        Ok(())
    }

    /// Aggregate statistics, derived on demand from a fresh listing plus the
    /// in-process download counter. Eventually consistent by construction.
    pub async fn stats(&self) -> Result<UploadStats, FileError> {
        let records = self.store.list("", STATS_SCAN_LIMIT).await?;
        let total_size_bytes: i64 = records.iter().map(|r| r.size_bytes).sum();
        let today = chrono::Utc::now().date_naive();
        let uploads_today = records
            .iter()
            .filter(|r| r.uploaded_at.date_naive() == today)
            .count();

        Ok(UploadStats {
            total_files: records.len(),
            total_size_bytes,
            total_size_human: humanize_bytes(total_size_bytes),
            uploads_today,
            total_downloads: self.downloads.total(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{services::upload::UploadService, storage::local::LocalStore};
    use bytes::Bytes;
    use futures::stream;
    use std::io;

    fn setup(dir: &tempfile::TempDir) -> (FileService, UploadService) {
        let store = Arc::new(LocalStore::new(dir.path(), None));
        let files = FileService::new(store.clone(), DownloadCounter::default(), 600);
        let uploads = UploadService::new(store, 1024 * 1024);
        (files, uploads)
    }

    async fn put(uploads: &UploadService, name: &str, data: &'static [u8]) -> String {
        let body = stream::iter(vec![io::Result::Ok(Bytes::from_static(data))]);
        uploads
            .process_upload(body, name, "text/plain", None)
            .await
            .unwrap()
            .key
    }

    #[tokio::test]
    async fn invalid_keys_never_reach_the_backend() {
        let dir = tempfile::tempdir().unwrap();
        let (files, _) = setup(&dir);
        for key in ["", "secret/x", "uploads/../x", "uploads/a\\b"] {
            assert!(matches!(
                files.get(key).await.unwrap_err(),
                FileError::InvalidKey(_)
            ));
            assert!(matches!(
                files.download_url(key).await.unwrap_err(),
                FileError::InvalidKey(_)
            ));
            assert!(matches!(
                files.remove(key).await.unwrap_err(),
                FileError::InvalidKey(_)
            ));
        }
    }

    #[tokio::test]
    async fn get_of_missing_key_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let (files, _) = setup(&dir);
        let err = files.get("uploads/absent_a.txt").await.unwrap_err();
        assert!(matches!(err, FileError::NotFound));
        assert_eq!(err.category(), ErrorCategory::NotFound);
    }

    #[tokio::test]
    async fn list_bounds_are_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let (files, _) = setup(&dir);
        assert!(matches!(
            files.list("", 0).await.unwrap_err(),
            FileError::InvalidLimit
        ));
        assert!(matches!(
            files.list("", 1001).await.unwrap_err(),
            FileError::InvalidLimit
        ));
        assert!(files.list("", 1000).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn listing_is_newest_first_after_two_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let (files, uploads) = setup(&dir);

        let first = put(&uploads, "first.txt", b"one").await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let second = put(&uploads, "second.txt", b"two").await;

        let listed = files.list("uploads/", 100).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].key, second);
        assert_eq!(listed[1].key, first);
    }

    #[tokio::test]
    async fn issuing_two_urls_counts_two_downloads() {
        let dir = tempfile::tempdir().unwrap();
        let (files, uploads) = setup(&dir);
        let key = put(&uploads, "dl.txt", b"data").await;

        let url_a = files.download_url(&key).await.unwrap();
        let url_b = files.download_url(&key).await.unwrap();
        assert!(url_a.contains("/presigned/"));
        assert!(url_b.contains("/presigned/"));

        let stats = files.stats().await.unwrap();
        assert_eq!(stats.total_downloads, 2);
        assert_eq!(stats.total_files, 1);
        assert_eq!(stats.uploads_today, 1);
        assert_eq!(stats.total_size_bytes, 4);
    }

    #[tokio::test]
    async fn download_url_for_missing_key_counts_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (files, _) = setup(&dir);
        assert!(matches!(
            files.download_url("uploads/absent_a.txt").await.unwrap_err(),
            FileError::NotFound
        ));
        assert_eq!(files.stats().await.unwrap().total_downloads, 0);
    }

    #[tokio::test]
    async fn remove_deletes_and_then_reports_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let (files, uploads) = setup(&dir);
        let key = put(&uploads, "gone.txt", b"bye").await;

        files.remove(&key).await.unwrap();
        assert!(matches!(
            files.get(&key).await.unwrap_err(),
            FileError::NotFound
        ));
        assert!(matches!(
            files.remove(&key).await.unwrap_err(),
            FileError::NotFound
        ));
    }
}
