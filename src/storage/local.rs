//! Local-disk implementation of [`ObjectStore`].
//!
//! Payloads live under `base_path/<key>`. Writes go to a temp file first and
//! are renamed into place after fsync, so a key never exposes a partial
//! object. Content types are re-derived from the key's extension on
//! head/list, the same way the original listing path works without a
//! metadata database.
//!
//! Presigned URLs are HMAC-SHA256 signed with a per-process random secret:
//! `/presigned/<key>?expires=<unix>&filename=<name>&sig=<hex>`. They expire
//! with the wall clock and are verified in constant time.

use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

use crate::{
    models::file::FileRecord,
    services::content_type::guess_content_type,
    storage::{ObjectStore, StoreError, StoreResult, humanize_bytes},
};

type HmacSha256 = Hmac<Sha256>;

const MAX_OBJECT_KEY_LEN: usize = 1024;
const TMP_PREFIX: &str = ".tmp-";

#[derive(Clone)]
pub struct LocalStore {
    base_path: PathBuf,
    /// Base for public object URLs; records carry no URL when unset.
    public_url: Option<String>,
    /// Per-process presign secret. Regenerated on restart, which also
    /// invalidates any outstanding presigned URLs.
    secret: [u8; 32],
}

impl LocalStore {
    pub fn new(base_path: impl Into<PathBuf>, public_url: Option<String>) -> Self {
        let mut secret = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut secret);
        Self {
            base_path: base_path.into(),
            public_url,
            secret,
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Basic key validation at the storage boundary. Callers run the full
    /// key-space check before getting here; this guards the filesystem
    /// against anything that slips through a future call site.
    fn ensure_key_safe(&self, key: &str) -> StoreResult<()> {
        if key.is_empty() || key.len() > MAX_OBJECT_KEY_LEN {
            return Err(StoreError::InvalidObjectKey);
        }
        if key.starts_with('/') || key.contains("..") {
            return Err(StoreError::InvalidObjectKey);
        }
        if key
            .bytes()
            .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0')
        {
            return Err(StoreError::InvalidObjectKey);
        }
        Ok(())
    }

    fn object_path(&self, key: &str) -> PathBuf {
        let mut path = self.base_path.clone();
        for segment in key.split('/') {
            path.push(segment);
        }
        path
    }

    fn record_for(&self, key: &str, size_bytes: i64, uploaded_at: DateTime<Utc>) -> FileRecord {
        let (folder, filename) = FileRecord::split_key(key);
        FileRecord {
            key: key.to_string(),
            filename,
            folder,
            size_bytes,
            size_human: humanize_bytes(size_bytes),
            content_type: guess_content_type(key).to_string(),
            uploaded_at,
            url: self
                .public_url
                .as_deref()
                .map(|base| format!("{}/{}", base.trim_end_matches('/'), key)),
        }
    }

    fn sign(&self, key: &str, expires: i64, filename: &str) -> String {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts any key length");
        mac.update(key.as_bytes());
        mac.update(b"\n");
        mac.update(expires.to_string().as_bytes());
        mac.update(b"\n");
        mac.update(filename.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Check a presigned-URL signature and expiry. Constant-time on the
    /// signature so the check leaks nothing about the expected value.
    pub fn verify_presigned(&self, key: &str, expires: i64, filename: &str, sig: &str) -> bool {
        let Ok(given) = hex::decode(sig) else {
            return false;
        };
        let expected = {
            let mut mac =
                HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts any key length");
            mac.update(key.as_bytes());
            mac.update(b"\n");
            mac.update(expires.to_string().as_bytes());
            mac.update(b"\n");
            mac.update(filename.as_bytes());
            mac.finalize().into_bytes()
        };
        if given.ct_eq(expected.as_slice()).unwrap_u8() != 1 {
            return false;
        }
        expires >= Utc::now().timestamp()
    }

    /// Open a payload for streaming out, with its metadata record.
    pub async fn open_reader(&self, key: &str) -> StoreResult<Option<(FileRecord, File)>> {
        self.ensure_key_safe(key)?;
        let path = self.object_path(key);
        let meta = match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => return Ok(None),
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(StoreError::Io(err)),
        };
        let file = File::open(&path).await?;
        let uploaded_at = modified_time(&meta);
        Ok(Some((
            self.record_for(key, meta.len() as i64, uploaded_at),
            file,
        )))
    }

    /// Remove now-empty parent directories after a delete, stopping at the
    /// base path or the first non-empty directory.
    async fn prune_empty_dirs(&self, start: &Path) {
        let mut current = start.to_path_buf();
        while current.starts_with(&self.base_path) && current != self.base_path {
            match fs::remove_dir(&current).await {
                Ok(_) => {
                    if let Some(parent) = current.parent() {
                        current = parent.to_path_buf();
                    } else {
                        break;
                    }
                }
                Err(err) if err.kind() == ErrorKind::NotFound => break,
                Err(err) if err.kind() == ErrorKind::DirectoryNotEmpty => break,
                Err(err) => {
                    debug!("failed to prune directory {}: {}", current.display(), err);
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StoreResult<FileRecord> {
        self.ensure_key_safe(key)?;
        let path = self.object_path(key);
        let parent = path.parent().map(Path::to_path_buf).ok_or_else(|| {
            StoreError::Io(io::Error::new(
                ErrorKind::InvalidInput,
                "object path missing parent directory",
            ))
        })?;
        fs::create_dir_all(&parent).await?;

        // Write to a temp file and rename so readers never see a partial
        // payload under the final key.
        let tmp_path = parent.join(format!("{}{}", TMP_PREFIX, Uuid::new_v4()));
        let mut file = File::create(&tmp_path).await?;
        let write_result = async {
            file.write_all(&data).await?;
            file.flush().await?;
            file.sync_all().await
        }
        .await;
        if let Err(err) = write_result {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::Io(err));
        }
        if let Err(err) = fs::rename(&tmp_path, &path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::Io(err));
        }

        debug!(key, size = data.len(), "stored object");
        let mut record = self.record_for(key, data.len() as i64, Utc::now());
        record.content_type = content_type.to_string();
        Ok(record)
    }

    async fn head(&self, key: &str) -> StoreResult<Option<FileRecord>> {
        self.ensure_key_safe(key)?;
        let path = self.object_path(key);
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {
                let uploaded_at = modified_time(&meta);
                Ok(Some(self.record_for(key, meta.len() as i64, uploaded_at)))
            }
            Ok(_) => Ok(None),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StoreError::Io(err)),
        }
    }

    async fn list(&self, prefix: &str, max_keys: usize) -> StoreResult<Vec<FileRecord>> {
        let mut records = Vec::new();
        let mut pending = vec![self.base_path.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(err) if err.kind() == ErrorKind::NotFound => continue,
                Err(err) => return Err(StoreError::Io(err)),
            };
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    pending.push(path);
                    continue;
                }
                if !file_type.is_file() {
                    continue;
                }
                let name = entry.file_name();
                if name.to_string_lossy().starts_with(TMP_PREFIX) {
                    continue;
                }
                let Some(key) = key_from_path(&self.base_path, &path) else {
                    continue;
                };
                if !key.starts_with(prefix) {
                    continue;
                }
                let meta = entry.metadata().await?;
                let uploaded_at = modified_time(&meta);
                records.push(self.record_for(&key, meta.len() as i64, uploaded_at));
            }
        }

        records.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        records.truncate(max_keys);
        Ok(records)
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        self.ensure_key_safe(key)?;
        let path = self.object_path(key);
        match fs::remove_file(&path).await {
            Ok(_) => {
                if let Some(parent) = path.parent() {
                    self.prune_empty_dirs(parent).await;
                }
                Ok(true)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(StoreError::Io(err)),
        }
    }

    async fn presign(
        &self,
        key: &str,
        filename: Option<&str>,
        ttl_secs: u64,
    ) -> StoreResult<String> {
        self.ensure_key_safe(key)?;
        let expires = Utc::now().timestamp() + ttl_secs as i64;
        let filename = filename.unwrap_or("");
        let sig = self.sign(key, expires, filename);
        let base = self
            .public_url
            .as_deref()
            .map(|b| b.trim_end_matches('/').to_string())
            .unwrap_or_default();
        Ok(format!(
            "{}/presigned/{}?expires={}&filename={}&sig={}",
            base,
            key,
            expires,
            urlencoding::encode(filename),
            sig
        ))
    }
}

fn key_from_path(base: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(base).ok()?;
    let segments: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(segments.join("/"))
}

fn modified_time(meta: &std::fs::Metadata) -> DateTime<Utc> {
    meta.modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now())
}
