//! The upload pipeline: ordered validation, bounded ingestion, key
//! generation, storage write, and metadata extraction.
//!
//! Validation fails fast and never touches the storage backend. The body is
//! read in bounded chunks so a lying or absent length header cannot blow the
//! memory budget: a declared length is checked before any read, and the true
//! size is enforced again while streaming.

use std::{io, sync::Arc};

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt, pin_mut};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::{
    models::file::FileUploadResponse,
    services::{
        ErrorCategory,
        content_type::{extension_matches, is_allowed},
        filename::sanitize_filename,
        metadata::{extract_metadata, extract_metadata_basic},
    },
    storage::{ObjectStore, StoreError, humanize_bytes},
};

/// Prefix under which all generated keys live.
const KEY_PREFIX: &str = "uploads/";

/// Length of the random token embedded in generated keys.
const KEY_TOKEN_LEN: usize = 12;

/// Allowance on top of the max size when judging the declared length.
/// Multipart framing makes the header slightly larger than the payload.
const LENGTH_HINT_SLACK: u64 = 4096;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No filename provided")]
    MissingFilename,
    #[error("File too large. Max size: {0}")]
    TooLarge(String),
    #[error("File type '{0}' not allowed")]
    TypeNotAllowed(String),
    #[error("File extension does not match declared content type")]
    ExtensionMismatch,
    #[error("Empty file")]
    EmptyFile,
    #[error("error reading upload body: {0}")]
    Read(#[from] io::Error),
    #[error("storage backend error: {0}")]
    Backend(#[from] StoreError),
}

impl UploadError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            UploadError::MissingFilename | UploadError::EmptyFile | UploadError::Read(_) => {
                ErrorCategory::BadRequest
            }
            UploadError::TooLarge(_) => ErrorCategory::PayloadTooLarge,
            UploadError::TypeNotAllowed(_) | UploadError::ExtensionMismatch => {
                ErrorCategory::UnsupportedMediaType
            }
            UploadError::Backend(_) => ErrorCategory::ServerError,
        }
    }
}

/// Stateless upload orchestrator. Each call is independent; the only shared
/// resources are the storage backend and, indirectly, its filesystem.
#[derive(Clone)]
pub struct UploadService {
    store: Arc<dyn ObjectStore>,
    max_file_size: usize,
}

impl UploadService {
    pub fn new(store: Arc<dyn ObjectStore>, max_file_size: usize) -> Self {
        Self {
            store,
            max_file_size,
        }
    }

    /// Validate and store one upload.
    ///
    /// Ordered checks, first violation wins: filename present, declared
    /// length within bounds, type allowed, extension consistent, streamed
    /// size within bounds, payload non-empty. Only then is a key generated
    /// and the backend touched.
    pub async fn process_upload<S>(
        &self,
        body: S,
        filename: &str,
        content_type: &str,
        length_hint: Option<u64>,
    ) -> Result<FileUploadResponse, UploadError>
    where
        S: Stream<Item = io::Result<Bytes>>,
    {
        if filename.is_empty() {
            return Err(UploadError::MissingFilename);
        }

        if let Some(declared) = length_hint {
            if declared > self.max_file_size as u64 + LENGTH_HINT_SLACK {
                return Err(self.too_large());
            }
        }

        if !is_allowed(content_type) {
            return Err(UploadError::TypeNotAllowed(content_type.to_string()));
        }

        let safe_name = sanitize_filename(filename);

        if !extension_matches(&safe_name, content_type) {
            return Err(UploadError::ExtensionMismatch);
        }

        let data = self.read_bounded(body).await?;

        if data.is_empty() {
            return Err(UploadError::EmptyFile);
        }

        // Fresh random token per upload; collision odds across 12 hex chars
        // are accepted rather than detected.
        let token = Uuid::new_v4().simple().to_string();
        let key = format!("{}{}_{}", KEY_PREFIX, &token[..KEY_TOKEN_LEN], safe_name);

        let record = self.store.put(&key, data.clone(), content_type).await?;
        let metadata = self.extract(data, safe_name, content_type.to_string()).await;

        Ok(FileUploadResponse {
            key: record.key,
            filename: record.filename,
            size_bytes: record.size_bytes,
            size_human: record.size_human,
            content_type: content_type.to_string(),
            uploaded_at: record.uploaded_at,
            url: record.url,
            metadata,
        })
    }

    /// Accumulate the body, aborting as soon as the running total passes the
    /// configured maximum. Nothing read after that point.
    async fn read_bounded<S>(&self, body: S) -> Result<Bytes, UploadError>
    where
        S: Stream<Item = io::Result<Bytes>>,
    {
        let mut data = BytesMut::new();
        pin_mut!(body);
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            if data.len() + chunk.len() > self.max_file_size {
                return Err(self.too_large());
            }
            data.extend_from_slice(&chunk);
        }
        Ok(data.freeze())
    }

    /// Run metadata extraction off the async pool; decoding images and PDFs
    /// is CPU-bound. A failed task degrades to digests-only metadata, never
    /// to a failed upload.
    async fn extract(
        &self,
        data: Bytes,
        filename: String,
        content_type: String,
    ) -> crate::models::metadata::FileMetadataDetail {
        let task_data = data.clone();
        let task_name = filename.clone();
        let task_type = content_type.clone();
        match tokio::task::spawn_blocking(move || {
            extract_metadata(&task_data, &task_name, &task_type)
        })
        .await
        {
            Ok(detail) => detail,
            Err(err) => {
                warn!("metadata extraction task failed: {}", err);
                extract_metadata_basic(&data, &filename, &content_type)
            }
        }
    }

    fn too_large(&self) -> UploadError {
        UploadError::TooLarge(humanize_bytes(self.max_file_size as i64))
    }
}
