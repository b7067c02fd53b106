//! Records describing stored files.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::metadata::FileMetadataDetail;

/// A stored file as reported by the storage backend.
///
/// Returned from put/head/list calls and serialized directly to API
/// responses. Immutable once created; logically gone when the underlying
/// object is deleted.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct FileRecord {
    /// Full object key, e.g. `uploads/3f9c2a1b8d07_report.txt`.
    pub key: String,

    /// Final path segment of the key.
    pub filename: String,

    /// Leading path segments of the key, trailing slash included.
    pub folder: String,

    /// Size in bytes.
    pub size_bytes: i64,

    /// Human-readable size, e.g. `1.2 MB`.
    pub size_human: String,

    /// MIME type.
    pub content_type: String,

    /// When the object was written.
    pub uploaded_at: DateTime<Utc>,

    /// Public URL, when the backend exposes one.
    pub url: Option<String>,
}

impl FileRecord {
    /// Split a key into `(folder, filename)`.
    pub fn split_key(key: &str) -> (String, String) {
        match key.rsplit_once('/') {
            Some((folder, name)) => (format!("{}/", folder), name.to_string()),
            None => (String::new(), key.to_string()),
        }
    }
}

/// Response body for a successful upload.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct FileUploadResponse {
    pub key: String,
    pub filename: String,
    pub size_bytes: i64,
    pub size_human: String,
    pub content_type: String,
    pub uploaded_at: DateTime<Utc>,
    pub url: Option<String>,
    pub metadata: FileMetadataDetail,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_key_separates_folder_and_name() {
        assert_eq!(
            FileRecord::split_key("uploads/abc_file.txt"),
            ("uploads/".to_string(), "abc_file.txt".to_string())
        );
        assert_eq!(
            FileRecord::split_key("bare"),
            (String::new(), "bare".to_string())
        );
    }
}
