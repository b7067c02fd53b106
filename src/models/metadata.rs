//! Per-upload descriptive metadata.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata computed once from the exact bytes written.
///
/// Digests identify the content independently of its name or key. The
/// format-specific fields are best-effort and absent whenever the payload
/// could not be parsed as its declared format.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct FileMetadataDetail {
    pub filename: String,
    pub size_bytes: i64,
    pub size_human: String,
    pub mime_type: String,
    /// Lowercased extension of the sanitized filename, empty if none.
    pub extension: String,
    pub md5: String,
    pub sha256: String,
    pub uploaded_at: DateTime<Utc>,

    // Image-specific
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exif: Option<BTreeMap<String, String>>,

    // PDF-specific
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_pages: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_title: Option<String>,
}
