//! Aggregate upload statistics.

use serde::{Deserialize, Serialize};

/// Snapshot derived on demand from a listing of current objects plus the
/// in-process download counter. Eventually consistent; not a ledger.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct UploadStats {
    pub total_files: usize,
    pub total_size_bytes: i64,
    pub total_size_human: String,
    pub uploads_today: usize,
    /// Download URLs issued since process start (not bytes transferred).
    pub total_downloads: u64,
}
