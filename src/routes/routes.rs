//! Defines routes for the file upload and management API.
//!
//! ## Structure
//! - **Upload**
//!   - `POST   /upload` — multipart file upload
//!
//! - **Files**
//!   - `GET    /files` — list files (supports prefix, limit)
//!   - `GET    /files/stats` — aggregate statistics
//!   - `GET    /files/{*key}` — file metadata; `/download` suffix issues a
//!     presigned URL instead
//!   - `DELETE /files/{*key}` — delete file
//!
//! - **Presigned delivery**
//!   - `GET    /presigned/{*key}` — serve a payload referenced by a signed URL
//!
//! Health probes and the metrics dump are mounted at the root. The wildcard
//! `*key` carries full object keys like `uploads/3f9c2a1b8d07_report.txt`.

use crate::{
    handlers::{
        file_handlers::{delete_file, get_file, get_stats, list_files, serve_presigned},
        health_handlers::{healthz, readyz},
        upload_handlers::upload,
    },
    metrics::{metrics_handler, track_requests},
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};

/// Build the router with all routes, shared state, and the request-metrics
/// layer applied.
pub fn routes(state: AppState) -> Router {
    Router::new()
        // health + metrics (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics_handler))
        // upload; the pipeline enforces its own size bounds, so the
        // framework's default body limit is lifted here
        .route("/upload", post(upload).layer(DefaultBodyLimit::disable()))
        // file-level routes; the literal /files/stats wins over the wildcard
        .route("/files", get(list_files))
        .route("/files/stats", get(get_stats))
        .route("/files/{*key}", get(get_file).delete(delete_file))
        // presigned delivery for the local backend
        .route("/presigned/{*key}", get(serve_presigned))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            track_requests,
        ))
        .with_state(state)
}
