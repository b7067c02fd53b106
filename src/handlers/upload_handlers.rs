//! HTTP handler for multipart uploads.
//!
//! Pulls the `file` field out of the multipart body and feeds it to the
//! upload pipeline as a bounded stream; nothing is validated here beyond
//! multipart framing.

use axum::{
    Json,
    extract::{Multipart, State},
    http::{HeaderMap, StatusCode, header},
};
use futures::StreamExt;
use std::io;
use tracing::{info, warn};

use crate::{
    errors::AppError,
    metrics::RequestMetrics,
    models::file::FileUploadResponse,
    services::content_type::DEFAULT_CONTENT_TYPE,
    services::upload::UploadService,
};

/// POST `/upload` — multipart upload of a single `file` field.
pub async fn upload(
    State(uploads): State<UploadService>,
    State(metrics): State<RequestMetrics>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<FileUploadResponse>, AppError> {
    let length_hint = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    let field = loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some("file") => break field,
            Ok(Some(_)) => continue,
            Ok(None) => {
                metrics.record_upload(false);
                return Err(AppError::new(StatusCode::BAD_REQUEST, "No file provided"));
            }
            Err(err) => {
                metrics.record_upload(false);
                return Err(AppError::new(
                    StatusCode::BAD_REQUEST,
                    format!("Malformed multipart body: {}", err),
                ));
            }
        }
    };

    let filename = field.file_name().unwrap_or("").to_string();
    let content_type = field
        .content_type()
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string();
    let body = field.map(|chunk| chunk.map_err(|err| io::Error::new(io::ErrorKind::Other, err)));

    let result = uploads
        .process_upload(body, &filename, &content_type, length_hint)
        .await;
    metrics.record_upload(result.is_ok());

    match result {
        Ok(response) => {
            info!(
                key = %response.key,
                size = response.size_bytes,
                content_type = %response.content_type,
                "file uploaded"
            );
            Ok(Json(response))
        }
        Err(err) => {
            warn!("upload rejected: {}", err);
            Err(err.into())
        }
    }
}
