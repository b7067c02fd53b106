//! HTTP handlers for listing, fetching, deleting, and downloading files.
//!
//! Thin adapters over `FileService`; all key validation and status
//! classification lives in the service layer.

use axum::{
    Json,
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tokio_util::io::ReaderStream;

use crate::{
    errors::AppError, models::file::FileRecord, services::files::FileService,
    storage::local::LocalStore,
};

/// Query params for `GET /files`.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub prefix: Option<String>,
    pub limit: Option<usize>,
}

/// Query params carried by presigned URLs.
#[derive(Debug, Deserialize)]
pub struct PresignedQuery {
    pub expires: i64,
    pub filename: Option<String>,
    pub sig: String,
}

/// GET `/files?prefix=&limit=` — list current files, newest first.
pub async fn list_files(
    State(files): State<FileService>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<FileRecord>>, AppError> {
    let listed = files
        .list(query.prefix.as_deref().unwrap_or(""), query.limit.unwrap_or(100))
        .await?;
    Ok(Json(listed))
}

/// GET `/files/stats` — aggregate statistics.
pub async fn get_stats(State(files): State<FileService>) -> Result<Response, AppError> {
    let stats = files.stats().await?;
    Ok(Json(stats).into_response())
}

/// GET `/files/{*key}` — metadata for one file, or a download URL when the
/// path ends in `/download`. Generated keys contain exactly one slash, so
/// the suffix can never collide with a real key.
pub async fn get_file(
    State(files): State<FileService>,
    Path(key): Path<String>,
) -> Result<Response, AppError> {
    if let Some(base) = key.strip_suffix("/download") {
        let url = files.download_url(base).await?;
        return Ok(Json(json!({ "url": url })).into_response());
    }
    let record = files.get(&key).await?;
    Ok(Json(record).into_response())
}

/// DELETE `/files/{*key}` — remove one file.
pub async fn delete_file(
    State(files): State<FileService>,
    Path(key): Path<String>,
) -> Result<Response, AppError> {
    files.remove(&key).await?;
    Ok(Json(json!({ "deleted": true, "key": key })).into_response())
}

/// GET `/presigned/{*key}` — serve a payload referenced by a presigned URL.
///
/// The signature covers key, expiry, and filename; anything tampered with or
/// expired is refused before disk is touched.
pub async fn serve_presigned(
    State(store): State<LocalStore>,
    Path(key): Path<String>,
    Query(query): Query<PresignedQuery>,
) -> Result<Response, AppError> {
    let filename = query.filename.as_deref().unwrap_or("");
    if !store.verify_presigned(&key, query.expires, filename, &query.sig) {
        return Err(AppError::new(
            StatusCode::FORBIDDEN,
            "Presigned URL is invalid or expired",
        ));
    }

    let (record, file) = store
        .open_reader(&key)
        .await
        .map_err(|err| AppError::internal(err.to_string()))?
        .ok_or_else(|| AppError::new(StatusCode::NOT_FOUND, "File not found"))?;

    let stream = ReaderStream::new(file);
    let mut response = Response::new(Body::from_stream(stream));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&record.content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(
        header::CONTENT_LENGTH,
        HeaderValue::from_str(&record.size_bytes.to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("0")),
    );
    let disposition = if filename.is_empty() {
        "attachment".to_string()
    } else {
        format!("attachment; filename=\"{}\"", filename)
    };
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    Ok(response)
}
