//! Shared application state handed to the router.

use axum::extract::FromRef;

use crate::{
    metrics::RequestMetrics,
    services::{files::FileService, upload::UploadService},
    storage::local::LocalStore,
};

/// Everything handlers need, cloned per request. `FromRef` lets each handler
/// extract only the piece it uses.
#[derive(Clone, FromRef)]
pub struct AppState {
    pub files: FileService,
    pub uploads: UploadService,
    pub metrics: RequestMetrics,
    pub store: LocalStore,
}
