use anyhow::Result;
use std::{fs, io::ErrorKind, path::Path, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod metrics;
mod models;
mod routes;
mod services;
mod state;
mod storage;

use metrics::RequestMetrics;
use services::{
    files::{DownloadCounter, FileService},
    upload::UploadService,
};
use state::AppState;
use storage::{ObjectStore, local::LocalStore};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config ---
    let cfg = config::AppConfig::from_env_and_args()?;

    tracing::info!("Starting file-store with config: {:?}", cfg);

    // --- Ensure storage directory exists ---
    if !Path::new(&cfg.storage_dir).exists() {
        fs::create_dir_all(&cfg.storage_dir)?;
        tracing::info!("Created storage directory at {}", cfg.storage_dir);
    }

    // --- Initialize storage backend + services ---
    let store = LocalStore::new(cfg.storage_dir.clone(), cfg.public_url.clone());
    let backend: Arc<dyn ObjectStore> = Arc::new(store.clone());

    let state = AppState {
        files: FileService::new(
            backend.clone(),
            DownloadCounter::default(),
            cfg.presign_ttl_secs,
        ),
        uploads: UploadService::new(backend, cfg.max_file_size),
        metrics: RequestMetrics::default(),
        store,
    };

    // --- Build router ---
    let app = routes::routes::routes(state);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
