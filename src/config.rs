use anyhow::{Context, Result};
use clap::Parser;
use std::env;

const DEFAULT_MAX_FILE_SIZE: usize = 100 * 1024 * 1024;
const DEFAULT_PRESIGN_TTL_SECS: u64 = 600;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: String,
    /// Base URL prepended to object keys in public URLs; no public URLs
    /// are emitted when unset.
    pub public_url: Option<String>,
    pub max_file_size: usize,
    pub presign_ttl_secs: u64,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "File upload and management API")]
pub struct Args {
    /// Host to bind to (overrides FILE_STORE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides FILE_STORE_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where payloads are stored (overrides FILE_STORE_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Public base URL for stored objects (overrides FILE_STORE_PUBLIC_URL)
    #[arg(long)]
    pub public_url: Option<String>,

    /// Maximum accepted upload size in bytes (overrides FILE_STORE_MAX_FILE_SIZE)
    #[arg(long)]
    pub max_file_size: Option<usize>,

    /// Presigned URL lifetime in seconds (overrides FILE_STORE_PRESIGN_TTL_SECS)
    #[arg(long)]
    pub presign_ttl_secs: Option<u64>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("FILE_STORE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = parse_env("FILE_STORE_PORT")?.unwrap_or(3000);
        let env_storage =
            env::var("FILE_STORE_STORAGE_DIR").unwrap_or_else(|_| "./data/objects".into());
        let env_public_url = env::var("FILE_STORE_PUBLIC_URL")
            .ok()
            .filter(|v| !v.is_empty());
        let env_max_size = parse_env("FILE_STORE_MAX_FILE_SIZE")?.unwrap_or(DEFAULT_MAX_FILE_SIZE);
        let env_ttl = parse_env("FILE_STORE_PRESIGN_TTL_SECS")?.unwrap_or(DEFAULT_PRESIGN_TTL_SECS);

        // --- Merge ---
        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            storage_dir: args.storage_dir.unwrap_or(env_storage),
            public_url: args.public_url.or(env_public_url),
            max_file_size: args.max_file_size.unwrap_or(env_max_size),
            presign_ttl_secs: args.presign_ttl_secs.unwrap_or(env_ttl),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(err).with_context(|| format!("reading {}", name)),
    }
}
