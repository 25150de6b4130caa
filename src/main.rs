//! vidvault server binary
//!
//! Loads `.env`, reads the JSON config named by `VIDVAULT_CONFIG` (defaults
//! otherwise), starts the REST API and shuts down gracefully on SIGINT/SIGTERM.
//!
//! After starting, you can:
//! - View Swagger UI at http://localhost:8000/swagger-ui
//! - Start a download via POST http://localhost:8000/api/video/download
//! - Poll it via GET http://localhost:8000/api/video/status/{id}
//! - Stream events via GET http://localhost:8000/api/video/events

use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use vidvault::{Config, Downloader, run_with_shutdown};

/// Environment variable naming the JSON configuration file
const CONFIG_ENV: &str = "VIDVAULT_CONFIG";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::var(CONFIG_ENV) {
        Ok(path) => {
            tracing::info!(path = %path, "Loading configuration");
            Config::from_file(&path)?
        }
        Err(_) => Config::default(),
    };

    let downloader = Arc::new(Downloader::new(config).await?);
    let server = downloader.spawn_api_server();

    tokio::select! {
        result = server => {
            // The server only returns on failure
            match result {
                Ok(Err(e)) => tracing::error!(error = %e, "API server failed"),
                Err(e) => tracing::error!(error = %e, "API server task aborted"),
                Ok(Ok(())) => {}
            }
            downloader.shutdown().await?;
        }
        result = run_with_shutdown(downloader.clone()) => result?,
    }

    Ok(())
}
