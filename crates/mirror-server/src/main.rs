//! Service binary for the Safety Mirror monitor.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `MIRROR_CONFIG` (default `mirror-config.yaml`)
//! 3. Build the shared monitor
//! 4. Serve the observer API until `Ctrl-C`

mod error;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mirror_core::{MirrorConfig, Monitor};
use mirror_observer::{AppState, ServerConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::AppError;

/// Config file used when `MIRROR_CONFIG` is unset.
const DEFAULT_CONFIG_PATH: &str = "mirror-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the server
/// cannot bind.
#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("safety-mirror starting");

    // 2. Load configuration.
    let config_path = std::env::var_os("MIRROR_CONFIG")
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let config = load_config(&config_path)?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        interval_ms = config.broadcast.interval_ms,
        model_version = %config.detection.model_version,
        seeded = config.pipeline.seed.is_some(),
        "Configuration loaded"
    );

    // 3. Build the monitor.
    let server_config = ServerConfig::from(&config.server);
    let monitor = Arc::new(Monitor::new(config));
    let state = Arc::new(AppState::new(monitor));

    // 4. Serve until Ctrl-C.
    mirror_observer::start_server(&server_config, state, shutdown_signal()).await?;

    info!("safety-mirror shutdown complete");
    Ok(())
}

/// Load the service configuration.
///
/// A missing file is not an error: defaults (plus environment
/// overrides) are used instead.
fn load_config(path: &Path) -> Result<MirrorConfig, AppError> {
    if path.exists() {
        Ok(MirrorConfig::from_file(path)?)
    } else {
        warn!(path = %path.display(), "Config file not found, using defaults");
        Ok(MirrorConfig::parse("")?)
    }
}

/// Resolves on `Ctrl-C`.
async fn shutdown_signal() {
    wait_for_signal(tokio::signal::ctrl_c()).await;
}

/// Resolves when `signal` fires. If the signal cannot be listened for,
/// never resolves and the server keeps running.
async fn wait_for_signal<F>(signal: F)
where
    F: Future<Output = io::Result<()>>,
{
    if let Err(e) = signal.await {
        warn!(error = %e, "failed to listen for Ctrl-C, running until killed");
        std::future::pending::<()>().await;
    }
    info!("Ctrl-C received, shutting down");
}
