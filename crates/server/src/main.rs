// crates/server/src/main.rs
//! Mediabox server binary.
//!
//! Reads configuration from the environment, binds the HTTP server, and
//! spawns the background reaper sweep. Download work itself happens in
//! per-job tasks started by the process route.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use mediabox_server::jobs::run_sweeper;
use mediabox_server::{create_app, AppState, Config};

/// Default port for the server.
const DEFAULT_PORT: u16 = 8741;

/// Get the server port from environment or use default.
fn get_port() -> u16 {
    std::env::var("MEDIABOX_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .compact()
        .init();

    eprintln!("\n\u{1f4e6} mediabox v{}\n", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env();
    tokio::fs::create_dir_all(&config.downloads_dir).await?;

    tracing::info!(
        downloads_dir = %config.downloads_dir.display(),
        extractor_script = ?config.extractor_script,
        stage_timeout_secs = config.stage_timeout.as_secs(),
        job_expiry_secs = config.job_expiry.as_secs(),
        "configuration loaded"
    );

    let state = AppState::new(config);
    if !state.extractor_available() {
        tracing::warn!("universal extractor script not found, only the yt-dlp fallback will run");
    }

    let app = create_app(Arc::clone(&state));

    let port = get_port();
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    eprintln!("  \u{2192} http://localhost:{port}\n");

    // Background sweep for jobs nobody polls anymore.
    tokio::spawn(run_sweeper(Arc::clone(&state)));

    axum::serve(listener, app).await?;

    Ok(())
}
