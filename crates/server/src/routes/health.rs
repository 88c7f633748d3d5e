// crates/server/src/routes/health.rs
//! Health check endpoint for the API.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Response for the health check endpoint.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub active_jobs: usize,
    pub extractor_available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extractor_script: Option<String>,
}

/// GET /api/health - Health check endpoint.
///
/// Returns server status, version, uptime, in-flight job count, and whether
/// the universal extractor script was found.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let extractor_available = state.extractor_available();
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.uptime_secs(),
        active_jobs: state.store.active_count(),
        extractor_available,
        extractor_script: extractor_available
            .then(|| {
                state
                    .config
                    .extractor_script
                    .as_ref()
                    .map(|p| p.display().to_string())
            })
            .flatten(),
    })
}

/// Create the health routes router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health_check))
}
