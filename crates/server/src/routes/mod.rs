//! API route handlers for the mediabox server.

pub mod health;
pub mod jobs;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Create the combined API router with all routes under /api prefix.
///
/// Routes:
/// - GET  /api/health - Health check
/// - POST /api/process - Submit a media URL for download
/// - GET  /api/status/{job_id} - Poll job progress and results
/// - GET  /api/download/{job_id}/{filename} - Download a produced file
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", health::router())
        .nest("/api", jobs::router())
        .with_state(state)
}
