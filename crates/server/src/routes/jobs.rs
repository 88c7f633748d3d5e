// crates/server/src/routes/jobs.rs
//! Job submission, status polling, and file download.
//!
//! - POST /api/process — accept a URL, spawn a download job
//! - GET  /api/status/{job_id} — poll job state (reaps expired jobs)
//! - GET  /api/download/{job_id}/{filename} — stream a produced file

use std::path::{Component, Path as FsPath};
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use mediabox_core::content_type_for;
use tokio_util::io::ReaderStream;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::jobs::{reap, spawn_worker, JobSnapshot};
use crate::state::AppState;

/// Request body for job submission.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ProcessRequest {
    pub url: Option<String>,
}

/// Response for an accepted job.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
#[serde(rename_all = "camelCase")]
pub struct ProcessResponse {
    pub success: bool,
    pub job_id: String,
    pub message: String,
    pub status_url: String,
}

/// POST /api/process - Accept a media URL and start a download job.
///
/// Returns immediately; the extraction pipeline runs in a spawned task.
pub async fn process_url(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ProcessRequest>,
) -> ApiResult<Json<ProcessResponse>> {
    let url = req
        .url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::BadRequest("url is required".to_string()))?;

    let job_id = state.store.create(&url);
    let dir = state.config.job_dir(&job_id);
    if let Err(e) = tokio::fs::create_dir_all(&dir).await {
        // Undo the store entry so the id isn't left live without a directory.
        state.store.remove(&job_id);
        tracing::error!(job_id = %job_id, dir = %dir.display(), error = %e, "cannot create job directory");
        return Err(ApiError::Internal(format!(
            "cannot create job directory: {e}"
        )));
    }

    tracing::info!(job_id = %job_id, url = %url, "job accepted");
    spawn_worker(Arc::clone(&state), job_id.clone(), url);

    Ok(Json(ProcessResponse {
        success: true,
        status_url: format!("/api/status/{job_id}"),
        message: "processing started".to_string(),
        job_id,
    }))
}

/// GET /api/status/{job_id} - Poll job state.
///
/// An expired job is reaped here as a side effect and reported as gone.
pub async fn job_status(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobSnapshot>> {
    if state.store.get(&job_id).is_none() {
        return Err(ApiError::JobNotFound(job_id));
    }

    if state.store.is_expired(&job_id, state.config.job_expiry) == Some(true) {
        if let Err(e) = reap(&state.store, &state.config.downloads_dir, &job_id) {
            tracing::warn!(job_id = %job_id, error = %e, "lazy reap failed");
        }
        return Err(ApiError::JobExpired(job_id));
    }

    state
        .store
        .get(&job_id)
        .map(Json)
        .ok_or(ApiError::JobNotFound(job_id))
}

/// GET /api/download/{job_id}/{filename} - Serve one file from a job's directory.
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path((job_id, filename)): Path<(String, String)>,
) -> ApiResult<Response> {
    if state.store.get(&job_id).is_none() {
        return Err(ApiError::JobNotFound(job_id));
    }

    // The filename must stay inside the job's own directory.
    if !is_plain_filename(&filename) {
        tracing::warn!(job_id = %job_id, filename = %filename, "rejected traversal attempt");
        return Err(ApiError::FileNotFound(filename));
    }

    // Stream from disk; produced videos can be far too large to buffer.
    let path = state.config.job_dir(&job_id).join(&filename);
    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::FileNotFound(filename));
        }
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "failed to open file");
            return Err(ApiError::Internal(format!("failed to open file: {e}")));
        }
    };
    let size = file
        .metadata()
        .await
        .map_err(|e| ApiError::Internal(format!("failed to stat file: {e}")))?
        .len();

    let disposition = format!("attachment; filename=\"{}\"", filename.replace('"', ""));
    Ok((
        [
            (header::CONTENT_TYPE, content_type_for(&filename).to_string()),
            (header::CONTENT_LENGTH, size.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response())
}

/// True if `name` resolves to a single normal path component.
fn is_plain_filename(name: &str) -> bool {
    if name.contains('\\') {
        return false;
    }
    let mut components = FsPath::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Build the jobs router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/process", post(process_url))
        .route("/status/{job_id}", get(job_status))
        .route("/download/{job_id}/{filename}", get(download_file))
}
