// crates/server/src/jobs/types.rs
//! Types for tracked download jobs.

use std::time::{Duration, SystemTime};

use mediabox_core::{format_size, MediaFile};
use serde::Serialize;

/// Lifecycle status of a job. `Completed` and `Error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Processing,
    Completed,
    Error,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Processing)
    }
}

/// One downloaded file as reported to clients.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
#[serde(rename_all = "camelCase")]
pub struct JobFile {
    pub name: String,
    pub size_formatted: String,
    pub download_path: String,
    pub media_type: mediabox_core::MediaType,
}

impl JobFile {
    /// Build the reported entry for a scanned media file.
    pub fn from_media(job_id: &str, file: &MediaFile) -> Self {
        Self {
            download_path: format!("/api/download/{}/{}", job_id, file.name),
            size_formatted: format_size(file.size_bytes),
            media_type: file.media_type,
            name: file.name.clone(),
        }
    }
}

/// A tracked unit of asynchronous download work.
///
/// Mutated only by the single worker task that owns it; everyone else reads
/// cloned snapshots out of the store.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    pub source_url: String,
    pub status: JobStatus,
    pub progress: u8,
    pub message: String,
    pub created_at: SystemTime,
    pub files: Vec<JobFile>,
}

impl Job {
    pub fn new(id: String, source_url: String) -> Self {
        Self {
            id,
            source_url,
            status: JobStatus::Processing,
            progress: 0,
            message: "accepted".to_string(),
            created_at: SystemTime::now(),
            files: Vec::new(),
        }
    }

    /// Age of the job, saturating to zero if the clock moved backwards.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed().unwrap_or(Duration::ZERO)
    }

    pub fn is_expired(&self, expiry: Duration) -> bool {
        self.age() > expiry
    }
}

/// Point-in-time view of a job, as served by the status endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub job_id: String,
    pub status: JobStatus,
    pub progress: u8,
    pub message: String,
    pub completed: bool,
    pub files: Vec<JobFile>,
}

impl From<&Job> for JobSnapshot {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id.clone(),
            status: job.status,
            progress: job.progress,
            message: job.message.clone(),
            completed: job.status.is_terminal(),
            files: job.files.clone(),
        }
    }
}
