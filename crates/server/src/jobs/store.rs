// crates/server/src/jobs/store.rs
//! In-memory job map shared between the HTTP handlers and workers.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use super::types::{Job, JobSnapshot, JobStatus};

/// Concurrent map from job id to job state.
///
/// Discipline: one writer per entry (the owning worker) plus the reaper on
/// removal; any number of readers. Readers always get cloned snapshots, so a
/// concurrent mutation is observed either entirely or not at all. The lock
/// is never held across an `.await`.
pub struct JobStore {
    jobs: RwLock<HashMap<String, Job>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Allocate a fresh job in `processing` state. Returns its id immediately.
    pub fn create(&self, source_url: impl Into<String>) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let job = Job::new(id.clone(), source_url.into());
        match self.jobs.write() {
            Ok(mut jobs) => {
                jobs.insert(id.clone(), job);
            }
            Err(e) => tracing::error!("RwLock poisoned inserting job: {e}"),
        }
        id
    }

    /// Snapshot of a job, if present.
    pub fn get(&self, id: &str) -> Option<JobSnapshot> {
        match self.jobs.read() {
            Ok(jobs) => jobs.get(id).map(JobSnapshot::from),
            Err(e) => {
                tracing::error!("RwLock poisoned reading job: {e}");
                None
            }
        }
    }

    /// Apply one discrete mutation to a job. Returns false if the job is gone.
    ///
    /// Only the worker that owns the job id may call this.
    pub fn update(&self, id: &str, f: impl FnOnce(&mut Job)) -> bool {
        match self.jobs.write() {
            Ok(mut jobs) => match jobs.get_mut(id) {
                Some(job) => {
                    f(job);
                    true
                }
                None => false,
            },
            Err(e) => {
                tracing::error!("RwLock poisoned updating job: {e}");
                false
            }
        }
    }

    /// Remove a job entry, returning it if it existed.
    pub fn remove(&self, id: &str) -> Option<Job> {
        match self.jobs.write() {
            Ok(mut jobs) => jobs.remove(id),
            Err(e) => {
                tracing::error!("RwLock poisoned removing job: {e}");
                None
            }
        }
    }

    /// Whether a job is older than `expiry`. `None` if the job is unknown.
    pub fn is_expired(&self, id: &str, expiry: Duration) -> Option<bool> {
        match self.jobs.read() {
            Ok(jobs) => jobs.get(id).map(|job| job.is_expired(expiry)),
            Err(e) => {
                tracing::error!("RwLock poisoned reading job age: {e}");
                None
            }
        }
    }

    /// Ids of all jobs past the expiry age, for the periodic sweep.
    pub fn expired_ids(&self, expiry: Duration) -> Vec<String> {
        match self.jobs.read() {
            Ok(jobs) => jobs
                .values()
                .filter(|job| job.is_expired(expiry))
                .map(|job| job.id.clone())
                .collect(),
            Err(e) => {
                tracing::error!("RwLock poisoned listing expired jobs: {e}");
                Vec::new()
            }
        }
    }

    /// Number of jobs still in `processing`.
    pub fn active_count(&self) -> usize {
        match self.jobs.read() {
            Ok(jobs) => jobs
                .values()
                .filter(|job| job.status == JobStatus::Processing)
                .count(),
            Err(e) => {
                tracing::error!("RwLock poisoned counting jobs: {e}");
                0
            }
        }
    }
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}
