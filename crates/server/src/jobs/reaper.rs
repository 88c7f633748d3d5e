// crates/server/src/jobs/reaper.rs
//! Expiry of stale jobs: remove the store entry, delete the job directory.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::state::AppState;

use super::store::JobStore;

/// What a reap attempt actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReapOutcome {
    /// Entry and/or directory existed and were removed.
    Reaped,
    /// Neither the entry nor the directory was present.
    AlreadyGone,
}

/// Remove a job's store entry and its backing directory.
///
/// A missing directory is normal (`AlreadyGone` when the entry was missing
/// too); any other filesystem error is surfaced, not swallowed — the caller
/// decides whether a permission failure matters.
pub fn reap(store: &JobStore, downloads_dir: &Path, job_id: &str) -> std::io::Result<ReapOutcome> {
    let had_entry = store.remove(job_id).is_some();

    let dir = downloads_dir.join(job_id);
    let had_dir = match std::fs::remove_dir_all(&dir) {
        Ok(()) => true,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => {
            tracing::error!(job_id, dir = %dir.display(), error = %e, "failed to delete job directory");
            return Err(e);
        }
    };

    if had_entry || had_dir {
        tracing::info!(job_id, had_entry, had_dir, "job reaped");
        Ok(ReapOutcome::Reaped)
    } else {
        Ok(ReapOutcome::AlreadyGone)
    }
}

/// Periodic sweep that reaps every expired job.
///
/// Status reads already reap lazily; this catches jobs nobody polls anymore.
pub async fn run_sweeper(state: Arc<AppState>) {
    let expiry = state.config.job_expiry;
    let interval = expiry.checked_div(4).unwrap_or(Duration::from_secs(900)).max(Duration::from_secs(1));

    loop {
        tokio::time::sleep(interval).await;
        let expired = state.store.expired_ids(expiry);
        if expired.is_empty() {
            continue;
        }
        tracing::info!(count = expired.len(), "sweeping expired jobs");
        for job_id in expired {
            if let Err(e) = reap(&state.store, &state.config.downloads_dir, &job_id) {
                tracing::warn!(job_id = %job_id, error = %e, "sweep could not reap job");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    #[test]
    fn test_reap_removes_entry_and_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JobStore::new();
        let id = store.create("u");
        let dir = tmp.path().join(&id);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("clip.mp4"), b"data").unwrap();

        let outcome = reap(&store, tmp.path(), &id).unwrap();
        assert_eq!(outcome, ReapOutcome::Reaped);
        assert!(store.get(&id).is_none());
        assert!(!dir.exists());
    }

    #[test]
    fn test_reap_entry_without_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JobStore::new();
        let id = store.create("u");

        assert_eq!(reap(&store, tmp.path(), &id).unwrap(), ReapOutcome::Reaped);
    }

    #[test]
    fn test_reap_twice_reports_already_gone() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JobStore::new();
        let id = store.create("u");
        std::fs::create_dir_all(tmp.path().join(&id)).unwrap();

        assert_eq!(reap(&store, tmp.path(), &id).unwrap(), ReapOutcome::Reaped);
        assert_eq!(reap(&store, tmp.path(), &id).unwrap(), ReapOutcome::AlreadyGone);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_reaps_backdated_jobs() {
        let tmp = tempfile::tempdir().unwrap();
        let config = crate::config::Config {
            downloads_dir: tmp.path().to_path_buf(),
            job_expiry: Duration::from_secs(3600),
            ..crate::config::Config::default()
        };
        let state = crate::state::AppState::new(config);

        let id = state.store.create("u");
        std::fs::create_dir_all(tmp.path().join(&id)).unwrap();
        state.store.update(&id, |job| {
            job.created_at = SystemTime::now() - Duration::from_secs(7200);
        });

        let sweeper = tokio::spawn(run_sweeper(Arc::clone(&state)));
        // One sweep interval (expiry / 4) is enough for a backdated job.
        tokio::time::sleep(Duration::from_secs(901)).await;
        tokio::task::yield_now().await;
        sweeper.abort();

        assert!(state.store.get(&id).is_none());
        assert!(!tmp.path().join(&id).exists());
    }
}
