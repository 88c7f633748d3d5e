// crates/server/src/jobs/worker.rs
//! Per-job worker: runs the two-stage extraction pipeline and writes every
//! outcome back into the job store. Nothing here propagates errors upward —
//! a worker's failures exist only as job state.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use mediabox_core::{
    has_media_files, scan_media_files, ExtractorStage, MediaFile, FALLBACK_EXTENSIONS,
    IMAGE_EXTENSIONS, PRIMARY_EXTENSIONS,
};

use super::types::{JobFile, JobStatus};
use crate::state::AppState;

/// Why an extraction stage produced no usable result.
#[derive(Debug)]
struct StageFailure {
    stage: &'static str,
    reason: String,
}

type StageResult = Result<Vec<MediaFile>, StageFailure>;

/// Spawn the worker task for an accepted job.
///
/// The outer task supervises the pipeline: if the inner task panics, the job
/// is still moved to a terminal `error` state instead of hanging in
/// `processing` forever.
pub fn spawn_worker(
    state: Arc<AppState>,
    job_id: String,
    url: String,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let pipeline_state = Arc::clone(&state);
        let pipeline_id = job_id.clone();
        let pipeline =
            tokio::spawn(async move { run_job(pipeline_state, pipeline_id, url).await });

        if let Err(e) = pipeline.await {
            tracing::error!(job_id = %job_id, error = %e, "worker task aborted");
            state.store.update(&job_id, |job| {
                job.status = JobStatus::Error;
                job.message = "internal worker failure".to_string();
            });
        }
    })
}

async fn run_job(state: Arc<AppState>, job_id: String, url: String) {
    let dir = state.config.job_dir(&job_id);
    if let Err(e) = tokio::fs::create_dir_all(&dir).await {
        tracing::error!(job_id = %job_id, dir = %dir.display(), error = %e, "cannot create job directory");
        state.store.update(&job_id, |job| {
            job.status = JobStatus::Error;
            job.message = "could not create job directory".to_string();
        });
        return;
    }

    state.store.update(&job_id, |job| {
        job.progress = 10;
        job.message = "starting download".to_string();
    });

    // Stage 1: universal script, if configured and present.
    let mut last_failure = None;
    if let Some(primary) = state.primary.as_ref().filter(|s| s.is_available()) {
        state.store.update(&job_id, |job| {
            job.progress = 30;
            job.message = "running universal extractor".to_string();
        });

        match run_primary(primary.as_ref(), &state, &url, &dir).await {
            Ok(files) => {
                finish(&state, &job_id, files, "download complete");
                return;
            }
            Err(failure) => {
                tracing::warn!(
                    job_id = %job_id,
                    stage = failure.stage,
                    reason = %failure.reason,
                    "stage failed, trying fallback"
                );
                last_failure = Some(failure);
            }
        }
    }

    // Stage 2: yt-dlp fallback.
    state.store.update(&job_id, |job| {
        job.progress = 50;
        job.message = "running yt-dlp fallback".to_string();
    });

    match run_fallback(state.fallback.as_ref(), &url, &dir).await {
        Ok(files) => finish(&state, &job_id, files, "download complete via yt-dlp"),
        Err(failure) => {
            tracing::warn!(
                job_id = %job_id,
                stage = failure.stage,
                reason = %failure.reason,
                "all extraction stages failed"
            );
            let reason = last_failure.map_or_else(
                || failure.reason.clone(),
                |first| format!("{}; {}: {}", first.reason, failure.stage, failure.reason),
            );
            state.store.update(&job_id, |job| {
                job.status = JobStatus::Error;
                job.message = format!("download failed: {reason}");
            });
        }
    }
}

/// Run the universal extractor and scan its output.
///
/// A failed process run still counts as success when the site policy allows
/// image supplements and the script left gallery images in the job dir.
async fn run_primary(
    stage: &dyn ExtractorStage,
    state: &AppState,
    url: &str,
    dir: &Path,
) -> StageResult {
    let allowlist = match stage.extract(url, dir).await {
        Ok(()) => PRIMARY_EXTENSIONS.to_vec(),
        Err(_)
            if state.config.site_policy.allows_image_supplement(url)
                && has_media_files(dir, IMAGE_EXTENSIONS) =>
        {
            tracing::info!(url, "stage failed but gallery images were produced, keeping them");
            // Broad allowlist plus every image extension the policy covers.
            PRIMARY_EXTENSIONS
                .iter()
                .chain(IMAGE_EXTENSIONS)
                .copied()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect::<Vec<_>>()
        }
        Err(e) => {
            return Err(StageFailure {
                stage: "universal",
                reason: e.to_string(),
            })
        }
    };

    scan_media_files(dir, &allowlist).map_err(|e| StageFailure {
        stage: "universal",
        reason: e.to_string(),
    })
}

/// Run yt-dlp and scan for the narrow video allowlist.
async fn run_fallback(stage: &dyn ExtractorStage, url: &str, dir: &Path) -> StageResult {
    stage.extract(url, dir).await.map_err(|e| StageFailure {
        stage: "yt-dlp",
        reason: e.to_string(),
    })?;

    scan_media_files(dir, FALLBACK_EXTENSIONS).map_err(|e| StageFailure {
        stage: "yt-dlp",
        reason: e.to_string(),
    })
}

/// One discrete store write: file list, terminal status, full progress.
fn finish(state: &AppState, job_id: &str, files: Vec<MediaFile>, message: &str) {
    let reported: Vec<JobFile> = files
        .iter()
        .map(|f| JobFile::from_media(job_id, f))
        .collect();
    tracing::info!(job_id, file_count = reported.len(), "job completed");
    state.store.update(job_id, |job| {
        job.files = reported;
        job.status = JobStatus::Completed;
        job.progress = 100;
        job.message = message.to_string();
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::jobs::testing::MockStage;
    use std::sync::Arc;

    fn state_with(
        downloads_dir: &Path,
        primary: Option<Arc<MockStage>>,
        fallback: Arc<MockStage>,
    ) -> Arc<AppState> {
        let config = Config {
            downloads_dir: downloads_dir.to_path_buf(),
            ..Config::default()
        };
        AppState::with_stages(
            config,
            primary.map(|s| s as Arc<dyn ExtractorStage>),
            fallback as Arc<dyn ExtractorStage>,
        )
    }

    #[tokio::test]
    async fn test_primary_success_short_circuits_fallback() {
        let tmp = tempfile::tempdir().unwrap();
        let primary = Arc::new(MockStage::succeeding(
            "universal",
            &[("clip.mp4", 1024), ("cover.jpg", 512), ("notes.txt", 9)],
        ));
        let fallback = Arc::new(MockStage::failing("yt-dlp"));
        let state = state_with(tmp.path(), Some(primary.clone()), fallback.clone());

        let id = state.store.create("https://example.com/v1");
        spawn_worker(Arc::clone(&state), id.clone(), "https://example.com/v1".into())
            .await
            .unwrap();

        let snap = state.store.get(&id).unwrap();
        assert_eq!(snap.status, JobStatus::Completed);
        assert_eq!(snap.progress, 100);
        let names: Vec<_> = snap.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["clip.mp4", "cover.jpg"]); // .txt excluded

        assert_eq!(primary.calls(), 1);
        assert_eq!(fallback.calls(), 0); // never invoked
    }

    #[tokio::test]
    async fn test_fallback_runs_when_primary_absent() {
        let tmp = tempfile::tempdir().unwrap();
        let fallback = Arc::new(MockStage::succeeding("yt-dlp", &[("clip.mp4", 2_097_152)]));
        let state = state_with(tmp.path(), None, fallback.clone());

        let id = state.store.create("https://example.com/v1");
        spawn_worker(Arc::clone(&state), id.clone(), "https://example.com/v1".into())
            .await
            .unwrap();

        let snap = state.store.get(&id).unwrap();
        assert_eq!(snap.status, JobStatus::Completed);
        assert_eq!(snap.files.len(), 1);
        assert_eq!(snap.files[0].name, "clip.mp4");
        assert_eq!(snap.files[0].size_formatted, "2.0 MB");
        assert_eq!(snap.files[0].media_type, mediabox_core::MediaType::Video);
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test]
    async fn test_fallback_runs_after_primary_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let primary = Arc::new(MockStage::failing("universal"));
        let fallback = Arc::new(MockStage::succeeding("yt-dlp", &[("video.webm", 4096)]));
        let state = state_with(tmp.path(), Some(primary.clone()), fallback.clone());

        let id = state.store.create("u");
        spawn_worker(Arc::clone(&state), id.clone(), "https://example.com/v2".into())
            .await
            .unwrap();

        let snap = state.store.get(&id).unwrap();
        assert_eq!(snap.status, JobStatus::Completed);
        assert_eq!(snap.files[0].name, "video.webm");
        assert_eq!(primary.calls(), 1);
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test]
    async fn test_fallback_ignores_non_video_output() {
        let tmp = tempfile::tempdir().unwrap();
        let fallback = Arc::new(MockStage::succeeding(
            "yt-dlp",
            &[("clip.mp4", 10), ("thumb.jpg", 5)],
        ));
        let state = state_with(tmp.path(), None, fallback);

        let id = state.store.create("u");
        spawn_worker(Arc::clone(&state), id.clone(), "u".into())
            .await
            .unwrap();

        let snap = state.store.get(&id).unwrap();
        let names: Vec<_> = snap.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["clip.mp4"]); // narrow allowlist, video only
    }

    #[tokio::test]
    async fn test_both_stages_failing_marks_error() {
        let tmp = tempfile::tempdir().unwrap();
        let primary = Arc::new(MockStage::failing("universal"));
        let fallback = Arc::new(MockStage::failing("yt-dlp"));
        let state = state_with(tmp.path(), Some(primary), fallback);

        let id = state.store.create("u");
        spawn_worker(Arc::clone(&state), id.clone(), "https://example.com/bad".into())
            .await
            .unwrap();

        let snap = state.store.get(&id).unwrap();
        assert_eq!(snap.status, JobStatus::Error);
        assert!(snap.completed);
        assert!(snap.files.is_empty());
        assert!(snap.message.contains("download failed"));
    }

    #[tokio::test]
    async fn test_image_supplement_rescues_failed_primary() {
        let tmp = tempfile::tempdir().unwrap();
        // Script "fails" overall but leaves gallery images behind.
        let primary = Arc::new(MockStage::failing_with_files(
            "universal",
            &[("gallery_01.webp", 300), ("gallery_02.jpg", 400)],
        ));
        let fallback = Arc::new(MockStage::failing("yt-dlp"));
        let state = state_with(tmp.path(), Some(primary), fallback.clone());

        let url = "https://www.erome.com/a/abc123";
        let id = state.store.create(url);
        spawn_worker(Arc::clone(&state), id.clone(), url.into())
            .await
            .unwrap();

        let snap = state.store.get(&id).unwrap();
        assert_eq!(snap.status, JobStatus::Completed);
        let names: Vec<_> = snap.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["gallery_01.webp", "gallery_02.jpg"]);
        assert_eq!(fallback.calls(), 0);
    }

    #[tokio::test]
    async fn test_supplement_does_not_apply_to_other_hosts() {
        let tmp = tempfile::tempdir().unwrap();
        let primary = Arc::new(MockStage::failing_with_files(
            "universal",
            &[("gallery_01.jpg", 300)],
        ));
        let fallback = Arc::new(MockStage::failing("yt-dlp"));
        let state = state_with(tmp.path(), Some(primary), fallback.clone());

        let url = "https://example.com/a/abc123";
        let id = state.store.create(url);
        spawn_worker(Arc::clone(&state), id.clone(), url.into())
            .await
            .unwrap();

        assert_eq!(state.store.get(&id).unwrap().status, JobStatus::Error);
        assert_eq!(fallback.calls(), 1); // fallback still attempted
    }

    #[tokio::test]
    async fn test_concurrent_jobs_are_isolated() {
        let tmp = tempfile::tempdir().unwrap();
        // The mock names its output after the URL's last path segment, so a
        // cross-job write would show up in the other job's file list.
        let fallback = Arc::new(MockStage::url_named("yt-dlp"));
        let state = state_with(tmp.path(), None, fallback);

        let id_a = state.store.create("https://example.com/alpha");
        let id_b = state.store.create("https://example.com/beta");
        let worker_a = spawn_worker(Arc::clone(&state), id_a.clone(), "https://example.com/alpha".into());
        let worker_b = spawn_worker(Arc::clone(&state), id_b.clone(), "https://example.com/beta".into());
        worker_a.await.unwrap();
        worker_b.await.unwrap();

        let snap_a = state.store.get(&id_a).unwrap();
        let snap_b = state.store.get(&id_b).unwrap();
        assert_eq!(snap_a.files.len(), 1);
        assert_eq!(snap_b.files.len(), 1);
        assert_eq!(snap_a.files[0].name, "alpha.mp4");
        assert_eq!(snap_b.files[0].name, "beta.mp4");
        assert!(snap_a.files[0].download_path.contains(&id_a));
        assert!(snap_b.files[0].download_path.contains(&id_b));
    }

    #[tokio::test]
    async fn test_panicking_stage_ends_in_error_state() {
        let tmp = tempfile::tempdir().unwrap();
        let fallback = Arc::new(MockStage::panicking("yt-dlp"));
        let state = state_with(tmp.path(), None, fallback);

        let id = state.store.create("u");
        spawn_worker(Arc::clone(&state), id.clone(), "u".into())
            .await
            .unwrap();

        let snap = state.store.get(&id).unwrap();
        assert_eq!(snap.status, JobStatus::Error);
        assert_eq!(snap.message, "internal worker failure");
    }
}
