// crates/core/src/extractor.rs
//! Extraction stages — spawn external tools that populate a job directory.
//!
//! Each stage is an external process invoked with `(url, target dir)` and a
//! hard timeout. Failures never cross this boundary as panics or raw IO
//! errors; everything is folded into [`ExtractError`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;

/// Default ceiling for a single extraction stage.
pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(300);

/// Errors produced by an extraction stage.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to spawn extractor: {0}")]
    Spawn(String),

    #[error("extractor timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("extractor exited with {}: {stderr}", code.map_or_else(|| "signal".to_string(), |c| format!("code {c}")))]
    Failed { code: Option<i32>, stderr: String },
}

/// One attempt to populate a job directory with media files from a URL.
///
/// Implementations block the calling task (not the process) for at most
/// their configured timeout.
#[async_trait]
pub trait ExtractorStage: Send + Sync {
    /// Short stage name for logs and error messages.
    fn name(&self) -> &str;

    /// Whether this stage can run at all (tool installed, script present).
    fn is_available(&self) -> bool {
        true
    }

    /// Run the stage against `url`, writing output files into `dir`.
    async fn extract(&self, url: &str, dir: &Path) -> Result<(), ExtractError>;
}

/// Run `cmd` with null stdin and captured output, bounded by `limit`.
async fn run_bounded(
    stage: &str,
    mut cmd: Command,
    limit: Duration,
) -> Result<(), ExtractError> {
    cmd.stdin(std::process::Stdio::null());
    cmd.kill_on_drop(true);

    let t0 = std::time::Instant::now();
    let output = timeout(limit, cmd.output())
        .await
        .map_err(|_| {
            tracing::warn!(stage, elapsed_ms = t0.elapsed().as_millis() as u64, "extractor timed out");
            ExtractError::Timeout { secs: limit.as_secs() }
        })?
        .map_err(|e| {
            tracing::error!(stage, error = %e, "failed to spawn extractor");
            ExtractError::Spawn(e.to_string())
        })?;

    let elapsed_ms = t0.elapsed().as_millis() as u64;
    if !output.status.success() {
        // Char-based truncation: a byte cut could land inside a multibyte
        // sequence in localized tool output.
        let stderr: String = String::from_utf8_lossy(&output.stderr)
            .trim()
            .chars()
            .take(500)
            .collect();
        tracing::warn!(
            stage,
            elapsed_ms,
            exit_code = ?output.status.code(),
            stderr = %stderr,
            "extractor exited non-zero"
        );
        return Err(ExtractError::Failed {
            code: output.status.code(),
            stderr,
        });
    }

    tracing::info!(stage, elapsed_ms, "extractor finished");
    Ok(())
}

/// Stage 1 — the universal downloader script.
///
/// Invoked as `{program} {script} {url} {dir}`. The script handles site
/// specific logic internally (including gallery image scraping), so from
/// here it is just a process with an exit code.
pub struct UniversalExtractor {
    program: String,
    script: PathBuf,
    timeout: Duration,
}

impl UniversalExtractor {
    pub fn new(program: impl Into<String>, script: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            script: script.into(),
            timeout: DEFAULT_STAGE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn script(&self) -> &Path {
        &self.script
    }
}

#[async_trait]
impl ExtractorStage for UniversalExtractor {
    fn name(&self) -> &str {
        "universal"
    }

    fn is_available(&self) -> bool {
        self.script.exists()
    }

    async fn extract(&self, url: &str, dir: &Path) -> Result<(), ExtractError> {
        tracing::info!(
            stage = self.name(),
            script = %self.script.display(),
            url,
            dir = %dir.display(),
            "spawning universal extractor"
        );
        let mut cmd = Command::new(&self.program);
        cmd.arg(&self.script).arg(url).arg(dir);
        run_bounded(self.name(), cmd, self.timeout).await
    }
}

/// Stage 2 — generic yt-dlp fallback.
///
/// Format capped at 1080p, playlist expansion disabled, title-templated
/// output names inside the job directory.
pub struct YtDlpExtractor {
    program: String,
    timeout: Duration,
}

impl YtDlpExtractor {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            timeout: DEFAULT_STAGE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl ExtractorStage for YtDlpExtractor {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn extract(&self, url: &str, dir: &Path) -> Result<(), ExtractError> {
        tracing::info!(stage = self.name(), url, dir = %dir.display(), "spawning yt-dlp");
        let output_template = dir.join("%(title)s.%(ext)s");
        let mut cmd = Command::new(&self.program);
        cmd.args(["--format", "best[height<=1080]", "--no-playlist", "--output"])
            .arg(output_template)
            .arg(url);
        run_bounded(self.name(), cmd, self.timeout).await
    }
}
