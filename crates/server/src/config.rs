// crates/server/src/config.rs
//! Server configuration from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use mediabox_core::SitePolicy;

/// Default per-stage extraction ceiling.
const DEFAULT_STAGE_TIMEOUT_SECS: u64 = 300;

/// Default age after which a job and its directory are reaped.
const DEFAULT_JOB_EXPIRY_SECS: u64 = 3600;

/// Runtime configuration for the mediabox server.
///
/// Every knob has a documented default; all are overridable via
/// `MEDIABOX_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory holding one subdirectory per job id.
    pub downloads_dir: PathBuf,
    /// Path to the universal downloader script. `None` disables stage 1.
    pub extractor_script: Option<PathBuf>,
    /// Interpreter used to run the universal script.
    pub extractor_program: String,
    /// yt-dlp binary for the fallback stage.
    pub ytdlp_program: String,
    /// Hard ceiling per extraction stage.
    pub stage_timeout: Duration,
    /// Job age past which the reaper removes it.
    pub job_expiry: Duration,
    /// Hosts whose gallery images count as stage-1 success on their own.
    pub site_policy: SitePolicy,
}

impl Config {
    /// Build the configuration from the environment.
    ///
    /// - `MEDIABOX_DOWNLOADS_DIR` — downloads root (default `./downloads`)
    /// - `MEDIABOX_EXTRACTOR_SCRIPT` — universal script path (default unset)
    /// - `MEDIABOX_EXTRACTOR_PROGRAM` — script interpreter (default `python3`)
    /// - `MEDIABOX_YTDLP` — yt-dlp binary (default `yt-dlp`)
    /// - `MEDIABOX_STAGE_TIMEOUT_SECS` — per-stage timeout (default 300)
    /// - `MEDIABOX_JOB_EXPIRY_SECS` — job expiry age (default 3600)
    /// - `MEDIABOX_SUPPLEMENT_HOSTS` — comma-separated host list
    pub fn from_env() -> Self {
        let site_policy = match std::env::var("MEDIABOX_SUPPLEMENT_HOSTS") {
            Ok(hosts) => SitePolicy::new(hosts.split(',').map(str::to_string)),
            Err(_) => SitePolicy::default(),
        };

        Self {
            downloads_dir: std::env::var("MEDIABOX_DOWNLOADS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("downloads")),
            extractor_script: std::env::var("MEDIABOX_EXTRACTOR_SCRIPT")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            extractor_program: std::env::var("MEDIABOX_EXTRACTOR_PROGRAM")
                .unwrap_or_else(|_| "python3".to_string()),
            ytdlp_program: std::env::var("MEDIABOX_YTDLP")
                .unwrap_or_else(|_| "yt-dlp".to_string()),
            stage_timeout: Duration::from_secs(env_secs(
                "MEDIABOX_STAGE_TIMEOUT_SECS",
                DEFAULT_STAGE_TIMEOUT_SECS,
            )),
            job_expiry: Duration::from_secs(env_secs(
                "MEDIABOX_JOB_EXPIRY_SECS",
                DEFAULT_JOB_EXPIRY_SECS,
            )),
            site_policy,
        }
    }

    /// Directory owned by a single job.
    pub fn job_dir(&self, job_id: &str) -> PathBuf {
        self.downloads_dir.join(job_id)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            downloads_dir: PathBuf::from("downloads"),
            extractor_script: None,
            extractor_program: "python3".to_string(),
            ytdlp_program: "yt-dlp".to_string(),
            stage_timeout: Duration::from_secs(DEFAULT_STAGE_TIMEOUT_SECS),
            job_expiry: Duration::from_secs(DEFAULT_JOB_EXPIRY_SECS),
            site_policy: SitePolicy::default(),
        }
    }
}

fn env_secs(var: &str, default: u64) -> u64 {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.downloads_dir, PathBuf::from("downloads"));
        assert!(config.extractor_script.is_none());
        assert_eq!(config.ytdlp_program, "yt-dlp");
        assert_eq!(config.stage_timeout, Duration::from_secs(300));
        assert_eq!(config.job_expiry, Duration::from_secs(3600));
    }

    #[test]
    fn test_job_dir_is_per_job() {
        let config = Config::default();
        assert_eq!(config.job_dir("abc"), PathBuf::from("downloads/abc"));
        assert_ne!(config.job_dir("a"), config.job_dir("b"));
    }

    #[test]
    fn test_env_secs_parsing() {
        // Unset or malformed values fall back to the default.
        assert_eq!(env_secs("MEDIABOX_TEST_UNSET_VAR_7741", 42), 42);
    }
}
