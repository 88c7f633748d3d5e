// crates/server/src/state.rs
//! Application state for the Axum server.

use std::sync::Arc;
use std::time::Instant;

use mediabox_core::{ExtractorStage, UniversalExtractor, YtDlpExtractor};

use crate::config::Config;
use crate::jobs::JobStore;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    /// Server start time for uptime tracking.
    pub start_time: Instant,
    /// Runtime configuration (directories, timeouts, site policy).
    pub config: Config,
    /// In-memory job map. The only shared mutable structure.
    pub store: JobStore,
    /// Stage 1: universal downloader script, if configured.
    pub primary: Option<Arc<dyn ExtractorStage>>,
    /// Stage 2: yt-dlp fallback.
    pub fallback: Arc<dyn ExtractorStage>,
}

impl AppState {
    /// Create application state with real extraction stages from `config`.
    pub fn new(config: Config) -> Arc<Self> {
        let primary: Option<Arc<dyn ExtractorStage>> =
            config.extractor_script.as_ref().map(|script| {
                Arc::new(
                    UniversalExtractor::new(&config.extractor_program, script)
                        .with_timeout(config.stage_timeout),
                ) as Arc<dyn ExtractorStage>
            });
        let fallback: Arc<dyn ExtractorStage> = Arc::new(
            YtDlpExtractor::new(&config.ytdlp_program).with_timeout(config.stage_timeout),
        );
        Self::with_stages(config, primary, fallback)
    }

    /// Create application state with externally-provided stages.
    ///
    /// Used by tests to substitute mock stages for the real process adapters.
    pub fn with_stages(
        config: Config,
        primary: Option<Arc<dyn ExtractorStage>>,
        fallback: Arc<dyn ExtractorStage>,
    ) -> Arc<Self> {
        Arc::new(Self {
            start_time: Instant::now(),
            config,
            store: JobStore::new(),
            primary,
            fallback,
        })
    }

    /// Get the server uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Whether the universal extractor is configured and its script exists.
    pub fn extractor_available(&self) -> bool {
        self.primary.as_ref().is_some_and(|stage| stage.is_available())
    }
}
