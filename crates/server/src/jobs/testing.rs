// crates/server/src/jobs/testing.rs
//! Mock extraction stage for worker and route tests.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use mediabox_core::{ExtractError, ExtractorStage};

enum Behavior {
    /// Write the given files, then report success.
    Succeed(Vec<(String, usize)>),
    /// Report failure without touching the directory.
    Fail,
    /// Write the given files, then report failure anyway (partial output).
    FailWithFiles(Vec<(String, usize)>),
    /// Write `{last URL path segment}.mp4`, then report success.
    UrlNamed,
    /// Panic mid-extraction.
    Panic,
}

/// Scripted [`ExtractorStage`] that records how often it was invoked.
pub(crate) struct MockStage {
    name: &'static str,
    behavior: Behavior,
    call_count: AtomicUsize,
}

impl MockStage {
    fn new(name: &'static str, behavior: Behavior) -> Self {
        Self {
            name,
            behavior,
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn succeeding(name: &'static str, files: &[(&str, usize)]) -> Self {
        Self::new(name, Behavior::Succeed(owned(files)))
    }

    pub fn failing(name: &'static str) -> Self {
        Self::new(name, Behavior::Fail)
    }

    pub fn failing_with_files(name: &'static str, files: &[(&str, usize)]) -> Self {
        Self::new(name, Behavior::FailWithFiles(owned(files)))
    }

    pub fn url_named(name: &'static str) -> Self {
        Self::new(name, Behavior::UrlNamed)
    }

    pub fn panicking(name: &'static str) -> Self {
        Self::new(name, Behavior::Panic)
    }

    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

fn owned(files: &[(&str, usize)]) -> Vec<(String, usize)> {
    files.iter().map(|(n, s)| (n.to_string(), *s)).collect()
}

fn write_files(dir: &Path, files: &[(String, usize)]) {
    for (name, size) in files {
        std::fs::write(dir.join(name), vec![0u8; *size]).expect("mock write");
    }
}

fn mock_failure() -> ExtractError {
    ExtractError::Failed {
        code: Some(1),
        stderr: "mock failure".to_string(),
    }
}

#[async_trait]
impl ExtractorStage for MockStage {
    fn name(&self) -> &str {
        self.name
    }

    async fn extract(&self, url: &str, dir: &Path) -> Result<(), ExtractError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Succeed(files) => {
                write_files(dir, files);
                Ok(())
            }
            Behavior::Fail => Err(mock_failure()),
            Behavior::FailWithFiles(files) => {
                write_files(dir, files);
                Err(mock_failure())
            }
            Behavior::UrlNamed => {
                let segment = url.rsplit('/').next().unwrap_or("output");
                std::fs::write(dir.join(format!("{segment}.mp4")), b"data").expect("mock write");
                Ok(())
            }
            Behavior::Panic => panic!("mock stage panic"),
        }
    }
}
