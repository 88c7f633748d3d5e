// crates/core/src/scan.rs
//! Scan a job directory for downloaded media files.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::media::{file_extension, MediaType};

/// Errors that can occur while scanning a job directory.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Job directory not found: {path}")]
    NotFound { path: PathBuf },

    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ScanError {
    fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }
}

/// A media file produced by an extraction stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub name: String,
    pub size_bytes: u64,
    pub media_type: MediaType,
}

/// List regular files in `dir` whose extension is in `allowlist`.
///
/// Non-recursive; results are sorted by name so the reported file list is
/// deterministic regardless of directory iteration order.
pub fn scan_media_files(dir: &Path, allowlist: &[&str]) -> Result<Vec<MediaFile>, ScanError> {
    let entries = std::fs::read_dir(dir).map_err(|e| ScanError::io(dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ScanError::io(dir, e))?;
        let meta = entry.metadata().map_err(|e| ScanError::io(entry.path(), e))?;
        if !meta.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(ext) = file_extension(&name) else {
            continue;
        };
        if !allowlist.contains(&ext.as_str()) {
            continue;
        }
        files.push(MediaFile {
            media_type: MediaType::from_filename(&name),
            size_bytes: meta.len(),
            name,
        });
    }

    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

/// True if `dir` contains at least one file matching `allowlist`.
pub fn has_media_files(dir: &Path, allowlist: &[&str]) -> bool {
    scan_media_files(dir, allowlist).map_or(false, |files| !files.is_empty())
}
