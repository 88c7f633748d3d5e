// crates/core/src/media.rs
//! Media classification and size formatting.

use serde::{Deserialize, Serialize};

/// Extensions accepted from the universal extractor (stage 1).
pub const PRIMARY_EXTENSIONS: &[&str] = &["mp4", "webm", "mkv", "mp3", "m4a", "jpg", "png"];

/// Extensions accepted from the yt-dlp fallback (stage 2). Video only.
pub const FALLBACK_EXTENSIONS: &[&str] = &["mp4", "webm", "mkv"];

/// Extensions that count as supplementary gallery images (site policy).
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Broad media class reported alongside each downloaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Video,
    Audio,
    Image,
    Unknown,
}

impl MediaType {
    /// Classify a filename by its extension.
    pub fn from_filename(name: &str) -> Self {
        let ext = name.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
        match ext.as_str() {
            "mp4" | "webm" | "mkv" | "avi" => Self::Video,
            "mp3" | "m4a" | "wav" | "flac" => Self::Audio,
            "jpg" | "jpeg" | "png" | "gif" => Self::Image,
            _ => Self::Unknown,
        }
    }

}

/// Content type for serving a file, keyed on its extension.
pub fn content_type_for(name: &str) -> &'static str {
    match file_extension(name).as_deref() {
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mkv") => "video/x-matroska",
        Some("avi") => "video/x-msvideo",
        Some("mp3") => "audio/mpeg",
        Some("m4a") => "audio/mp4",
        Some("wav") => "audio/wav",
        Some("flac") => "audio/flac",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Lowercase extension of a filename, if any.
pub fn file_extension(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Format a byte count as a human-readable size with one decimal place.
///
/// 1024-based: `2_097_152` formats as `"2.0 MB"`.
pub fn format_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if size < 1024.0 {
            return format!("{size:.1} {unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.1} TB")
}
