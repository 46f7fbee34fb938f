use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Extraction target. Determines which format catalog and service endpoints apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Audio,
    Video,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Audio => "audio",
            Mode::Video => "video",
        }
    }
}

/// One video format descriptor as reported by the extraction service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoFormatInfo {
    pub format_id: String,
    /// Container extension, e.g. "mp4" or "webm".
    pub ext: String,
    /// Resolution label, e.g. "1080p".
    pub resolution: Option<String>,
    pub fps: Option<f64>,
    /// Best-effort size estimate in bytes.
    pub filesize_approx: Option<u64>,
    #[serde(default)]
    pub has_audio: bool,
}

/// Descriptive data fetched for one Source Reference.
///
/// A snapshot is tied to the reference value it was requested for; the lookup
/// coordinator discards responses whose reference has since changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataSnapshot {
    pub title: String,
    pub thumbnail: Option<String>,
    /// Raw duration in seconds.
    pub duration: Option<u64>,
    pub channel: Option<String>,
    pub view_count: Option<u64>,
    #[serde(default)]
    pub video_formats: Vec<VideoFormatInfo>,
    /// Audio format label -> human-readable size estimate.
    #[serde(default)]
    pub audio_sizes: HashMap<String, String>,
    #[serde(default)]
    pub subtitle_languages: Vec<String>,
    #[serde(default)]
    pub auto_subtitle_languages: Vec<String>,
}

impl MetadataSnapshot {
    /// Duration as "H:MM:SS" or "M:SS", empty when unknown.
    pub fn duration_formatted(&self) -> String {
        self.duration.map(format_duration).unwrap_or_default()
    }
}

/// Format seconds as "H:MM:SS", dropping the hours part when zero.
pub fn format_duration(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

/// Successful submission response from the extraction service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DownloadReceipt {
    pub download_url: String,
    pub title: String,
    pub expires_at: DateTime<Utc>,
}

/// A completed, persisted download. Immutable once created.
///
/// Field names match the persisted JSON layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRecord {
    pub id: Uuid,
    pub title: String,
    pub download_url: String,
    pub format: String,
    #[serde(rename = "type")]
    pub mode: Mode,
    pub timestamp: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl DownloadRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Record contents before the store assigns an id and timestamp.
#[derive(Debug, Clone)]
pub struct NewDownloadRecord {
    pub title: String,
    pub download_url: String,
    pub format: String,
    pub mode: Mode,
    pub expires_at: DateTime<Utc>,
}

/// Transient result of the most recent submission attempt.
/// At most one variant is present at any time; cleared when a new attempt starts.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    Success { download_url: String, title: String },
    Error { message: String },
}

/// Subtitle link response from the extraction service.
#[derive(Debug, Clone, Deserialize)]
pub struct SubtitleLinks {
    pub download_url: String,
}

/// Thumbnail link response from the extraction service.
#[derive(Debug, Clone, Deserialize)]
pub struct ThumbnailLink {
    pub thumbnail_url: String,
}
