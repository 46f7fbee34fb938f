//! Format/Quality Resolver.
//!
//! Each Mode has its own format catalog with a canonical default. The
//! catalog is reloaded from the extraction service on Mode activation, with
//! a built-in fallback mirroring the service's defaults so selection keeps
//! working offline. Size estimates from the Metadata Snapshot are attached
//! for display only and never gate selection.

use std::collections::HashMap;

use crate::api::{ExtractorApi, FormatCatalogDto};
use crate::models::{MetadataSnapshot, Mode};

/// The formats valid for one Mode, with display labels.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatCatalog {
    pub mode: Mode,
    pub formats: Vec<String>,
    pub default_format: String,
    pub labels: HashMap<String, String>,
}

impl FormatCatalog {
    /// Built-in catalog used until (or instead of) a remote reload.
    pub fn builtin(mode: Mode) -> Self {
        match mode {
            Mode::Audio => Self {
                mode,
                formats: ["mp3", "m4a", "wav", "opus", "vorbis", "aac"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                default_format: "mp3".to_string(),
                labels: [
                    ("mp3", "MP3 (192 kbps)"),
                    ("m4a", "M4A (AAC)"),
                    ("wav", "WAV (lossless)"),
                    ("opus", "Opus"),
                    ("vorbis", "Ogg Vorbis"),
                    ("aac", "AAC"),
                ]
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            },
            Mode::Video => Self {
                mode,
                formats: ["best", "1080p", "720p", "480p", "360p"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                default_format: "best".to_string(),
                labels: [
                    ("best", "Best available"),
                    ("1080p", "1080p MP4"),
                    ("720p", "720p MP4"),
                    ("480p", "480p MP4"),
                    ("360p", "360p MP4"),
                ]
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            },
        }
    }

    fn from_dto(mode: Mode, dto: FormatCatalogDto) -> Self {
        // Keep any built-in labels that still apply; unknown formats fall
        // back to their raw name at display time.
        let labels = Self::builtin(mode).labels;
        Self {
            mode,
            formats: dto.formats,
            default_format: dto.default_format,
            labels,
        }
    }

    pub fn contains(&self, format: &str) -> bool {
        self.formats.iter().any(|f| f == format)
    }

    pub fn label_for<'a>(&'a self, format: &'a str) -> &'a str {
        self.labels.get(format).map(String::as_str).unwrap_or(format)
    }
}

/// The active catalog plus the user's current selection.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatSelection {
    catalog: FormatCatalog,
    selected: String,
}

impl FormatSelection {
    pub fn new(mode: Mode) -> Self {
        let catalog = FormatCatalog::builtin(mode);
        let selected = catalog.default_format.clone();
        Self { catalog, selected }
    }

    /// Reload the catalog for a Mode from the remote collaborator.
    ///
    /// The selection resets to the built-in default synchronously, before the
    /// remote call resolves; a successful reload then swaps in the served
    /// catalog and its default.
    pub async fn reload<A: ExtractorApi>(&mut self, api: &A, mode: Mode) {
        *self = Self::new(mode);

        match api.list_formats(mode).await {
            Ok(dto) if !dto.formats.is_empty() => {
                self.catalog = FormatCatalog::from_dto(mode, dto);
                self.selected = self.catalog.default_format.clone();
            }
            Ok(_) => {
                log::warn!("empty format catalog for {mode:?}, keeping built-in");
            }
            Err(e) => {
                log::warn!("format catalog fetch failed for {mode:?}: {e}, keeping built-in");
            }
        }
    }

    /// Select a format. Only catalog members are accepted; returns whether
    /// the selection changed.
    pub fn select(&mut self, format: &str) -> bool {
        if self.catalog.contains(format) {
            self.selected = format.to_string();
            true
        } else {
            false
        }
    }

    pub fn selected(&self) -> &str {
        &self.selected
    }

    pub fn catalog(&self) -> &FormatCatalog {
        &self.catalog
    }
}

/// Display-only size estimate for a format, looked up in the snapshot.
/// Absent size data never blocks selection.
pub fn size_hint(snapshot: Option<&MetadataSnapshot>, mode: Mode, format: &str) -> Option<String> {
    let snapshot = snapshot?;
    match mode {
        Mode::Audio => snapshot.audio_sizes.get(format).cloned(),
        Mode::Video => snapshot
            .video_formats
            .iter()
            .find(|f| f.resolution.as_deref() == Some(format) || f.format_id == format)
            .and_then(|f| f.filesize_approx)
            .map(format_bytes),
    }
}

fn format_bytes(bytes: u64) -> String {
    const MIB: f64 = 1024.0 * 1024.0;
    let mib = bytes as f64 / MIB;
    if mib >= 1024.0 {
        format!("{:.1} GiB", mib / 1024.0)
    } else {
        format!("{mib:.1} MiB")
    }
}
