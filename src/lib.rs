//! AudioTube download orchestration engine.
//!
//! A headless client for a YouTube audio/video extraction service. The
//! engine normalizes source URLs from every input channel, debounces
//! metadata lookups and discards stale responses, resolves per-mode format
//! catalogs, submits download requests with user-facing error
//! classification, simulates staged progress while a request is in flight,
//! and keeps a small expiring history of completed downloads.
//!
//! [`session::EngineSession`] is the front door; the submodules can also be
//! used on their own.

pub mod api;
pub mod controller;
pub mod errors;
pub mod events;
pub mod formats;
pub mod history;
pub mod input;
pub mod metadata;
pub mod models;
pub mod progress;
pub mod session;

pub use api::{ApiConfig, ApiError, ExtractorApi, HttpExtractorApi};
pub use events::EngineEvent;
pub use history::HistoryStore;
pub use input::InputChannel;
pub use models::{
    DownloadRecord, MetadataSnapshot, Mode, SubmissionOutcome,
};
pub use session::{EngineConfig, EngineSession};
