//! Engine -> embedder notifications.
//!
//! One-way, fire-and-forget events. The embedding UI subscribes once and
//! switches on the variant; no acknowledgment is expected and a full channel
//! simply drops the notification.

use tokio::sync::mpsc;

/// Notifications emitted by the orchestration session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A passive channel (clipboard, drop) produced a new Source Reference.
    SourceDetected { url: String },
    /// A submission completed and the history store changed; dependent views
    /// should re-read it.
    HistoryUpdated,
}

/// Build the engine event channel.
pub fn channel() -> (mpsc::Sender<EngineEvent>, mpsc::Receiver<EngineEvent>) {
    mpsc::channel(32)
}
