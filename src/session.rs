//! Engine Session
//!
//! Wires the whole engine together: one session owns the Source Reference,
//! the active Mode, the metadata coordinator, the format selection, the
//! submission controller, the progress simulator and the history store, and
//! exposes the operations a front end drives.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch, Mutex};

use crate::api::ExtractorApi;
use crate::controller::{SideFetch, SubmissionController};
use crate::events::EngineEvent;
use crate::formats::{self, FormatSelection};
use crate::history::HistoryStore;
use crate::input::{self, InputChannel};
use crate::metadata::{LookupState, MetadataCoordinator, DEBOUNCE};
use crate::models::{DownloadRecord, MetadataSnapshot, Mode, SubmissionOutcome};
use crate::progress::{ProgressSimulator, ProgressState, StagePlan, TICK};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Quiet period after the last source edit before metadata is fetched.
    pub debounce: Duration,
    /// Progress simulator refresh cadence.
    pub tick: Duration,
    pub stage_plan: StagePlan,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce: DEBOUNCE,
            tick: TICK,
            stage_plan: StagePlan::default(),
        }
    }
}

pub struct EngineSession<A> {
    source: String,
    source_valid: bool,
    mode: Mode,
    coordinator: MetadataCoordinator<A>,
    selection: FormatSelection,
    controller: SubmissionController<A>,
    simulator: ProgressSimulator,
    history: Arc<Mutex<HistoryStore>>,
    in_flight_rx: watch::Receiver<bool>,
    events: mpsc::Sender<EngineEvent>,
    api: Arc<A>,
}

impl<A: ExtractorApi + 'static> EngineSession<A> {
    /// Build a session around an extraction service and a history store.
    ///
    /// The returned receiver carries engine notifications; dropping it is
    /// fine, events are fire-and-forget.
    pub fn new(
        api: Arc<A>,
        history: HistoryStore,
        config: EngineConfig,
    ) -> (Self, mpsc::Receiver<EngineEvent>) {
        let history = Arc::new(Mutex::new(history));
        let (events_tx, events_rx) = crate::events::channel();
        let (in_flight_tx, in_flight_rx) = watch::channel(false);

        let coordinator = MetadataCoordinator::new(api.clone(), config.debounce);
        let controller = SubmissionController::new(
            api.clone(),
            history.clone(),
            events_tx.clone(),
            in_flight_tx,
        );
        let simulator =
            ProgressSimulator::spawn(config.stage_plan, config.tick, in_flight_rx.clone());

        let session = Self {
            source: String::new(),
            source_valid: false,
            mode: Mode::Audio,
            coordinator,
            selection: FormatSelection::new(Mode::Audio),
            controller,
            simulator,
            history,
            in_flight_rx,
            events: events_tx,
            api,
        };
        (session, events_rx)
    }

    /// Feed raw text arriving over any input channel.
    ///
    /// Active channels always replace the source; passive channels only do
    /// so when the text is recognized, and announce the detection.
    pub fn input(&mut self, channel: InputChannel, text: &str) {
        let Some(accepted) = input::accept(channel, text) else {
            return;
        };
        // Deep links set the source programmatically too, so they are
        // announced alongside the passive channels.
        if channel.is_passive() || channel == InputChannel::DeepLink {
            let _ = self.events.try_send(EngineEvent::SourceDetected {
                url: accepted.clone(),
            });
        }
        self.set_source(&accepted);
    }

    /// Replace the Source Reference and restart the lookup cycle.
    pub fn set_source(&mut self, source: &str) {
        self.source = source.to_string();
        self.source_valid = input::is_supported_url(source);
        self.coordinator.source_changed(source, self.mode);
    }

    /// Switch between audio and video. A no-op when already in `mode`.
    ///
    /// The selection resets to the built-in catalog before the served
    /// catalog (or the refreshed metadata) can resolve.
    pub async fn set_mode(&mut self, mode: Mode) {
        if mode == self.mode {
            return;
        }
        self.mode = mode;
        self.controller.reset_outcome();
        self.coordinator.mode_changed(&self.source, mode);
        self.selection.reload(self.api.as_ref(), mode).await;
    }

    /// Pick a format from the active catalog. Unknown ids are ignored.
    pub fn select_format(&mut self, format_id: &str) -> bool {
        self.selection.select(format_id)
    }

    /// Whether the submit action should be enabled.
    pub fn can_submit(&self) -> bool {
        self.source_valid && !*self.in_flight_rx.borrow()
    }

    /// Submit the current source with the selected format.
    pub async fn submit(&mut self) {
        if !self.can_submit() {
            return;
        }
        let url = self.source.clone();
        let format = self.selection.selected().to_string();
        let mode = self.mode;
        self.controller.submit(&url, &format, mode).await;
    }

    pub async fn fetch_subtitles(&mut self) {
        let url = self.source.clone();
        self.controller.fetch_subtitles(&url).await;
    }

    pub async fn fetch_thumbnail(&mut self) {
        let url = self.source.clone();
        self.controller.fetch_thumbnail(&url).await;
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn source_valid(&self) -> bool {
        self.source_valid
    }

    pub fn lookup_state(&self) -> LookupState {
        self.coordinator.state()
    }

    pub fn snapshot(&self) -> Option<MetadataSnapshot> {
        self.coordinator.snapshot()
    }

    pub fn selection(&self) -> &FormatSelection {
        &self.selection
    }

    /// Approximate size of the currently selected format, when known.
    pub fn size_hint(&self) -> Option<String> {
        let snapshot = self.coordinator.snapshot();
        formats::size_hint(snapshot.as_ref(), self.mode, self.selection.selected())
    }

    pub fn progress(&self) -> ProgressState {
        self.simulator.current()
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<ProgressState> {
        self.simulator.subscribe()
    }

    pub fn outcome(&self) -> Option<&SubmissionOutcome> {
        self.controller.outcome()
    }

    pub fn reset_outcome(&mut self) {
        self.controller.reset_outcome();
    }

    pub fn subtitles(&self) -> &SideFetch {
        self.controller.subtitles()
    }

    pub fn thumbnail(&self) -> &SideFetch {
        self.controller.thumbnail()
    }

    /// Unexpired history, newest first.
    pub async fn history(&self) -> Vec<DownloadRecord> {
        self.history.lock().await.read_all()
    }

    pub async fn clear_history(&self) {
        self.history.lock().await.clear();
        let _ = self.events.try_send(EngineEvent::HistoryUpdated);
    }

    /// Stop the background tasks. Dropping the session does the same.
    pub fn close(&mut self) {
        self.coordinator.close();
        self.simulator.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, FormatCatalogDto};
    use crate::models::{DownloadReceipt, SubtitleLinks, ThumbnailLink};
    use chrono::{Duration as ChronoDuration, Utc};
    use std::sync::Mutex as StdMutex;

    const URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

    /// Happy-path service that records metadata calls.
    struct RecordingApi {
        metadata_calls: StdMutex<Vec<(String, Mode)>>,
        metadata_delay: Duration,
    }

    impl RecordingApi {
        fn new() -> Self {
            Self {
                metadata_calls: StdMutex::new(Vec::new()),
                metadata_delay: Duration::ZERO,
            }
        }
    }

    impl ExtractorApi for RecordingApi {
        async fn list_formats(&self, mode: Mode) -> Result<FormatCatalogDto, ApiError> {
            let builtin = crate::formats::FormatCatalog::builtin(mode);
            Ok(FormatCatalogDto {
                formats: builtin.formats.clone(),
                default_format: builtin.default_format.clone(),
            })
        }
        async fn fetch_metadata(
            &self,
            url: &str,
            mode: Mode,
        ) -> Result<MetadataSnapshot, ApiError> {
            self.metadata_calls
                .lock()
                .unwrap()
                .push((url.to_string(), mode));
            if !self.metadata_delay.is_zero() {
                tokio::time::sleep(self.metadata_delay).await;
            }
            Ok(MetadataSnapshot {
                title: "Never Gonna Give You Up".to_string(),
                ..MetadataSnapshot::default()
            })
        }
        async fn submit_download(
            &self,
            _url: &str,
            _format: &str,
            _mode: Mode,
        ) -> Result<DownloadReceipt, ApiError> {
            Ok(DownloadReceipt {
                download_url: "https://api.example.com/download/abc".to_string(),
                title: "Never Gonna Give You Up".to_string(),
                expires_at: Utc::now() + ChronoDuration::hours(24),
            })
        }
        async fn fetch_subtitles(&self, _url: &str) -> Result<SubtitleLinks, ApiError> {
            Ok(SubtitleLinks {
                download_url: "https://api.example.com/subtitles/abc".to_string(),
            })
        }
        async fn fetch_thumbnail(&self, _url: &str) -> Result<ThumbnailLink, ApiError> {
            Ok(ThumbnailLink {
                thumbnail_url: "https://img.example.com/abc.jpg".to_string(),
            })
        }
    }

    fn session() -> (EngineSession<RecordingApi>, mpsc::Receiver<EngineEvent>) {
        EngineSession::new(
            Arc::new(RecordingApi::new()),
            HistoryStore::open_in_memory(),
            EngineConfig::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn deep_link_id_becomes_watch_url_and_is_announced() {
        let (mut s, mut events) = session();

        s.input(InputChannel::DeepLink, "dQw4w9WgXcQ");

        assert_eq!(s.source(), URL);
        assert!(s.source_valid());
        assert_eq!(
            events.try_recv().ok(),
            Some(EngineEvent::SourceDetected {
                url: URL.to_string()
            })
        );

        tokio::time::sleep(DEBOUNCE + Duration::from_millis(50)).await;
        assert_eq!(s.lookup_state(), LookupState::Ready);
        assert_eq!(
            s.snapshot().map(|m| m.title),
            Some("Never Gonna Give You Up".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn clipboard_text_that_is_not_a_video_url_is_ignored() {
        let (mut s, mut events) = session();

        s.input(InputChannel::Clipboard, "just some prose");

        assert_eq!(s.source(), "");
        assert!(!s.source_valid());
        assert!(events.try_recv().is_err());
        assert_eq!(s.lookup_state(), LookupState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn mode_switch_resets_selection_before_any_fetch_resolves() {
        let (mut s, _events) = session();
        s.set_source(URL);

        assert_eq!(s.selection().selected(), "mp3");
        s.set_mode(Mode::Video).await;
        assert_eq!(s.mode(), Mode::Video);
        assert_eq!(s.selection().selected(), "best");
        assert!(s.outcome().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn submit_requires_a_recognized_source() {
        let (mut s, _events) = session();

        assert!(!s.can_submit());
        s.submit().await;
        assert!(s.outcome().is_none());

        s.set_source(URL);
        assert!(s.can_submit());
    }

    #[tokio::test(start_paused = true)]
    async fn full_submission_flow_records_history() {
        let (mut s, mut events) = session();
        s.set_source(URL);
        s.submit().await;

        match s.outcome() {
            Some(SubmissionOutcome::Success { title, .. }) => {
                assert_eq!(title, "Never Gonna Give You Up");
            }
            other => panic!("expected success, got {other:?}"),
        }

        let records = s.history().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].format, "mp3");
        assert_eq!(events.try_recv().ok(), Some(EngineEvent::HistoryUpdated));

        s.clear_history().await;
        assert!(s.history().await.is_empty());
        assert_eq!(events.try_recv().ok(), Some(EngineEvent::HistoryUpdated));
    }

    #[tokio::test(start_paused = true)]
    async fn typed_source_fetches_once_after_quiet_period() {
        let (mut s, _events) = session();

        s.input(InputChannel::Typed, "https://www.youtube.com/watch?v=a");
        s.input(InputChannel::Typed, "https://www.youtube.com/watch?v=ab");
        s.input(InputChannel::Typed, URL);

        tokio::time::sleep(DEBOUNCE + Duration::from_millis(50)).await;

        let calls = s.api.metadata_calls.lock().unwrap().clone();
        assert_eq!(calls, vec![(URL.to_string(), Mode::Audio)]);
    }
}
