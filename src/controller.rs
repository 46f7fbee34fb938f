//! Submission Controller
//!
//! The top-level submit path: clear the previous outcome, raise the
//! in-flight flag (the sole signal the progress simulator observes), call
//! the extraction service, and classify the result. On success the download
//! is recorded in history and a refresh notification fires. The in-flight
//! flag is lowered on every path, before the result is even inspected.

use std::sync::Arc;

use tokio::sync::{mpsc, watch, Mutex};

use crate::api::ExtractorApi;
use crate::errors::{self, classify_submission_error};
use crate::events::EngineEvent;
use crate::history::HistoryStore;
use crate::models::{Mode, NewDownloadRecord, SubmissionOutcome};

/// State of an independent side request (subtitles, thumbnail).
///
/// Each side request loads and errors on its own and never touches the
/// primary submission outcome.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SideFetch {
    pub loading: bool,
    pub link: Option<String>,
    pub error: Option<&'static str>,
}

/// Lowers the in-flight flag when dropped, so cancellation of the submit
/// future (session teardown, an embedder racing it against a timeout) can
/// never leave the flag raised.
struct InFlightGuard<'a> {
    tx: &'a watch::Sender<bool>,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.tx.send_replace(false);
    }
}

pub struct SubmissionController<A> {
    api: Arc<A>,
    history: Arc<Mutex<HistoryStore>>,
    events: mpsc::Sender<EngineEvent>,
    in_flight_tx: watch::Sender<bool>,
    outcome: Option<SubmissionOutcome>,
    subtitles: SideFetch,
    thumbnail: SideFetch,
}

impl<A: ExtractorApi> SubmissionController<A> {
    pub fn new(
        api: Arc<A>,
        history: Arc<Mutex<HistoryStore>>,
        events: mpsc::Sender<EngineEvent>,
        in_flight_tx: watch::Sender<bool>,
    ) -> Self {
        Self {
            api,
            history,
            events,
            in_flight_tx,
            outcome: None,
            subtitles: SideFetch::default(),
            thumbnail: SideFetch::default(),
        }
    }

    /// Submit the download request for the current form values.
    ///
    /// The caller enforces the non-empty precondition by disabling the
    /// action, not by erroring here.
    pub async fn submit(&mut self, url: &str, format: &str, mode: Mode) {
        self.outcome = None;
        self.in_flight_tx.send_replace(true);
        let guard = InFlightGuard {
            tx: &self.in_flight_tx,
        };

        let result = self.api.submit_download(url, format, mode).await;

        // Lowered before inspecting the result so no code path can leave the
        // flag raised; the guard also fires if this future is dropped while
        // the call is still pending.
        drop(guard);

        match result {
            Ok(receipt) => {
                log::info!("download ready: {}", receipt.title);
                self.outcome = Some(SubmissionOutcome::Success {
                    download_url: receipt.download_url.clone(),
                    title: receipt.title.clone(),
                });

                {
                    let history = self.history.lock().await;
                    history.append(NewDownloadRecord {
                        title: receipt.title,
                        download_url: receipt.download_url,
                        format: format.to_string(),
                        mode,
                        expires_at: receipt.expires_at,
                    });
                }

                // Fire-and-forget: dependent views re-read the store.
                let _ = self.events.try_send(EngineEvent::HistoryUpdated);
            }
            Err(e) => {
                log::warn!("submission failed for {url}: {e}");
                self.outcome = Some(SubmissionOutcome::Error {
                    message: classify_submission_error(&e).to_string(),
                });
            }
        }
    }

    /// Request a subtitle download link for the current Source Reference.
    pub async fn fetch_subtitles(&mut self, url: &str) {
        self.subtitles = SideFetch {
            loading: true,
            ..SideFetch::default()
        };

        self.subtitles = match self.api.fetch_subtitles(url).await {
            Ok(links) => SideFetch {
                loading: false,
                link: Some(links.download_url),
                error: None,
            },
            Err(e) => {
                log::warn!("subtitle fetch failed for {url}: {e}");
                SideFetch {
                    loading: false,
                    link: None,
                    error: Some(errors::MSG_NO_SUBTITLES),
                }
            }
        };
    }

    /// Request the thumbnail link for the current Source Reference.
    pub async fn fetch_thumbnail(&mut self, url: &str) {
        self.thumbnail = SideFetch {
            loading: true,
            ..SideFetch::default()
        };

        self.thumbnail = match self.api.fetch_thumbnail(url).await {
            Ok(link) => SideFetch {
                loading: false,
                link: Some(link.thumbnail_url),
                error: None,
            },
            Err(e) => {
                log::warn!("thumbnail fetch failed for {url}: {e}");
                SideFetch {
                    loading: false,
                    link: None,
                    error: Some(errors::MSG_NO_THUMBNAIL),
                }
            }
        };
    }

    pub fn outcome(&self) -> Option<&SubmissionOutcome> {
        self.outcome.as_ref()
    }

    /// Drop any pending result/error, e.g. on Mode switch.
    pub fn reset_outcome(&mut self) {
        self.outcome = None;
    }

    pub fn subtitles(&self) -> &SideFetch {
        &self.subtitles
    }

    pub fn thumbnail(&self) -> &SideFetch {
        &self.thumbnail
    }

    pub fn is_in_flight(&self) -> bool {
        *self.in_flight_tx.borrow()
    }
}
