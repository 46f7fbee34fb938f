//! Metadata Lookup Coordinator
//!
//! Debounces Source Reference changes, races the metadata fetch against
//! further edits, and discards stale responses. Each change mints a
//! monotonically increasing token; a scheduled lookup applies its result
//! only while its token is still the latest, so a slow response for a
//! superseded reference can never become the displayed snapshot.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::api::ExtractorApi;
use crate::input;
use crate::models::{MetadataSnapshot, Mode};

/// Nominal debounce applied after the Source Reference stabilizes.
pub const DEBOUNCE: Duration = Duration::from_millis(700);

/// Lookup lifecycle, primarily for UI affordances (spinners etc.).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupState {
    Idle,
    Debouncing,
    Fetching,
    Ready,
    Failed,
}

/// Published lookup state plus the current snapshot, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupView {
    pub state: LookupState,
    pub snapshot: Option<MetadataSnapshot>,
}

impl LookupView {
    fn idle() -> Self {
        Self {
            state: LookupState::Idle,
            snapshot: None,
        }
    }
}

/// Coordinates debounced metadata lookups for the current Source Reference.
pub struct MetadataCoordinator<A> {
    api: Arc<A>,
    debounce: Duration,
    token: Arc<AtomicU64>,
    view_tx: Arc<watch::Sender<LookupView>>,
    view_rx: watch::Receiver<LookupView>,
    task: Option<JoinHandle<()>>,
}

impl<A: ExtractorApi + 'static> MetadataCoordinator<A> {
    pub fn new(api: Arc<A>, debounce: Duration) -> Self {
        let (tx, rx) = watch::channel(LookupView::idle());
        Self {
            api,
            debounce,
            token: Arc::new(AtomicU64::new(0)),
            view_tx: Arc::new(tx),
            view_rx: rx,
            task: None,
        }
    }

    /// The Source Reference changed. Cancels any pending debounce timer; an
    /// empty or unrecognized value clears the snapshot immediately, a valid
    /// one restarts the debounce window.
    pub fn source_changed(&mut self, reference: &str, mode: Mode) {
        let token = self.mint_token();

        if reference.trim().is_empty() || !input::is_supported_url(reference) {
            self.view_tx.send_replace(LookupView::idle());
            return;
        }

        self.view_tx.send_replace(LookupView {
            state: LookupState::Debouncing,
            snapshot: None,
        });
        self.task = Some(self.schedule(reference.to_string(), mode, token, self.debounce));
    }

    /// Mode switched. Clears the snapshot and, when the reference is valid,
    /// starts a fresh fetch cycle bypassing the debounce.
    pub fn mode_changed(&mut self, reference: &str, mode: Mode) {
        let token = self.mint_token();
        self.view_tx.send_replace(LookupView::idle());

        if !reference.trim().is_empty() && input::is_supported_url(reference) {
            self.task = Some(self.schedule(reference.to_string(), mode, token, Duration::ZERO));
        }
    }

    pub fn state(&self) -> LookupState {
        self.view_rx.borrow().state
    }

    pub fn snapshot(&self) -> Option<MetadataSnapshot> {
        self.view_rx.borrow().snapshot.clone()
    }

    /// Observe lookup changes (snapshot ready, failure) without polling.
    pub fn subscribe(&self) -> watch::Receiver<LookupView> {
        self.view_rx.clone()
    }

    /// Cancel any outstanding debounce timer or in-flight fetch.
    pub fn close(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Invalidate all earlier timers and in-flight lookups.
    fn mint_token(&mut self) -> u64 {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.token.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn schedule(
        &self,
        reference: String,
        mode: Mode,
        token: u64,
        delay: Duration,
    ) -> JoinHandle<()> {
        let api = self.api.clone();
        let latest = self.token.clone();
        let view = self.view_tx.clone();

        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if latest.load(Ordering::SeqCst) != token {
                return;
            }

            view.send_replace(LookupView {
                state: LookupState::Fetching,
                snapshot: None,
            });

            let result = api.fetch_metadata(&reference, mode).await;

            // The reference may have changed while the fetch was in flight;
            // a stale response is discarded without applying or erroring.
            if latest.load(Ordering::SeqCst) != token {
                log::debug!("discarding stale metadata response for {reference}");
                return;
            }

            match result {
                Ok(snapshot) => {
                    view.send_replace(LookupView {
                        state: LookupState::Ready,
                        snapshot: Some(snapshot),
                    });
                }
                Err(e) => {
                    // Metadata is supplementary, not blocking; no error is
                    // surfaced and submission stays possible.
                    log::warn!("metadata lookup failed for {reference}: {e}");
                    view.send_replace(LookupView {
                        state: LookupState::Failed,
                        snapshot: None,
                    });
                }
            }
        })
    }
}

impl<A> Drop for MetadataCoordinator<A> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
