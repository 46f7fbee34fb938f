//! Progress Simulator
//!
//! The remote job reports no intermediate progress, so the indicator is
//! purely time-driven: an ordered list of named stages with nominal
//! durations, advanced on a fixed tick while the submission is in flight.
//! The percentage is capped below 100 so the bar never visually completes
//! before the real result arrives; actual completion is signaled externally
//! by the in-flight flag dropping.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Tick interval for the simulator.
pub const TICK: Duration = Duration::from_millis(80);

/// Hard ceiling on the simulated percentage.
pub const PERCENT_CAP: f64 = 92.0;

/// One named stage with its nominal duration.
#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    pub label: String,
    pub duration: Duration,
}

/// Ordered stage list. The specific stage count and durations are
/// presentation tuning values; only monotonicity and the cap are contractual.
#[derive(Debug, Clone, PartialEq)]
pub struct StagePlan {
    stages: Vec<Stage>,
}

impl StagePlan {
    /// Build a plan from `(label, nominal seconds)` pairs. An empty list
    /// falls back to the default plan so the simulator always has a stage
    /// to report.
    pub fn new(stages: Vec<(&str, u64)>) -> Self {
        if stages.is_empty() {
            return Self::default();
        }
        let stages = stages
            .into_iter()
            .map(|(label, secs)| Stage {
                label: label.to_string(),
                duration: Duration::from_secs(secs),
            })
            .collect();
        Self { stages }
    }

    pub fn total(&self) -> Duration {
        self.stages.iter().map(|s| s.duration).sum()
    }

    /// Simulated percentage at an elapsed time: linear over the nominal
    /// total, capped at [`PERCENT_CAP`].
    pub fn percent_at(&self, elapsed: Duration) -> f64 {
        let total = self.total().as_secs_f64();
        if total <= 0.0 {
            return 0.0;
        }
        (elapsed.as_secs_f64() / total * 100.0).min(PERCENT_CAP)
    }

    /// The first stage whose cumulative duration exceeds the elapsed time,
    /// or the last stage once past the nominal total.
    pub fn stage_at(&self, elapsed: Duration) -> &Stage {
        let mut cumulative = Duration::ZERO;
        for stage in &self.stages {
            cumulative += stage.duration;
            if elapsed < cumulative {
                return stage;
            }
        }
        // Past the nominal total: the simulator keeps running on the last
        // stage, since real completion is driven externally.
        &self.stages[self.stages.len() - 1]
    }

    pub fn state_at(&self, elapsed: Duration) -> ProgressState {
        ProgressState {
            percent: self.percent_at(elapsed),
            stage: self.stage_at(elapsed).label.clone(),
        }
    }

    pub fn initial(&self) -> ProgressState {
        ProgressState {
            percent: 0.0,
            stage: self.stages[0].label.clone(),
        }
    }
}

impl Default for StagePlan {
    fn default() -> Self {
        Self::new(vec![
            ("Contacting server", 2),
            ("Fetching video info", 3),
            ("Extracting streams", 6),
            ("Converting", 8),
            ("Preparing download link", 5),
        ])
    }
}

/// Current simulated progress.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressState {
    /// 0..=PERCENT_CAP while active; exactly 0 when idle.
    pub percent: f64,
    pub stage: String,
}

/// Background ticker publishing [`ProgressState`], gated solely by the
/// in-flight signal from the submission controller.
pub struct ProgressSimulator {
    state_rx: watch::Receiver<ProgressState>,
    task: JoinHandle<()>,
}

impl ProgressSimulator {
    pub fn spawn(plan: StagePlan, tick: Duration, in_flight: watch::Receiver<bool>) -> Self {
        let (tx, rx) = watch::channel(plan.initial());

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(tick);
            let mut started: Option<Instant> = None;

            loop {
                ticker.tick().await;
                if *in_flight.borrow() {
                    let t0 = *started.get_or_insert_with(Instant::now);
                    tx.send_replace(plan.state_at(t0.elapsed()));
                } else if started.take().is_some() {
                    tx.send_replace(plan.initial());
                }
            }
        });

        Self { state_rx: rx, task }
    }

    pub fn current(&self) -> ProgressState {
        self.state_rx.borrow().clone()
    }

    /// Observe ticks without polling.
    pub fn subscribe(&self) -> watch::Receiver<ProgressState> {
        self.state_rx.clone()
    }

    pub fn close(&self) {
        self.task.abort();
    }
}

impl Drop for ProgressSimulator {
    fn drop(&mut self) {
        self.task.abort();
    }
}
