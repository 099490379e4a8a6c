//! Periodic progress reporting for a running session.

use std::sync::Arc;
use std::time::{Duration, Instant};

use indicatif::ProgressBar;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::download::SessionCounters;
use crate::throughput::{ThroughputSample, ThroughputTracker};
use crate::utils::{format_duration, format_rate, format_size};

/// Default time between progress updates.
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(2);

/// Samples the session's shared state and renders it onto a progress bar.
///
/// Only reads; the download flow never waits on the reporter.
pub struct ProgressReporter {
    tracker: Arc<ThroughputTracker>,
    counters: Arc<SessionCounters>,
    target: usize,
    interval: Duration,
}

impl ProgressReporter {
    pub fn new(
        tracker: Arc<ThroughputTracker>,
        counters: Arc<SessionCounters>,
        target: usize,
    ) -> Self {
        Self {
            tracker,
            counters,
            target,
            interval: DEFAULT_REPORT_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Start reporting in the background.
    ///
    /// The task ends on the first tick at which the target is met or the
    /// session has signalled it finished.
    pub fn spawn(self, bar: ProgressBar) -> JoinHandle<()> {
        tokio::spawn(async move {
            let started = Instant::now();
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                let resolved = self.counters.resolved();
                bar.set_position(resolved as u64);
                bar.set_message(render_line(
                    &self.tracker.snapshot(),
                    resolved,
                    self.target,
                    started.elapsed(),
                ));
                if self.counters.is_done(self.target) {
                    break;
                }
            }
        })
    }
}

/// Items still to go divided by the average item rate so far.
pub fn estimate_eta(resolved: usize, target: usize, elapsed: Duration) -> Option<Duration> {
    let secs = elapsed.as_secs_f64();
    if resolved == 0 || secs <= 0.0 {
        return None;
    }
    let per_item = secs / resolved as f64;
    let remaining = target.saturating_sub(resolved) as f64;
    Some(Duration::from_secs_f64(per_item * remaining))
}

/// One progress line: downloaded bytes, current rate and ETA.
pub fn render_line(
    sample: &ThroughputSample,
    resolved: usize,
    target: usize,
    elapsed: Duration,
) -> String {
    let eta = match estimate_eta(resolved, target, elapsed) {
        Some(eta) => format_duration(eta),
        None => "--".to_string(),
    };
    format!(
        "{} | {} | ETA {}",
        format_size(sample.total_bytes),
        format_rate(sample.bytes_per_sec),
        eta
    )
}
