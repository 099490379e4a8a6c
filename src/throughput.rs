//! Byte counter with a rate estimate sampled at most once per window.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Minimum time between rate recomputations.
pub const RATE_WINDOW: Duration = Duration::from_secs(1);

/// Point-in-time view of a [`ThroughputTracker`].
#[derive(Debug, Clone, Copy)]
pub struct ThroughputSample {
    /// Cumulative bytes recorded.
    pub total_bytes: u64,
    /// Bytes per second as of the last recomputation.
    pub bytes_per_sec: f64,
    /// When the snapshot was taken.
    pub taken_at: Instant,
}

#[derive(Debug, Default)]
struct TrackerState {
    total_bytes: u64,
    bytes_per_sec: f64,
    last_sample_at: Option<Instant>,
    last_sample_bytes: u64,
}

/// Thread-safe accumulator of transferred bytes.
///
/// The cumulative total and the rate recomputation share one lock so a
/// snapshot never sees a rate computed from a different total.
#[derive(Debug, Default)]
pub struct ThroughputTracker {
    state: Mutex<TrackerState>,
}

impl ThroughputTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `bytes` transferred now.
    pub fn add(&self, bytes: u64) {
        self.add_at(bytes, Instant::now());
    }

    /// Record `bytes` transferred at `now`.
    pub fn add_at(&self, bytes: u64, now: Instant) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.total_bytes += bytes;

        let last = match state.last_sample_at {
            Some(last) => last,
            None => {
                // First call opens the window; the rate stays zero until it closes
                state.last_sample_at = Some(now);
                return;
            }
        };

        let elapsed = now.saturating_duration_since(last);
        if elapsed >= RATE_WINDOW {
            let delta = state.total_bytes - state.last_sample_bytes;
            state.bytes_per_sec = delta as f64 / elapsed.as_secs_f64();
            state.last_sample_at = Some(now);
            state.last_sample_bytes = state.total_bytes;
        }
    }

    pub fn snapshot(&self) -> ThroughputSample {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        ThroughputSample {
            total_bytes: state.total_bytes,
            bytes_per_sec: state.bytes_per_sec,
            taken_at: Instant::now(),
        }
    }

    pub fn total_bytes(&self) -> u64 {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).total_bytes
    }
}
