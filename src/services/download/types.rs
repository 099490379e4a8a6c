//! Download service types and events.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use crate::catalog::{Post, DEFAULT_PAGE_CAP};
use crate::storage::output_file_name;

/// One payload to fetch. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    pub post_id: Option<u64>,
    pub url: String,
}

impl DownloadTask {
    /// Task for a post, or None if the post has no downloadable URL.
    pub fn from_post(post: &Post) -> Option<Self> {
        post.resolve_url().map(|url| Self {
            post_id: post.id,
            url: url.to_string(),
        })
    }

    /// File name the payload is stored under.
    pub fn output_name(&self) -> String {
        output_file_name(self.post_id, &self.url)
    }

    /// Short label for logs.
    pub fn label(&self) -> String {
        match self.post_id {
            Some(id) => format!("post {}", id),
            None => self.url.clone(),
        }
    }
}

/// Result of executing one [`DownloadTask`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Payload written under `name`.
    Completed { name: String, bytes: u64 },
    /// Payload matched a file that already holds the same bytes.
    Duplicate { matched: String },
    /// Fetch or write failed; nothing was recorded.
    Failed { reason: String },
}

/// Events emitted during a download session.
#[derive(Debug, Clone)]
pub enum DownloadEvent {
    /// A page came back and its tasks are being dispatched.
    PageFetched {
        page: u32,
        posts: usize,
        dispatched: usize,
    },
    Completed {
        post_id: Option<u64>,
        name: String,
        bytes: u64,
    },
    Duplicate {
        post_id: Option<u64>,
        matched: String,
    },
    Failed {
        post_id: Option<u64>,
        url: String,
        error: String,
    },
}

/// Why the pagination loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Completed plus duplicate items reached the target.
    TargetReached,
    /// The catalog returned an empty or short page.
    Exhausted,
    /// A page request failed; earlier downloads are kept.
    PaginationError(String),
    /// The abort signal fired.
    Aborted,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::TargetReached => f.write_str("target reached"),
            StopReason::Exhausted => f.write_str("no more matching posts"),
            StopReason::PaginationError(e) => write!(f, "page request failed: {}", e),
            StopReason::Aborted => f.write_str("interrupted"),
        }
    }
}

/// Result of a download run.
#[derive(Debug, Clone)]
pub struct DownloadResult {
    pub completed: usize,
    pub duplicates: usize,
    pub failed: usize,
    /// Posts without a downloadable URL.
    pub unresolvable: usize,
    pub pages_requested: u32,
    pub stop_reason: StopReason,
}

/// Configuration for download service.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    pub output_dir: PathBuf,
    /// Largest `limit` sent with a page request.
    pub page_cap: usize,
    /// Pause between page requests.
    pub page_delay: Duration,
    /// Skip payloads whose bytes are already on disk.
    pub skip_duplicates: bool,
}

impl DownloadConfig {
    pub fn new(output_dir: PathBuf) -> Self {
        Self {
            output_dir,
            page_cap: DEFAULT_PAGE_CAP,
            page_delay: Duration::from_secs(1),
            skip_duplicates: true,
        }
    }
}

/// Live tallies shared with progress reporting.
#[derive(Debug, Default)]
pub struct SessionCounters {
    completed: AtomicUsize,
    duplicates: AtomicUsize,
    failed: AtomicUsize,
    finished: AtomicBool,
}

impl SessionCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, outcome: &DownloadOutcome) {
        let counter = match outcome {
            DownloadOutcome::Completed { .. } => &self.completed,
            DownloadOutcome::Duplicate { .. } => &self.duplicates,
            DownloadOutcome::Failed { .. } => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }

    /// Items that consumed a slot of the target.
    pub fn resolved(&self) -> usize {
        self.completed() + self.duplicates()
    }

    /// Mark the session as over, whatever the tally.
    pub fn finish(&self) {
        self.finished.store(true, Ordering::Release);
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// Done once the target is met or the session has ended.
    pub fn is_done(&self, target: usize) -> bool {
        self.is_finished() || self.resolved() >= target
    }
}
