//! One download invocation, from validation to the final tally.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, watch};
use tracing::info;

use super::download::{DownloadConfig, DownloadEvent, DownloadService, SessionCounters, StopReason};
use crate::catalog::{CatalogClient, DEFAULT_PAGE_CAP};
use crate::dedup::DuplicateIndex;
use crate::error::SessionError;
use crate::history::SessionSummary;
use crate::storage::StorageSink;
use crate::throughput::ThroughputTracker;

/// Parameters of a download session.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub tags: String,
    pub target_count: usize,
    pub concurrency: usize,
    pub output_dir: PathBuf,
    pub skip_duplicates: bool,
    pub page_cap: usize,
    pub page_delay: Duration,
}

impl SessionRequest {
    pub fn new(tags: impl Into<String>, target_count: usize, output_dir: PathBuf) -> Self {
        Self {
            tags: tags.into(),
            target_count,
            concurrency: 5,
            output_dir,
            skip_duplicates: true,
            page_cap: DEFAULT_PAGE_CAP,
            page_delay: Duration::from_secs(1),
        }
    }

    fn validate(&self) -> Result<(), SessionError> {
        if self.target_count == 0 {
            return Err(SessionError::InvalidTargetCount);
        }
        if self.concurrency == 0 {
            return Err(SessionError::InvalidConcurrency);
        }
        Ok(())
    }
}

/// Final tally of a session.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub tags: String,
    pub completed: usize,
    pub duplicates: usize,
    pub failed: usize,
    pub unresolvable: usize,
    pub pages_requested: u32,
    pub total_bytes: u64,
    pub duration: Duration,
    pub stop_reason: StopReason,
    pub output_dir: PathBuf,
    /// Files already in the output directory before the run.
    pub seeded: usize,
}

impl SessionReport {
    /// Megabytes written per minute of session time.
    pub fn megabytes_per_minute(&self) -> f64 {
        let minutes = self.duration.as_secs_f64() / 60.0;
        if minutes <= 0.0 {
            return 0.0;
        }
        (self.total_bytes as f64 / (1024.0 * 1024.0)) / minutes
    }

    /// Summary handed to a [`SummarySink`](crate::history::SummarySink).
    pub fn summary(&self) -> SessionSummary {
        let output_name = self
            .output_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        SessionSummary {
            tags: self.tags.clone(),
            completed_count: self.completed,
            total_bytes: self.total_bytes,
            duration: self.duration,
            output_name,
            duplicate_count: self.duplicates,
        }
    }
}

/// One download invocation.
///
/// Counters and tracker are created with the session and exposed so a
/// progress reporter can watch them while [`run`](Self::run) is in progress.
/// `run` consumes the session, so every invocation starts from a zero tally.
pub struct DownloadSession {
    client: Arc<dyn CatalogClient>,
    storage: Arc<dyn StorageSink>,
    counters: Arc<SessionCounters>,
    tracker: Arc<ThroughputTracker>,
}

impl DownloadSession {
    pub fn new(client: Arc<dyn CatalogClient>, storage: Arc<dyn StorageSink>) -> Self {
        Self {
            client,
            storage,
            counters: Arc::new(SessionCounters::new()),
            tracker: Arc::new(ThroughputTracker::new()),
        }
    }

    pub fn counters(&self) -> Arc<SessionCounters> {
        self.counters.clone()
    }

    pub fn tracker(&self) -> Arc<ThroughputTracker> {
        self.tracker.clone()
    }

    /// Validate `request`, prepare the output directory and run the download.
    ///
    /// Errors are only returned before the first catalog request; after that
    /// the session always produces a report.
    pub async fn run(
        self,
        request: &SessionRequest,
        abort: watch::Receiver<bool>,
        event_tx: mpsc::Sender<DownloadEvent>,
    ) -> Result<SessionReport, SessionError> {
        request.validate()?;

        tokio::fs::create_dir_all(&request.output_dir)
            .await
            .map_err(|source| SessionError::OutputDirectory {
                path: request.output_dir.clone(),
                source,
            })?;

        let index = Arc::new(DuplicateIndex::new());
        let seeded = self.seed_index(&index, &request.output_dir).await?;
        if seeded > 0 {
            info!(
                "Indexed {} existing file(s) in {}",
                seeded,
                request.output_dir.display()
            );
        }

        let mut config = DownloadConfig::new(request.output_dir.clone());
        config.page_cap = request.page_cap;
        config.page_delay = request.page_delay;
        config.skip_duplicates = request.skip_duplicates;

        let service = DownloadService::new(
            self.client.clone(),
            self.storage.clone(),
            index,
            self.tracker.clone(),
            config,
        );

        let started = Instant::now();
        let result = service
            .download(
                &request.tags,
                request.target_count,
                request.concurrency,
                self.counters.clone(),
                abort,
                event_tx,
            )
            .await;

        Ok(SessionReport {
            tags: request.tags.clone(),
            completed: result.completed,
            duplicates: result.duplicates,
            failed: result.failed,
            unresolvable: result.unresolvable,
            pages_requested: result.pages_requested,
            total_bytes: self.tracker.total_bytes(),
            duration: started.elapsed(),
            stop_reason: result.stop_reason,
            output_dir: request.output_dir.clone(),
            seeded,
        })
    }

    /// Fingerprint the files the storage already holds in `dir`.
    async fn seed_index(
        &self,
        index: &Arc<DuplicateIndex>,
        dir: &Path,
    ) -> Result<usize, SessionError> {
        let seed_error = |source: io::Error| SessionError::Seed {
            path: dir.to_path_buf(),
            source,
        };

        let names = match self.storage.list(dir).await {
            Ok(names) => names,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(seed_error(e)),
        };
        if names.is_empty() {
            return Ok(0);
        }

        let index = index.clone();
        let dir_owned = dir.to_path_buf();
        tokio::task::spawn_blocking(move || index.seed(&dir_owned, &names))
            .await
            .map_err(|e| seed_error(io::Error::other(e)))
    }
}
