//! Tag download service.
//!
//! Drives pagination against the catalog and fans each page out to a pool of
//! [`FetchWorker`]s. Separated from UI concerns - emits events for progress
//! tracking.

mod types;
mod worker;

use std::sync::Arc;

use tokio::sync::{mpsc, watch, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::catalog::{CatalogClient, PageQuery};
use crate::dedup::DuplicateIndex;
use crate::storage::StorageSink;
use crate::throughput::ThroughputTracker;

pub use types::{
    DownloadConfig, DownloadEvent, DownloadOutcome, DownloadResult, DownloadTask,
    SessionCounters, StopReason,
};
pub use worker::FetchWorker;

/// Service that turns catalog pages into downloads.
pub struct DownloadService {
    client: Arc<dyn CatalogClient>,
    worker: FetchWorker,
    config: DownloadConfig,
}

impl DownloadService {
    /// Create a new download service.
    pub fn new(
        client: Arc<dyn CatalogClient>,
        storage: Arc<dyn StorageSink>,
        index: Arc<DuplicateIndex>,
        tracker: Arc<ThroughputTracker>,
        config: DownloadConfig,
    ) -> Self {
        let worker = FetchWorker::new(
            client.clone(),
            storage,
            index,
            tracker,
            config.output_dir.clone(),
            config.skip_duplicates,
        );
        Self {
            client,
            worker,
            config,
        }
    }

    /// Download up to `target` posts matching `tags`, at most `concurrency`
    /// at a time.
    ///
    /// Pages are requested one after another; every task dispatched from a
    /// page is joined before the next page is requested. Completed and
    /// duplicate outcomes consume a slot of the target, failures do not.
    /// Raising `abort` stops dispatching new work while in-flight tasks run
    /// to completion.
    pub async fn download(
        &self,
        tags: &str,
        target: usize,
        concurrency: usize,
        counters: Arc<SessionCounters>,
        mut abort: watch::Receiver<bool>,
        event_tx: mpsc::Sender<DownloadEvent>,
    ) -> DownloadResult {
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        let page_cap = self.config.page_cap.max(1);

        let mut page: u32 = 1;
        let mut pages_requested: u32 = 0;
        let mut unresolvable = 0usize;

        let stop_reason = 'pages: loop {
            let resolved = counters.resolved();
            if resolved >= target {
                break StopReason::TargetReached;
            }
            if *abort.borrow() {
                break StopReason::Aborted;
            }

            let batch_size = page_cap.min(target - resolved);
            let query = PageQuery {
                tags: tags.to_string(),
                limit: batch_size,
                page,
            };

            debug!("Requesting page {} (limit {})", page, batch_size);
            pages_requested += 1;
            let result = tokio::select! {
                biased;
                _ = wait_for_abort(&mut abort) => break 'pages StopReason::Aborted,
                result = self.client.fetch_page(&query) => result,
            };

            let catalog_page = match result {
                Ok(p) => p,
                Err(e) => {
                    warn!("Stopping at page {}: {}", page, e);
                    break StopReason::PaginationError(e.to_string());
                }
            };

            let returned = catalog_page.len();
            if returned == 0 {
                info!("Page {} is empty, no more matching posts", page);
                break StopReason::Exhausted;
            }

            let tasks: Vec<DownloadTask> = catalog_page
                .posts
                .iter()
                .take(batch_size)
                .filter_map(DownloadTask::from_post)
                .collect();
            let skipped = returned.min(batch_size) - tasks.len();
            if skipped > 0 {
                debug!("Page {}: {} posts without a downloadable URL", page, skipped);
                unresolvable += skipped;
            }

            let _ = event_tx
                .send(DownloadEvent::PageFetched {
                    page,
                    posts: returned,
                    dispatched: tasks.len(),
                })
                .await;

            let mut handles = Vec::with_capacity(tasks.len());
            let mut interrupted = false;
            for task in tasks {
                let permit = tokio::select! {
                    biased;
                    _ = wait_for_abort(&mut abort) => {
                        interrupted = true;
                        break;
                    }
                    permit = semaphore.clone().acquire_owned() => match permit {
                        Ok(p) => p,
                        Err(_) => break,
                    },
                };
                handles.push(self.spawn_task(task, permit, &counters, &event_tx));
            }

            // Page-level join barrier
            for handle in handles {
                if let Err(e) = handle.await {
                    warn!("Download task panicked: {}", e);
                }
            }

            info!(
                "Page {}: {} posts, {}/{} resolved",
                page,
                returned,
                counters.resolved(),
                target
            );

            if interrupted {
                break StopReason::Aborted;
            }
            if returned < batch_size {
                info!("Page {} returned {} of {} posts, stopping", page, returned, batch_size);
                break StopReason::Exhausted;
            }
            if counters.resolved() >= target {
                break StopReason::TargetReached;
            }

            page += 1;
            if !self.config.page_delay.is_zero() {
                tokio::select! {
                    biased;
                    _ = wait_for_abort(&mut abort) => break 'pages StopReason::Aborted,
                    _ = tokio::time::sleep(self.config.page_delay) => {}
                }
            }
        };

        counters.finish();
        info!(
            "Download finished after {} page(s): {} completed, {} duplicates, {} failed ({})",
            pages_requested,
            counters.completed(),
            counters.duplicates(),
            counters.failed(),
            stop_reason
        );

        DownloadResult {
            completed: counters.completed(),
            duplicates: counters.duplicates(),
            failed: counters.failed(),
            unresolvable,
            pages_requested,
            stop_reason,
        }
    }

    fn spawn_task(
        &self,
        task: DownloadTask,
        permit: OwnedSemaphorePermit,
        counters: &Arc<SessionCounters>,
        event_tx: &mpsc::Sender<DownloadEvent>,
    ) -> JoinHandle<()> {
        let worker = self.worker.clone();
        let counters = counters.clone();
        let event_tx = event_tx.clone();

        tokio::spawn(async move {
            let outcome = worker.execute(&task, permit).await;
            counters.record(&outcome);

            let event = match outcome {
                DownloadOutcome::Completed { name, bytes } => DownloadEvent::Completed {
                    post_id: task.post_id,
                    name,
                    bytes,
                },
                DownloadOutcome::Duplicate { matched } => DownloadEvent::Duplicate {
                    post_id: task.post_id,
                    matched,
                },
                DownloadOutcome::Failed { reason } => DownloadEvent::Failed {
                    post_id: task.post_id,
                    url: task.url,
                    error: reason,
                },
            };
            let _ = event_tx.send(event).await;
        })
    }
}

/// Resolve once the abort flag is raised. Never resolves if the sender is
/// gone without having raised it.
async fn wait_for_abort(abort: &mut watch::Receiver<bool>) {
    loop {
        if *abort.borrow_and_update() {
            return;
        }
        if abort.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
