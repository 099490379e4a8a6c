//! Execution of a single download task.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::OwnedSemaphorePermit;
use tracing::{debug, warn};

use super::types::{DownloadOutcome, DownloadTask};
use crate::catalog::CatalogClient;
use crate::dedup::{DuplicateIndex, Fingerprint};
use crate::storage::StorageSink;
use crate::throughput::ThroughputTracker;

/// Fetches one payload, deduplicates it and stores it.
#[derive(Clone)]
pub struct FetchWorker {
    client: Arc<dyn CatalogClient>,
    storage: Arc<dyn StorageSink>,
    index: Arc<DuplicateIndex>,
    tracker: Arc<ThroughputTracker>,
    output_dir: PathBuf,
    skip_duplicates: bool,
}

impl FetchWorker {
    pub fn new(
        client: Arc<dyn CatalogClient>,
        storage: Arc<dyn StorageSink>,
        index: Arc<DuplicateIndex>,
        tracker: Arc<ThroughputTracker>,
        output_dir: PathBuf,
        skip_duplicates: bool,
    ) -> Self {
        Self {
            client,
            storage,
            index,
            tracker,
            output_dir,
            skip_duplicates,
        }
    }

    /// Run `task` while holding `permit`.
    ///
    /// Never fails: every error becomes [`DownloadOutcome::Failed`]. The
    /// permit is dropped on return, whichever path is taken.
    pub async fn execute(
        &self,
        task: &DownloadTask,
        permit: OwnedSemaphorePermit,
    ) -> DownloadOutcome {
        let outcome = self.fetch_and_store(task).await;
        drop(permit);
        outcome
    }

    async fn fetch_and_store(&self, task: &DownloadTask) -> DownloadOutcome {
        debug!("Downloading {} from {}", task.label(), task.url);

        let content = match self.client.fetch_payload(&task.url).await {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to download {}: {}", task.label(), e);
                return DownloadOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        };

        let fingerprint = Fingerprint::of(&content);
        if self.skip_duplicates {
            if let Some(matched) = self.index.lookup(&fingerprint) {
                debug!("Skipping duplicate {} (matches {})", task.label(), matched);
                return DownloadOutcome::Duplicate { matched };
            }
        }

        let name = task.output_name();
        let path = self.output_dir.join(&name);
        if let Err(e) = self.storage.write(&path, &content).await {
            warn!("Failed to write {}: {}", path.display(), e);
            return DownloadOutcome::Failed {
                reason: format!("write {}: {}", name, e),
            };
        }

        self.index.register_fingerprint(fingerprint, &name);
        let bytes = content.len() as u64;
        self.tracker.add(bytes);

        debug!("Saved {} ({} bytes)", name, bytes);
        DownloadOutcome::Completed { name, bytes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogPage, PageQuery};
    use crate::error::CatalogError;
    use crate::storage::FsStorage;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use tempfile::tempdir;
    use tokio::sync::Semaphore;

    struct PayloadMap(HashMap<String, Result<Vec<u8>, CatalogError>>);

    #[async_trait]
    impl CatalogClient for PayloadMap {
        async fn fetch_page(&self, _query: &PageQuery) -> Result<CatalogPage, CatalogError> {
            Ok(CatalogPage::default())
        }

        async fn fetch_payload(&self, url: &str) -> Result<Vec<u8>, CatalogError> {
            self.0
                .get(url)
                .cloned()
                .unwrap_or(Err(CatalogError::Status(404)))
        }
    }

    fn worker(
        payloads: Vec<(&str, Result<Vec<u8>, CatalogError>)>,
        output_dir: PathBuf,
        skip_duplicates: bool,
    ) -> (FetchWorker, Arc<DuplicateIndex>, Arc<ThroughputTracker>) {
        let client = PayloadMap(
            payloads
                .into_iter()
                .map(|(url, body)| (url.to_string(), body))
                .collect(),
        );
        let index = Arc::new(DuplicateIndex::new());
        let tracker = Arc::new(ThroughputTracker::new());
        let worker = FetchWorker::new(
            Arc::new(client),
            Arc::new(FsStorage),
            index.clone(),
            tracker.clone(),
            output_dir,
            skip_duplicates,
        );
        (worker, index, tracker)
    }

    fn task(id: u64, url: &str) -> DownloadTask {
        DownloadTask {
            post_id: Some(id),
            url: url.to_string(),
        }
    }

    #[tokio::test]
    async fn test_completed_writes_and_registers() {
        let dir = tempdir().unwrap();
        let url = "https://cdn.example.net/aa/bb/aabb.png";
        let (worker, index, tracker) =
            worker(vec![(url, Ok(b"png bytes".to_vec()))], dir.path().to_path_buf(), true);
        let semaphore = Arc::new(Semaphore::new(1));

        let permit = semaphore.clone().acquire_owned().await.unwrap();
        let outcome = worker.execute(&task(11, url), permit).await;

        assert_eq!(
            outcome,
            DownloadOutcome::Completed {
                name: "11.png".to_string(),
                bytes: 9
            }
        );
        assert_eq!(std::fs::read(dir.path().join("11.png")).unwrap(), b"png bytes");
        assert_eq!(index.check(b"png bytes"), Some("11.png".to_string()));
        assert_eq!(tracker.total_bytes(), 9);
        // Permit released
        assert_eq!(semaphore.available_permits(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_skips_write() {
        let dir = tempdir().unwrap();
        let url = "https://cdn.example.net/dup.jpg";
        let (worker, index, tracker) =
            worker(vec![(url, Ok(b"seen before".to_vec()))], dir.path().to_path_buf(), true);
        index.register(b"seen before", "3.jpg");
        let semaphore = Arc::new(Semaphore::new(1));

        let permit = semaphore.clone().acquire_owned().await.unwrap();
        let outcome = worker.execute(&task(12, url), permit).await;

        assert_eq!(
            outcome,
            DownloadOutcome::Duplicate {
                matched: "3.jpg".to_string()
            }
        );
        assert!(!dir.path().join("12.jpg").exists());
        assert_eq!(tracker.total_bytes(), 0);
        assert_eq!(semaphore.available_permits(), 1);
    }

    #[tokio::test]
    async fn test_keep_duplicates_writes_anyway() {
        let dir = tempdir().unwrap();
        let url = "https://cdn.example.net/dup.jpg";
        let (worker, index, _tracker) =
            worker(vec![(url, Ok(b"seen before".to_vec()))], dir.path().to_path_buf(), false);
        index.register(b"seen before", "3.jpg");
        let semaphore = Arc::new(Semaphore::new(1));

        let permit = semaphore.clone().acquire_owned().await.unwrap();
        let outcome = worker.execute(&task(12, url), permit).await;

        assert!(matches!(outcome, DownloadOutcome::Completed { .. }));
        assert!(dir.path().join("12.jpg").exists());
        // Existing registration is kept
        assert_eq!(index.check(b"seen before"), Some("3.jpg".to_string()));
    }

    #[tokio::test]
    async fn test_http_failure_is_captured() {
        let dir = tempdir().unwrap();
        let url = "https://cdn.example.net/gone.gif";
        let (worker, index, tracker) = worker(
            vec![(url, Err(CatalogError::Status(404)))],
            dir.path().to_path_buf(),
            true,
        );
        let semaphore = Arc::new(Semaphore::new(1));

        let permit = semaphore.clone().acquire_owned().await.unwrap();
        let outcome = worker.execute(&task(13, url), permit).await;

        assert_eq!(
            outcome,
            DownloadOutcome::Failed {
                reason: "HTTP 404".to_string()
            }
        );
        assert!(index.is_empty());
        assert_eq!(tracker.total_bytes(), 0);
        assert_eq!(semaphore.available_permits(), 1);
    }

    #[tokio::test]
    async fn test_write_failure_is_captured() {
        let dir = tempdir().unwrap();
        // A regular file where the output directory should be
        let blocker = dir.path().join("blocked");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let url = "https://cdn.example.net/x.png";
        let (worker, index, tracker) = worker(vec![(url, Ok(b"data".to_vec()))], blocker, true);
        let semaphore = Arc::new(Semaphore::new(1));

        let permit = semaphore.clone().acquire_owned().await.unwrap();
        let outcome = worker.execute(&task(14, url), permit).await;

        assert!(matches!(outcome, DownloadOutcome::Failed { .. }));
        assert!(index.is_empty());
        assert_eq!(tracker.total_bytes(), 0);
    }
}
