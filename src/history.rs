//! Session history persisted as a JSON array.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Failed to write history file '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to serialize history: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// What a finished session reports to a [`SummarySink`].
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub tags: String,
    pub completed_count: usize,
    pub total_bytes: u64,
    pub duration: Duration,
    pub output_name: String,
    pub duplicate_count: usize,
}

/// Receives the summary of each finished session.
pub trait SummarySink {
    fn record(&mut self, summary: &SessionSummary) -> Result<(), HistoryError>;
}

/// One recorded session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub query_tags: String,
    pub file_count: usize,
    pub total_size_bytes: u64,
    pub duration_seconds: f64,
    pub folder_name: String,
    /// Megabytes per minute, despite the name.
    pub avg_speed_mbps: f64,
    #[serde(default)]
    pub skipped_duplicates: usize,
}

impl HistoryEntry {
    pub fn from_summary(summary: &SessionSummary, timestamp: DateTime<Utc>) -> Self {
        let duration_seconds = summary.duration.as_secs_f64();
        let avg_speed_mbps = if duration_seconds > 0.0 {
            (summary.total_bytes as f64 / (1024.0 * 1024.0)) / (duration_seconds / 60.0)
        } else {
            0.0
        };
        Self {
            timestamp,
            query_tags: summary.tags.clone(),
            file_count: summary.completed_count,
            total_size_bytes: summary.total_bytes,
            duration_seconds,
            folder_name: summary.output_name.clone(),
            avg_speed_mbps,
            skipped_duplicates: summary.duplicate_count,
        }
    }
}

/// History stored in a pretty-printed JSON file.
#[derive(Debug)]
pub struct JsonHistory {
    path: PathBuf,
    entries: Vec<HistoryEntry>,
}

impl JsonHistory {
    /// Load history from `path`. A missing or unreadable file is an empty
    /// history; a file that does not parse is first moved to
    /// `<name>.corrupt` so the next save cannot overwrite it.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                let backup = corrupt_backup_path(&path);
                match std::fs::rename(&path, &backup) {
                    Ok(()) => warn!(
                        "Unreadable history {} ({}), moved to {}",
                        path.display(),
                        e,
                        backup.display()
                    ),
                    Err(rename_err) => warn!(
                        "Unreadable history {} ({}), could not move it aside: {}",
                        path.display(),
                        e,
                        rename_err
                    ),
                }
                Vec::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                warn!("Failed to read history {}: {}", path.display(), e);
                Vec::new()
            }
        };
        Self { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entries in recording order.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Append an entry and rewrite the file.
    pub fn add_entry(&mut self, entry: HistoryEntry) -> Result<(), HistoryError> {
        self.entries.push(entry);
        self.save()
    }

    pub fn save(&self) -> Result<(), HistoryError> {
        let json = serde_json::to_string_pretty(&self.entries)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| HistoryError::Write {
                path: self.path.clone(),
                source,
            })?;
        }
        std::fs::write(&self.path, json).map_err(|source| HistoryError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

fn corrupt_backup_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "history.json".into());
    name.push(".corrupt");
    path.with_file_name(name)
}

impl SummarySink for JsonHistory {
    fn record(&mut self, summary: &SessionSummary) -> Result<(), HistoryError> {
        self.add_entry(HistoryEntry::from_summary(summary, Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn summary() -> SessionSummary {
        SessionSummary {
            tags: "fox solo".to_string(),
            completed_count: 12,
            total_bytes: 30 * 1024 * 1024,
            duration: Duration::from_secs(90),
            output_name: "fox_solo".to_string(),
            duplicate_count: 2,
        }
    }

    #[test]
    fn test_entry_from_summary() {
        let entry = HistoryEntry::from_summary(&summary(), Utc::now());
        assert_eq!(entry.query_tags, "fox solo");
        assert_eq!(entry.file_count, 12);
        assert_eq!(entry.folder_name, "fox_solo");
        assert_eq!(entry.skipped_duplicates, 2);
        assert!((entry.avg_speed_mbps - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_duration_speed() {
        let mut s = summary();
        s.duration = Duration::ZERO;
        assert_eq!(HistoryEntry::from_summary(&s, Utc::now()).avg_speed_mbps, 0.0);
    }

    #[test]
    fn test_record_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("download_history.json");

        let mut history = JsonHistory::load(&path);
        assert!(history.entries().is_empty());
        history.record(&summary()).unwrap();
        history.record(&summary()).unwrap();

        let reloaded = JsonHistory::load(&path);
        assert_eq!(reloaded.entries().len(), 2);
        assert_eq!(reloaded.entries()[0].total_size_bytes, 30 * 1024 * 1024);

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"query_tags\": \"fox solo\""));
    }

    #[test]
    fn test_corrupt_file_is_kept_aside() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("download_history.json");
        std::fs::write(&path, "not json").unwrap();

        let mut history = JsonHistory::load(&path);
        assert!(history.entries().is_empty());
        history.record(&summary()).unwrap();

        let backup = dir.path().join("download_history.json.corrupt");
        assert_eq!(std::fs::read_to_string(&backup).unwrap(), "not json");
        assert_eq!(JsonHistory::load(&path).entries().len(), 1);
    }

    #[test]
    fn test_reads_entries_without_duplicates_field() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("download_history.json");
        std::fs::write(
            &path,
            r#"[{"timestamp": "2024-03-01T12:00:00Z", "query_tags": "wolf",
                "file_count": 3, "total_size_bytes": 100, "duration_seconds": 2.5,
                "folder_name": "wolf", "avg_speed_mbps": 0.1}]"#,
        )
        .unwrap();
        let history = JsonHistory::load(&path);
        assert_eq!(history.entries()[0].skipped_duplicates, 0);
    }
}
