//! Error types shared across the download engine.

use std::path::PathBuf;

use thiserror::Error;

/// Failures that prevent a download session from starting.
///
/// These are surfaced before any network activity. Everything that goes
/// wrong after the first page request is folded into the session tally.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Target count must be positive")]
    InvalidTargetCount,
    #[error("Concurrency limit must be positive")]
    InvalidConcurrency,
    #[error("Failed to create output directory '{path}': {source}")]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to scan output directory '{path}': {source}")]
    Seed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to create HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Errors from catalog page requests and payload fetches.
#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    #[error("HTTP {0}")]
    Status(u16),
    #[error("Request failed: {0}")]
    Transport(String),
    #[error("Malformed catalog response: {0}")]
    Malformed(String),
}

impl CatalogError {
    /// HTTP status carried by this error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            CatalogError::Status(code) => Some(*code),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => CatalogError::Status(status.as_u16()),
            None => CatalogError::Transport(err.to_string()),
        }
    }
}
