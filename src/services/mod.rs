//! Service layer for the download engine.
//!
//! This module contains domain logic separated from UI concerns.
//! The CLI drives sessions through [`DownloadSession`] and renders
//! progress with [`ProgressReporter`].

pub mod download;
pub mod progress;
pub mod session;

pub use download::{
    DownloadConfig, DownloadEvent, DownloadOutcome, DownloadResult, DownloadService,
    DownloadTask, FetchWorker, SessionCounters, StopReason,
};
pub use progress::{ProgressReporter, DEFAULT_REPORT_INTERVAL};
pub use session::{DownloadSession, SessionReport, SessionRequest};
