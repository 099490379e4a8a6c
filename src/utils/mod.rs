//! Shared utility functions.
//!
//! - `format`: Human-readable formatting (sizes, rates, durations)
//! - `paths`: Output folder naming

mod format;
mod paths;

pub use format::{format_duration, format_rate, format_size};
pub use paths::sanitize_folder_name;
