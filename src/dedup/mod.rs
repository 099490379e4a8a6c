//! Content-addressed duplicate detection.

mod fingerprint;
mod index;

pub use fingerprint::Fingerprint;
pub use index::DuplicateIndex;
