//! Storage helpers for downloaded payloads on disk.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

/// Destination for downloaded payloads.
#[async_trait]
pub trait StorageSink: Send + Sync {
    /// Write `content` to `path`, creating or truncating it.
    async fn write(&self, path: &Path, content: &[u8]) -> io::Result<()>;

    /// Names of the regular files directly inside `dir`.
    async fn list(&self, dir: &Path) -> io::Result<Vec<String>>;
}

/// Local filesystem storage.
#[derive(Debug, Clone, Default)]
pub struct FsStorage;

#[async_trait]
impl StorageSink for FsStorage {
    async fn write(&self, path: &Path, content: &[u8]) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, content).await
    }

    async fn list(&self, dir: &Path) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

/// Output file name for a post: `{post_id}.{extension}`.
///
/// The extension comes from the last path segment of `url`, ignoring any
/// query string. Posts without an identifier fall back to that segment's
/// stem, and URLs without an extension get `bin`.
pub fn output_file_name(post_id: Option<u64>, url: &str) -> String {
    let segment = url::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|segments| segments.last().map(|s| s.to_string()))
        })
        .unwrap_or_else(|| {
            url.split(['?', '#'])
                .next()
                .unwrap_or_default()
                .rsplit('/')
                .next()
                .unwrap_or_default()
                .to_string()
        });

    let (stem, extension) = match segment.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => (stem, ext),
        _ => (segment.as_str(), "bin"),
    };

    match post_id {
        Some(id) => format!("{}.{}", id, extension),
        None if !stem.is_empty() => format!("{}.{}", stem, extension),
        None => format!("unnamed.{}", extension),
    }
}

/// Directory downloads for one session land in.
pub fn session_output_dir(output_root: &Path, folder_name: &str) -> PathBuf {
    output_root.join(folder_name)
}
