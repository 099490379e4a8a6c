//! Zip packaging of a finished session folder.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Errors that can occur while building an archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Source directory does not exist: {0}")]
    MissingSource(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to walk source directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Pack every regular file under `source_dir` into a zip at `dest`.
///
/// Entries are stored uncompressed (media payloads are already compressed)
/// under their path relative to `source_dir`. Returns the number of files
/// written.
pub fn zip_directory(source_dir: &Path, dest: &Path) -> Result<usize, ArchiveError> {
    if !source_dir.is_dir() {
        return Err(ArchiveError::MissingSource(source_dir.to_path_buf()));
    }

    let mut writer = ZipWriter::new(File::create(dest)?);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let dest_canonical = dest.canonicalize().ok();

    let mut count = 0;
    for entry in WalkDir::new(source_dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if dest_canonical.is_some() && path.canonicalize().ok() == dest_canonical {
            continue;
        }

        let Ok(relative) = path.strip_prefix(source_dir) else {
            continue;
        };
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        writer.start_file(name, options)?;
        io::copy(&mut File::open(path)?, &mut writer)?;
        count += 1;
    }

    writer.finish()?;
    Ok(count)
}
