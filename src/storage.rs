//! File system helpers for the download pipeline
//!
//! All operations are async and carry path context on failure. Unique
//! filename generation is what guarantees no two concurrent downloads ever
//! contend for the same output file.

use crate::core::error::{DownloadError, FileOperation, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::debug;

fn fs_error(path: &Path, operation: FileOperation, source: std::io::Error) -> DownloadError {
    DownloadError::FileSystem {
        path: path.to_path_buf(),
        operation,
        source,
    }
}

/// Create a directory and all its parents; idempotent
pub async fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .await
        .map_err(|e| fs_error(dir, FileOperation::CreateDir, e))
}

/// Size of a file in bytes
pub async fn file_size(path: &Path) -> Result<u64> {
    let metadata = fs::metadata(path)
        .await
        .map_err(|e| fs_error(path, FileOperation::Metadata, e))?;
    Ok(metadata.len())
}

/// Delete a file
pub async fn remove_file(path: &Path) -> Result<()> {
    fs::remove_file(path)
        .await
        .map_err(|e| fs_error(path, FileOperation::Delete, e))
}

/// Resolve `name` inside `dir` to a path that does not exist yet
///
/// On collision, `_N` is appended before the extension: `photo.jpg`,
/// `photo_1.jpg`, `photo_2.jpg`, ...
pub async fn unique_path(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }

    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), Some(ext.to_string())),
        _ => (name.to_string(), None),
    };

    let mut counter = 1u32;
    loop {
        let next = match &ext {
            Some(ext) => format!("{stem}_{counter}.{ext}"),
            None => format!("{stem}_{counter}"),
        };
        let candidate = dir.join(&next);
        if !candidate.exists() {
            debug!(original = name, resolved = %candidate.display(), "resolved filename collision");
            return candidate;
        }
        counter += 1;
    }
}

/// Move a file, creating the destination directory as needed
///
/// Falls back to copy-and-delete when a plain rename fails (e.g. across
/// file systems).
pub async fn move_file(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        ensure_dir(parent).await?;
    }

    match fs::rename(from, to).await {
        Ok(()) => Ok(()),
        Err(_) => {
            fs::copy(from, to)
                .await
                .map_err(|e| fs_error(to, FileOperation::Move, e))?;
            fs::remove_file(from)
                .await
                .map_err(|e| fs_error(from, FileOperation::Delete, e))?;
            Ok(())
        }
    }
}

/// Recursively delete files older than `max_age`; returns the number removed
///
/// Directories themselves are left in place.
pub async fn cleanup_older_than(dir: &Path, max_age: Duration) -> Result<u64> {
    let mut removed = 0u64;
    let mut pending = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        let mut entries = fs::read_dir(&current)
            .await
            .map_err(|e| fs_error(&current, FileOperation::Read, e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| fs_error(&current, FileOperation::Read, e))?
        {
            let path = entry.path();
            let metadata = entry
                .metadata()
                .await
                .map_err(|e| fs_error(&path, FileOperation::Metadata, e))?;

            if metadata.is_dir() {
                pending.push(path);
                continue;
            }

            let age = metadata
                .modified()
                .ok()
                .and_then(|modified| modified.elapsed().ok())
                .unwrap_or(Duration::ZERO);

            if age > max_age {
                remove_file(&path).await?;
                removed += 1;
            }
        }
    }

    if removed > 0 {
        debug!(removed, dir = %dir.display(), "removed expired files");
    }
    Ok(removed)
}
