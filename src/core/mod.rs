//! Core types used throughout the download pipeline
//!
//! This module holds the fundamental types every other module depends on:
//! the request/result pair, errors, per-item progress tracking and the
//! batch-level aggregator.

pub mod aggregate;
pub mod error;
pub mod progress;

pub use aggregate::{
    ActiveDownload, BatchCallback, BatchProgress, BatchSnapshot, BatchSummary, CompletedItem,
};
pub use error::{DownloadError, FileOperation, Result};
pub use progress::{
    CompositeProgressReporter, IntoProgressCallback, NullProgressReporter, ProgressCallback,
    ProgressReporter, ProgressSample, ProgressTracker, TrackerSummary,
};

use crate::transform::OutputFormat;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

/// Per-item download options, shareable across a whole batch
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Directory the file is written into
    pub dest_dir: PathBuf,
    /// Explicit filename override; derived from the URL when absent
    pub filename: Option<String>,
    /// Target output format; keep the original when absent
    pub format: Option<OutputFormat>,
    /// Re-encode with lossy/size-reducing settings
    pub compress: bool,
    /// Fit-inside bounds; either may be absent, never upscales
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
    /// Encoding quality for formats that support it
    pub quality: Option<u8>,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            dest_dir: PathBuf::from("downloads"),
            filename: None,
            format: None,
            compress: false,
            max_width: None,
            max_height: None,
            quality: None,
        }
    }
}

impl DownloadOptions {
    /// Whether any option requires the decode/re-encode stage
    pub fn wants_transform(&self) -> bool {
        self.format.is_some() || self.compress || self.max_width.is_some() || self.max_height.is_some()
    }
}

/// A single download request, immutable once dispatched
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub url: String,
    pub options: DownloadOptions,
}

impl DownloadRequest {
    /// Create a request saving into `dest_dir` with default options
    pub fn new<S: Into<String>, P: Into<PathBuf>>(url: S, dest_dir: P) -> Self {
        Self {
            url: url.into(),
            options: DownloadOptions {
                dest_dir: dest_dir.into(),
                ..DownloadOptions::default()
            },
        }
    }

    /// Create a request from a shared option set
    pub fn from_options<S: Into<String>>(url: S, options: DownloadOptions) -> Self {
        Self {
            url: url.into(),
            options,
        }
    }

    /// Override the filename (otherwise derived from the URL)
    pub fn with_filename<S: Into<String>>(mut self, filename: S) -> Self {
        self.options.filename = Some(filename.into());
        self
    }

    /// Re-encode to the given output format
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.options.format = Some(format);
        self
    }

    /// Enable compression on re-encode
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.options.compress = compress;
        self
    }

    /// Encoding quality for formats that support it
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.options.quality = Some(quality);
        self
    }

    /// Fit-inside resize bounds; either may be `None`
    pub fn with_max_dimensions(mut self, max_width: Option<u32>, max_height: Option<u32>) -> Self {
        self.options.max_width = max_width;
        self.options.max_height = max_height;
        self
    }

    /// Last path segment of the URL, used as the filename stem
    pub(crate) fn url_stem(&self) -> String {
        let segment = url::Url::parse(&self.url)
            .ok()
            .and_then(|parsed| {
                parsed
                    .path_segments()
                    .and_then(|mut segments| segments.next_back().map(str::to_string))
            })
            .filter(|segment| !segment.is_empty())
            .unwrap_or_else(|| "image".to_string());

        match segment.rsplit_once('.') {
            Some((stem, _ext)) if !stem.is_empty() => stem.to_string(),
            _ => segment,
        }
    }

    /// Extension of the URL's path segment, if it has one
    pub(crate) fn url_extension(&self) -> Option<String> {
        url::Url::parse(&self.url).ok().and_then(|parsed| {
            let path = parsed.path().to_ascii_lowercase();
            path.rsplit_once('.')
                .map(|(_, ext)| ext.to_string())
                .filter(|ext| !ext.is_empty() && !ext.contains('/'))
        })
    }
}

/// Outcome of one download, produced exactly once per request
#[derive(Debug, Clone, Serialize)]
pub struct DownloadResult {
    pub url: String,
    pub success: bool,
    /// Path the file was written to, absent on failure
    pub path: Option<PathBuf>,
    /// Final on-disk size in bytes
    pub size: u64,
    pub content_type: String,
    pub completed_at: DateTime<Utc>,
    /// Human-readable error message, absent on success
    pub error: Option<String>,
}

impl DownloadResult {
    pub(crate) fn succeeded(url: &str, path: PathBuf, size: u64, content_type: String) -> Self {
        Self {
            url: url.to_string(),
            success: true,
            path: Some(path),
            size,
            content_type,
            completed_at: Utc::now(),
            error: None,
        }
    }

    pub(crate) fn failed(url: &str, error: &DownloadError) -> Self {
        Self {
            url: url.to_string(),
            success: false,
            path: None,
            size: 0,
            content_type: String::new(),
            completed_at: Utc::now(),
            error: Some(error.to_string()),
        }
    }
}
