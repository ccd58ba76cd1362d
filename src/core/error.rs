//! Error types for the image download pipeline with context and classification

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the download pipeline
#[derive(Error, Debug)]
pub enum DownloadError {
    /// HTTP-level transport failures with url context
    #[error("HTTP request to '{url}' failed")]
    HttpRequest {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-success HTTP status from the server
    #[error("server returned {status} for '{url}'")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    /// Network timeout on fetch
    #[error("request to '{url}' timed out after {duration_secs}s")]
    NetworkTimeout { url: String, duration_secs: u64 },

    /// File system I/O errors with file context
    #[error("file operation failed {operation} '{path}'")]
    FileSystem {
        path: PathBuf,
        operation: FileOperation,
        #[source]
        source: std::io::Error,
    },

    /// URL that cannot be parsed or does not look like an image URL
    #[error("invalid image URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Batch rejected before launch because one or more URLs are invalid
    #[error("batch rejected, {} invalid image URL(s): {}", urls.len(), urls.join(", "))]
    InvalidBatch { urls: Vec<String> },

    /// Output format string that is not in the supported table
    #[error("unsupported output format '{format}' (supported: jpeg, png, webp, gif, tiff)")]
    UnsupportedFormat { format: String },

    /// Decode/resize/re-encode failure for one item
    #[error("image transform failed for '{url}'")]
    Transform {
        url: String,
        #[source]
        source: image::ImageError,
    },

    /// Concurrency limit outside the allowed range
    #[error("concurrency limit {requested} outside allowed range [{min}, {max}]")]
    InvalidConcurrency {
        requested: usize,
        min: usize,
        max: usize,
    },

    /// Gate constructed with a capacity that cannot admit anyone
    #[error("concurrency gate capacity must be at least 1 (got {requested})")]
    InvalidCapacity { requested: usize },

    /// Item id registered twice with the batch aggregator
    #[error("progress tracker already active for item {id}")]
    DuplicateItem { id: usize },

    /// Configuration errors surfaced before any network activity
    #[error("invalid configuration: {message}")]
    Configuration { message: String },
}

/// Types of file operations for error context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOperation {
    Read,
    Write,
    Create,
    Delete,
    Move,
    Metadata,
    CreateDir,
}

impl std::fmt::Display for FileOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileOperation::Read => write!(f, "reading"),
            FileOperation::Write => write!(f, "writing"),
            FileOperation::Create => write!(f, "creating"),
            FileOperation::Delete => write!(f, "deleting"),
            FileOperation::Move => write!(f, "moving"),
            FileOperation::Metadata => write!(f, "reading metadata of"),
            FileOperation::CreateDir => write!(f, "creating directory"),
        }
    }
}

pub type Result<T> = std::result::Result<T, DownloadError>;

impl DownloadError {
    /// Whether this error stays local to a single item in a batch.
    ///
    /// Item-local errors are folded into a failed `DownloadResult` and never
    /// touch sibling downloads. Everything else is fatal at the batch-launch
    /// boundary and is surfaced before any network activity begins.
    pub fn is_item_local(&self) -> bool {
        match self {
            DownloadError::HttpRequest { .. } => true,
            DownloadError::HttpStatus { .. } => true,
            DownloadError::NetworkTimeout { .. } => true,
            DownloadError::FileSystem { .. } => true,
            DownloadError::Transform { .. } => true,
            DownloadError::UnsupportedFormat { .. } => true,
            DownloadError::InvalidUrl { .. } => false,
            DownloadError::InvalidBatch { .. } => false,
            DownloadError::InvalidConcurrency { .. } => false,
            DownloadError::InvalidCapacity { .. } => false,
            DownloadError::DuplicateItem { .. } => false,
            DownloadError::Configuration { .. } => false,
        }
    }

    /// Error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            DownloadError::HttpRequest { .. } => "http_request",
            DownloadError::HttpStatus { .. } => "http_status",
            DownloadError::NetworkTimeout { .. } => "network_timeout",
            DownloadError::FileSystem { .. } => "file_system",
            DownloadError::InvalidUrl { .. } => "invalid_url",
            DownloadError::InvalidBatch { .. } => "invalid_batch",
            DownloadError::UnsupportedFormat { .. } => "unsupported_format",
            DownloadError::Transform { .. } => "transform",
            DownloadError::InvalidConcurrency { .. } => "invalid_concurrency",
            DownloadError::InvalidCapacity { .. } => "invalid_capacity",
            DownloadError::DuplicateItem { .. } => "duplicate_item",
            DownloadError::Configuration { .. } => "configuration",
        }
    }
}
