//! imagefetch - concurrent image download pipeline
//!
//! Fetches images over HTTP(S), optionally resizes/recompresses/reformats
//! them, and writes them to local storage, singly or in concurrency-bounded
//! batches, reporting per-item and aggregate progress.
//!
//! The call chain flows as follows:
//!
//! User Code
//! ↓
//! ImageDownloader (this file)
//! ↓
//! batch::download_batch (batch.rs)
//! ↓
//! single::run_item (single.rs)
//! ↓
//! HttpClient + transform + storage (http.rs, transform.rs, storage.rs)
//! ↓
//! Core types (core/*)

pub mod batch;
pub mod config;
pub mod core;
pub mod gate;
pub mod http;
pub mod storage;
pub mod transform;
pub mod validate;

mod single;

#[cfg(test)]
mod tests;

// Re-export main types for convenience
pub use batch::BatchOutcome;
pub use config::{
    DEFAULT_CONCURRENT, DownloaderConfig, MAX_CONCURRENT, MIN_CONCURRENT, ProxyConfig,
    validate_concurrency,
};
pub use core::{
    ActiveDownload, BatchCallback, BatchProgress, BatchSnapshot, BatchSummary,
    CompositeProgressReporter, CompletedItem, DownloadError, DownloadOptions, DownloadRequest,
    DownloadResult, FileOperation, IntoProgressCallback, NullProgressReporter, ProgressCallback,
    ProgressReporter, ProgressSample, ProgressTracker, Result, TrackerSummary,
};
pub use gate::{ConcurrencyGate, GatePermit};
pub use http::HttpClient;
pub use transform::{OutputFormat, TransformOptions, fit_within};

/// Main entry point: a configured downloader for single and batch fetches
///
/// Configuration errors (concurrency out of range, bad proxy) surface at
/// construction, before any network activity.
pub struct ImageDownloader {
    client: HttpClient,
    config: DownloaderConfig,
}

impl ImageDownloader {
    /// Create a downloader, validating the configuration up front
    pub fn new(config: DownloaderConfig) -> Result<Self> {
        config.validate()?;
        let client = HttpClient::from_config(&config)?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &DownloaderConfig {
        &self.config
    }

    /// Download a single image
    ///
    /// The URL is validated before any network activity; past that point the
    /// outcome is always a `DownloadResult`, success or failure.
    pub async fn download(
        &self,
        request: DownloadRequest,
        progress: Option<ProgressCallback>,
    ) -> Result<DownloadResult> {
        validate::parse_image_url(&request.url)?;

        let filename_hint = request
            .options
            .filename
            .clone()
            .unwrap_or_else(|| request.url_stem());
        let mut tracker = ProgressTracker::new(&request.url, filename_hint);

        let result = single::run_item(&self.client, &request, |downloaded, total, speed| {
            let sample = tracker.update(downloaded, total, speed);
            if let Some(callback) = &progress {
                callback(sample);
            }
        })
        .await;

        Ok(result)
    }

    /// Download a single image, notifying a [`ProgressReporter`]
    ///
    /// The reporter receives every enriched sample via `on_sample`, and
    /// `on_error` when the download ends in failure.
    pub async fn download_with_reporter<R>(
        &self,
        request: DownloadRequest,
        reporter: R,
    ) -> Result<DownloadResult>
    where
        R: ProgressReporter,
    {
        validate::parse_image_url(&request.url)?;

        let filename_hint = request
            .options
            .filename
            .clone()
            .unwrap_or_else(|| request.url_stem());
        let mut tracker = ProgressTracker::new(&request.url, filename_hint);

        let result = single::run_item(&self.client, &request, |downloaded, total, speed| {
            reporter.on_sample(&tracker.update(downloaded, total, speed));
        })
        .await;

        if let Some(error) = &result.error {
            reporter.on_error(&result.url, error);
        }

        Ok(result)
    }

    /// Download a batch of requests with the configured concurrency
    pub async fn download_batch(
        &self,
        requests: Vec<DownloadRequest>,
        batch_callback: Option<BatchCallback>,
    ) -> Result<BatchOutcome> {
        batch::download_batch(&self.client, requests, self.config.concurrency, batch_callback)
            .await
    }

    /// Download a list of URLs sharing one option set
    pub async fn download_urls<S: Into<String>>(
        &self,
        urls: Vec<S>,
        options: DownloadOptions,
        batch_callback: Option<BatchCallback>,
    ) -> Result<BatchOutcome> {
        let requests = urls
            .into_iter()
            .map(|url| DownloadRequest::from_options(url, options.clone()))
            .collect();
        self.download_batch(requests, batch_callback).await
    }
}
