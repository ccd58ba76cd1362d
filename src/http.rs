//! HTTP client for probing and streaming image downloads
//!
//! Wraps a configured `reqwest::Client` with the two operations the pipeline
//! needs: a HEAD probe for content type and expected size, and a streaming
//! GET that reports raw byte counters to the caller on every chunk.

use crate::config::DownloaderConfig;
use crate::core::error::{DownloadError, Result};
use futures::StreamExt;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::debug;

/// Upper bound on the body buffer pre-allocation. Content-Length is
/// server-controlled, so larger claims grow the buffer chunk by chunk
/// instead of being trusted up front.
pub(crate) const BODY_PREALLOC_CAP: u64 = 8 * 1024 * 1024;

/// Buffer capacity to reserve for a body of `total` expected bytes
pub(crate) fn prealloc_capacity(total: u64) -> usize {
    total.min(BODY_PREALLOC_CAP) as usize
}

/// Metadata learned from the HEAD probe
#[derive(Debug, Clone)]
pub struct ProbeInfo {
    pub content_type: String,
    /// Expected body size, `None` when the server did not report one
    pub total: Option<u64>,
}

impl Default for ProbeInfo {
    fn default() -> Self {
        Self {
            content_type: "image/jpeg".to_string(),
            total: None,
        }
    }
}

/// A fully fetched response body
#[derive(Debug)]
pub struct FetchedBody {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// HTTP client configured with timeout, user agent and optional proxy
pub struct HttpClient {
    client: Client,
    timeout: Duration,
}

impl HttpClient {
    pub fn from_config(config: &DownloaderConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent);

        if let Some(proxy) = &config.proxy {
            builder = builder.proxy(proxy.build()?);
        }

        let client = builder.build().map_err(|e| DownloadError::Configuration {
            message: format!("failed to build HTTP client: {e}"),
        })?;

        Ok(Self {
            client,
            timeout: config.timeout,
        })
    }

    fn request_error(&self, url: &str, error: reqwest::Error) -> DownloadError {
        if error.is_timeout() {
            DownloadError::NetworkTimeout {
                url: url.to_string(),
                duration_secs: self.timeout.as_secs(),
            }
        } else {
            DownloadError::HttpRequest {
                url: url.to_string(),
                source: error,
            }
        }
    }

    /// HEAD probe for content type and expected size
    pub async fn probe(&self, url: &str) -> Result<ProbeInfo> {
        debug!(url, "probing");
        let response = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|e| self.request_error(url, e))?;

        if !response.status().is_success() {
            return Err(DownloadError::HttpStatus {
                url: url.to_string(),
                status: response.status(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .unwrap_or_else(|| ProbeInfo::default().content_type);

        Ok(ProbeInfo {
            content_type,
            total: response.content_length(),
        })
    }

    /// Streaming GET, invoking `on_progress(downloaded, total, speed_bps)`
    /// on every chunk; `total` is 0 when unknown
    pub async fn fetch<F>(
        &self,
        url: &str,
        expected_total: Option<u64>,
        mut on_progress: F,
    ) -> Result<FetchedBody>
    where
        F: FnMut(u64, u64, f64),
    {
        debug!(url, "fetching");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.request_error(url, e))?;

        if !response.status().is_success() {
            return Err(DownloadError::HttpStatus {
                url: url.to_string(),
                status: response.status(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string());

        let total = expected_total.or(response.content_length()).unwrap_or(0);
        let mut bytes = Vec::with_capacity(prealloc_capacity(total));
        let mut downloaded = 0u64;
        let started = Instant::now();

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| self.request_error(url, e))?;
            downloaded += chunk.len() as u64;
            bytes.extend_from_slice(&chunk);

            let elapsed = started.elapsed().as_secs_f64();
            let speed = if elapsed > 0.0 {
                downloaded as f64 / elapsed
            } else {
                0.0
            };
            on_progress(downloaded, total, speed);
        }

        debug!(url, downloaded, "fetch complete");
        Ok(FetchedBody {
            bytes,
            content_type,
        })
    }
}
