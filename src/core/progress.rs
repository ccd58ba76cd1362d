//! Progress tracking for individual downloads
//!
//! A `ProgressTracker` turns the raw byte counters reported by the transport
//! layer into enriched samples carrying elapsed time, average speed and an
//! ETA, and keeps an append-only history so a summary can be extracted when
//! the download completes.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Callback invoked with every enriched progress sample for one download
pub type ProgressCallback = Arc<dyn Fn(ProgressSample) + Send + Sync>;

/// One enriched progress sample for a single download
#[derive(Debug, Clone, Serialize)]
pub struct ProgressSample {
    pub url: String,
    pub filename: String,
    /// Bytes downloaded so far
    pub downloaded: u64,
    /// Total expected bytes, 0 when the server did not report a size
    pub total: u64,
    /// Completion percentage, `None` when the total is unknown
    pub percent: Option<f64>,
    /// Instantaneous rate reported by the transport layer, bytes/sec
    pub speed_bps: f64,
    /// Average rate since the tracker started, bytes/sec
    pub avg_speed_bps: f64,
    /// Seconds since the tracker started
    pub elapsed_secs: f64,
    /// Estimated seconds remaining, `None` when percentage is unknown or zero
    pub eta_secs: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

/// Summary of one finished (or in-flight) download's progress history
#[derive(Debug, Clone, Default, Serialize)]
pub struct TrackerSummary {
    pub elapsed_secs: f64,
    /// Average speed taken from the most recent sample
    pub avg_speed_bps: f64,
    /// Peak instantaneous speed across the history
    pub peak_speed_bps: f64,
    pub samples: usize,
    pub final_percent: Option<f64>,
}

/// Linear-extrapolation ETA: `remaining = (elapsed / percent) * 100 - elapsed`.
///
/// Returns `None` when the percentage is unknown or non-positive.
pub fn estimate_remaining(elapsed_secs: f64, percent: Option<f64>) -> Option<f64> {
    match percent {
        Some(pct) if pct > 0.0 => Some(((elapsed_secs / pct) * 100.0 - elapsed_secs).max(0.0)),
        _ => None,
    }
}

/// Average speed in bytes/sec, 0 when no time has elapsed
pub fn average_speed(downloaded: u64, elapsed_secs: f64) -> f64 {
    if elapsed_secs > 0.0 {
        downloaded as f64 / elapsed_secs
    } else {
        0.0
    }
}

/// Completion percentage, `None` when the denominator is non-positive
pub fn completion_percent(downloaded: u64, total: u64) -> Option<f64> {
    if total > 0 {
        Some(((downloaded as f64 / total as f64) * 100.0).min(100.0))
    } else {
        None
    }
}

/// Per-download progress tracker
///
/// Owns the append-only history for exactly one download. `start()` resets
/// everything to the current time; `update()` enriches a raw transport sample
/// and appends it; `summary()` condenses the history.
#[derive(Debug)]
pub struct ProgressTracker {
    url: String,
    filename: String,
    started_at: Instant,
    history: Vec<ProgressSample>,
}

impl ProgressTracker {
    pub fn new<S: Into<String>, F: Into<String>>(url: S, filename: F) -> Self {
        Self {
            url: url.into(),
            filename: filename.into(),
            started_at: Instant::now(),
            history: Vec::new(),
        }
    }

    /// Reset history and the start timestamp to the current time
    pub fn start(&mut self) {
        self.started_at = Instant::now();
        self.history.clear();
    }

    /// Enrich a raw transport sample, append it to the history and return it
    pub fn update(&mut self, downloaded: u64, total: u64, speed_bps: f64) -> ProgressSample {
        let now = Instant::now();
        let elapsed_secs = now.duration_since(self.started_at).as_secs_f64();
        let percent = completion_percent(downloaded, total);

        let sample = ProgressSample {
            url: self.url.clone(),
            filename: self.filename.clone(),
            downloaded,
            total,
            percent,
            speed_bps,
            avg_speed_bps: average_speed(downloaded, elapsed_secs),
            elapsed_secs,
            eta_secs: estimate_remaining(elapsed_secs, percent),
            timestamp: Utc::now(),
        };

        self.history.push(sample.clone());
        sample
    }

    /// Most recent sample, if any progress has been reported
    pub fn latest(&self) -> Option<&ProgressSample> {
        self.history.last()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Condense the history into a summary; zeroed when the history is empty
    pub fn summary(&self) -> TrackerSummary {
        let Some(last) = self.history.last() else {
            return TrackerSummary::default();
        };

        let peak_speed_bps = self
            .history
            .iter()
            .map(|s| s.speed_bps)
            .fold(0.0_f64, f64::max);

        TrackerSummary {
            elapsed_secs: self.started_at.elapsed().as_secs_f64(),
            avg_speed_bps: last.avg_speed_bps,
            peak_speed_bps,
            samples: self.history.len(),
            final_percent: last.percent,
        }
    }
}

/// Observer interface for per-download progress events
///
/// Observers are invoked synchronously on the task driving the download and
/// must not block.
pub trait ProgressReporter: Send + Sync {
    fn on_sample(&self, _sample: &ProgressSample) {}
    fn on_error(&self, _url: &str, _error: &str) {}
}

/// Extension trait to adapt a `ProgressReporter` into a `ProgressCallback`
pub trait IntoProgressCallback {
    fn into_callback(self) -> ProgressCallback;
}

impl<T: ProgressReporter + 'static> IntoProgressCallback for T {
    fn into_callback(self) -> ProgressCallback {
        Arc::new(move |sample| self.on_sample(&sample))
    }
}

/// Progress reporter that does nothing
#[derive(Debug, Default)]
pub struct NullProgressReporter;

impl ProgressReporter for NullProgressReporter {}

/// Composite reporter that forwards events to zero or more reporters
#[derive(Default)]
pub struct CompositeProgressReporter {
    reporters: Vec<Box<dyn ProgressReporter>>,
}

impl std::fmt::Debug for CompositeProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeProgressReporter")
            .field("reporters_count", &self.reporters.len())
            .finish()
    }
}

impl CompositeProgressReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_reporter<R: ProgressReporter + 'static>(mut self, reporter: R) -> Self {
        self.reporters.push(Box::new(reporter));
        self
    }
}

impl ProgressReporter for CompositeProgressReporter {
    fn on_sample(&self, sample: &ProgressSample) {
        for reporter in &self.reporters {
            reporter.on_sample(sample);
        }
    }

    fn on_error(&self, url: &str, error: &str) {
        for reporter in &self.reporters {
            reporter.on_error(url, error);
        }
    }
}
