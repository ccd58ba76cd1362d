//! Batch download orchestration
//!
//! Fans a list of requests out across the concurrency gate and back in.
//! All items are launched up front; the gate alone bounds how many are in
//! flight. Results are stored by original index, so output order is input
//! order regardless of completion order. After launch the batch never fails
//! as a whole: each item lands as a success or failure `DownloadResult`.

use crate::config::validate_concurrency;
use crate::core::error::{DownloadError, Result};
use crate::core::{BatchCallback, BatchProgress, BatchSummary, DownloadRequest, DownloadResult};
use crate::gate::ConcurrencyGate;
use crate::http::HttpClient;
use crate::{single, validate};
use futures::stream::{self, StreamExt};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Result of a whole batch run
#[derive(Debug)]
pub struct BatchOutcome {
    /// One result per request, in input order
    pub results: Vec<DownloadResult>,
    /// Aggregate progress summary for the batch
    pub summary: BatchSummary,
    /// Total wall time for the batch
    pub duration: Duration,
}

impl BatchOutcome {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }
}

/// Batch state is shared across workers but mutated only through the
/// aggregator's serialized operations; a poisoned lock just hands the
/// state back.
fn lock_state(state: &Mutex<BatchProgress>) -> MutexGuard<'_, BatchProgress> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Download every request, bounded by `concurrency` simultaneous items
///
/// Fails before any network activity when the concurrency limit is out of
/// range or any URL is not a valid image URL (atomic rejection). After that
/// point every item runs to completion independently.
pub async fn download_batch(
    client: &HttpClient,
    requests: Vec<DownloadRequest>,
    concurrency: usize,
    batch_callback: Option<BatchCallback>,
) -> Result<BatchOutcome> {
    validate_concurrency(concurrency)?;
    let urls: Vec<String> = requests.iter().map(|r| r.url.clone()).collect();
    validate::validate_batch(&urls)?;

    info!(items = requests.len(), concurrency, "starting batch download");
    let started = Instant::now();
    let total = requests.len();
    let gate = ConcurrencyGate::new(concurrency)?;
    let state = Arc::new(Mutex::new(BatchProgress::new(total)));

    let collected: Vec<(usize, DownloadResult)> =
        stream::iter(requests.into_iter().enumerate())
            .map(|(index, request)| {
                let gate = gate.clone();
                let state = Arc::clone(&state);
                let callback = batch_callback.clone();
                async move {
                    let _permit = gate.acquire().await;

                    let filename_hint = request
                        .options
                        .filename
                        .clone()
                        .unwrap_or_else(|| request.url_stem());
                    if let Err(error) =
                        lock_state(&state).create_item_tracker(index, &request.url, &filename_hint)
                    {
                        warn!(index, %error, "failed to register item tracker");
                    }

                    let result = single::run_item(client, &request, |downloaded, total_bytes, speed| {
                        let snapshot = {
                            let mut progress = lock_state(&state);
                            progress.update_item(index, downloaded, total_bytes, speed);
                            callback.as_ref().map(|_| progress.snapshot(index, false))
                        };
                        if let (Some(cb), Some(snapshot)) = (&callback, snapshot) {
                            cb(snapshot);
                        }
                    })
                    .await;

                    let snapshot = {
                        let mut progress = lock_state(&state);
                        progress.complete_item(index);
                        callback.as_ref().map(|_| progress.snapshot(index, true))
                    };
                    if let (Some(cb), Some(snapshot)) = (&callback, snapshot) {
                        cb(snapshot);
                    }

                    (index, result)
                }
            })
            .buffer_unordered(total.max(1))
            .collect()
            .await;

    // Re-order by original index so output order matches input order
    let mut slots: Vec<Option<DownloadResult>> = (0..total).map(|_| None).collect();
    for (index, result) in collected {
        slots[index] = Some(result);
    }
    let results: Vec<DownloadResult> = slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| {
            slot.unwrap_or_else(|| {
                // Every launched item yields exactly once; this is a guard
                // against a slot that was somehow never filled.
                DownloadResult::failed(
                    &urls[index],
                    &DownloadError::Configuration {
                        message: "download result was never produced".to_string(),
                    },
                )
            })
        })
        .collect();

    let summary = lock_state(&state).summary();
    let outcome = BatchOutcome {
        results,
        summary,
        duration: started.elapsed(),
    };
    debug!(
        succeeded = outcome.succeeded(),
        failed = outcome.failed(),
        elapsed_ms = outcome.duration.as_millis() as u64,
        "batch download complete"
    );
    Ok(outcome)
}
