//! Batch-level progress aggregation
//!
//! `BatchProgress` composes many per-item [`ProgressTracker`]s into a single
//! batch-level view. It is owned by the batch orchestrator and mutated only
//! through `create_item_tracker` / `update_item` / `complete_item`, which the
//! orchestrator serializes behind one lock even though the downloads
//! themselves run concurrently.

use crate::core::error::{DownloadError, Result};
use crate::core::progress::{
    ProgressSample, ProgressTracker, TrackerSummary, estimate_remaining,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

/// Callback invoked with a fresh aggregate snapshot on every per-item
/// progress event and on every item completion
pub type BatchCallback = Arc<dyn Fn(BatchSnapshot) + Send + Sync>;

/// One still-active download inside a batch snapshot
#[derive(Debug, Clone, Serialize)]
pub struct ActiveDownload {
    pub id: usize,
    /// Latest enriched sample, `None` before the first transport event
    pub latest: Option<ProgressSample>,
}

/// Point-in-time view of a running batch
#[derive(Debug, Clone, Serialize)]
pub struct BatchSnapshot {
    pub completed: usize,
    pub total: usize,
    /// `completed / total * 100`, rounded to the nearest integer
    pub percent: u32,
    pub elapsed_secs: f64,
    /// Linear extrapolation from the overall percentage, `None` at 0%
    pub eta_secs: Option<f64>,
    pub active: Vec<ActiveDownload>,
    pub active_count: usize,
    /// Index of the item whose event produced this snapshot
    pub trigger_index: usize,
    /// Whether this snapshot was produced by an item completion
    pub is_completion: bool,
}

/// One completed item with its condensed progress history
#[derive(Debug, Clone, Serialize)]
pub struct CompletedItem {
    pub id: usize,
    pub bytes: u64,
    pub summary: TrackerSummary,
}

/// Final report for a whole batch
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub completed: usize,
    pub total: usize,
    pub percent: u32,
    pub elapsed_secs: f64,
    /// Sum of bytes across completed items
    pub total_bytes: u64,
    /// Mean of per-item average speeds across completed items, 0 when none
    pub mean_speed_bps: f64,
    pub items: Vec<CompletedItem>,
}

/// Aggregates per-item trackers into one batch-level view
///
/// The total item count is fixed at construction. Every item id transitions
/// active -> completed exactly once; registering an id twice is an error.
#[derive(Debug)]
pub struct BatchProgress {
    total: usize,
    started_at: Instant,
    active: HashMap<usize, ProgressTracker>,
    finished: Vec<CompletedItem>,
}

impl BatchProgress {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            started_at: Instant::now(),
            active: HashMap::new(),
            finished: Vec::new(),
        }
    }

    /// Allocate and start a tracker for `id`
    ///
    /// Callers must use unique ids (the batch orchestrator uses the item's
    /// positional index); reusing an active id is a `DuplicateItem` error.
    pub fn create_item_tracker(&mut self, id: usize, url: &str, filename: &str) -> Result<()> {
        if self.active.contains_key(&id) {
            return Err(DownloadError::DuplicateItem { id });
        }
        self.active.insert(id, ProgressTracker::new(url, filename));
        Ok(())
    }

    /// Feed a raw transport sample into the tracker for `id`
    ///
    /// Returns the enriched sample, or `None` when `id` is not active.
    pub fn update_item(
        &mut self,
        id: usize,
        downloaded: u64,
        total: u64,
        speed_bps: f64,
    ) -> Option<ProgressSample> {
        self.active
            .get_mut(&id)
            .map(|tracker| tracker.update(downloaded, total, speed_bps))
    }

    /// Move `id` from active to completed, snapshotting its summary
    ///
    /// Unknown ids are a logged no-op returning `false`.
    pub fn complete_item(&mut self, id: usize) -> bool {
        match self.active.remove(&id) {
            Some(tracker) => {
                let bytes = tracker.latest().map(|s| s.downloaded).unwrap_or(0);
                self.finished.push(CompletedItem {
                    id,
                    bytes,
                    summary: tracker.summary(),
                });
                true
            }
            None => {
                warn!(id, "complete_item called for an id that is not active");
                false
            }
        }
    }

    pub fn completed_count(&self) -> usize {
        self.finished.len()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Overall completion percentage, rounded to the nearest integer
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        ((self.finished.len() as f64 / self.total as f64) * 100.0).round() as u32
    }

    /// Build a fresh snapshot, recording which item event triggered it
    pub fn snapshot(&self, trigger_index: usize, is_completion: bool) -> BatchSnapshot {
        let elapsed_secs = self.started_at.elapsed().as_secs_f64();
        let percent = self.percent();

        let mut active: Vec<ActiveDownload> = self
            .active
            .iter()
            .map(|(&id, tracker)| ActiveDownload {
                id,
                latest: tracker.latest().cloned(),
            })
            .collect();
        active.sort_by_key(|a| a.id);

        BatchSnapshot {
            completed: self.finished.len(),
            total: self.total,
            percent,
            elapsed_secs,
            eta_secs: estimate_remaining(elapsed_secs, Some(percent as f64)),
            active_count: active.len(),
            active,
            trigger_index,
            is_completion,
        }
    }

    /// Final batch report combining counts with completed-item summaries
    pub fn summary(&self) -> BatchSummary {
        let total_bytes = self.finished.iter().map(|item| item.bytes).sum();
        let mean_speed_bps = if self.finished.is_empty() {
            0.0
        } else {
            self.finished
                .iter()
                .map(|item| item.summary.avg_speed_bps)
                .sum::<f64>()
                / self.finished.len() as f64
        };

        BatchSummary {
            completed: self.finished.len(),
            total: self.total,
            percent: self.percent(),
            elapsed_secs: self.started_at.elapsed().as_secs_f64(),
            total_bytes,
            mean_speed_bps,
            items: self.finished.clone(),
        }
    }
}
