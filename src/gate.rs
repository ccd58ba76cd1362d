//! Bounded concurrency gate
//!
//! A counting semaphore capping simultaneous in-flight downloads. Built on
//! `tokio::sync::Semaphore`, which serves suspended waiters in FIFO order.
//! Permits are RAII-scoped, so release is guaranteed when the holder's scope
//! ends; the gate never needs a timeout.

use crate::core::error::{DownloadError, Result};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// RAII permit for one slot in the gate; the slot is released on drop
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
}

/// Counting semaphore with fixed capacity in `[1, ..)`
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl ConcurrencyGate {
    /// Create a gate admitting at most `capacity` holders at once
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity < 1 {
            return Err(DownloadError::InvalidCapacity {
                requested: capacity,
            });
        }
        Ok(Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        })
    }

    /// Acquire a slot, suspending FIFO behind other waiters when saturated
    pub async fn acquire(&self) -> GatePermit {
        // The semaphore is never closed, so acquisition cannot fail.
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("gate semaphore closed");
        GatePermit { _permit: permit }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently free
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}
