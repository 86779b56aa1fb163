//! Per-volume I/O admission.
//!
//! Each mount point owns one [`IoLimiter`] bounding how many resources may be
//! open against it at once. A slot is held by an [`IoPermit`] and returned
//! when the permit is dropped, so every exit path of a request gives its slot
//! back exactly once.

use reelhouse_common::{Error, Result};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

/// Bounded counting admission gate.
///
/// Waiters are served in the semaphore's FIFO order; there is no other
/// fairness guarantee.
#[derive(Debug)]
pub struct IoLimiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// One admitted slot. Dropping it releases the slot.
#[derive(Debug)]
#[must_use = "the slot is released as soon as the permit is dropped"]
pub struct IoPermit {
    _permit: OwnedSemaphorePermit,
}

impl IoLimiter {
    /// Create a limiter admitting `capacity` concurrent holders (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Wait for a free slot, or until `cancel` fires.
    ///
    /// Cancellation wins ties, and a cancelled wait never consumes a slot.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<IoPermit> {
        if cancel.is_cancelled() {
            return Err(Error::LimiterCancelled);
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::LimiterCancelled),
            permit = Arc::clone(&self.semaphore).acquire_owned() => {
                // The semaphore is never closed while the limiter is alive.
                let permit = permit.map_err(|_| Error::LimiterCancelled)?;
                Ok(IoPermit { _permit: permit })
            }
        }
    }

    /// Take a slot only if one is free right now.
    pub fn try_acquire(&self) -> Option<IoPermit> {
        Arc::clone(&self.semaphore)
            .try_acquire_owned()
            .ok()
            .map(|permit| IoPermit { _permit: permit })
    }

    /// Number of currently free slots.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Total number of slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
