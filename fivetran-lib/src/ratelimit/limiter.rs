use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::{ErrorKind, Result};

/// Bounds the number of requests in flight across all endpoints.
///
/// A limit of `0` means "no limiter": [`ConcurrencyLimiter::acquire`] then
/// hands out empty slots without ever suspending.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Option<Arc<Semaphore>>,
    limit: usize,
}

/// Permission to send one request.
///
/// The permit goes back to the limiter when the slot is dropped, whichever
/// way the owning future ends.
#[derive(Debug)]
#[must_use = "the slot is released as soon as it is dropped"]
pub struct Slot {
    _permit: Option<OwnedSemaphorePermit>,
}

impl ConcurrencyLimiter {
    /// Create a limiter admitting at most `limit` concurrent requests
    #[must_use]
    pub fn new(limit: usize) -> Self {
        let semaphore = (limit > 0).then(|| Arc::new(Semaphore::new(limit)));
        Self { semaphore, limit }
    }

    /// Create a limiter that never blocks
    #[must_use]
    pub fn unbounded() -> Self {
        Self::new(0)
    }

    /// The configured limit, `None` if unbounded
    #[must_use]
    pub fn limit(&self) -> Option<usize> {
        self.semaphore.as_ref().map(|_| self.limit)
    }

    /// Number of free slots, `None` if unbounded
    #[must_use]
    pub fn available_permits(&self) -> Option<usize> {
        self.semaphore.as_ref().map(|s| s.available_permits())
    }

    /// Wait for a free slot.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::Cancelled`] if `cancel` fires before a slot is free.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<Slot> {
        let Some(semaphore) = &self.semaphore else {
            return Ok(Slot { _permit: None });
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(ErrorKind::Cancelled),
            permit = Arc::clone(semaphore).acquire_owned() => {
                // SAFETY: this should not panic as we never close the semaphore
                let permit = permit.expect("Semaphore was closed unexpectedly");
                Ok(Slot { _permit: Some(permit) })
            }
        }
    }
}

impl Default for ConcurrencyLimiter {
    fn default() -> Self {
        Self::unbounded()
    }
}
