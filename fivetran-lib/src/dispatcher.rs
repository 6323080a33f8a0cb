//! The request pipeline shared by every API call.
//!
//! A lookup goes through these stages:
//!
//! 1. [`ResponseCache`]: a live entry is returned straight away. Concurrent
//!    misses for one URL are collapsed into a single computation.
//! 2. [`ConcurrencyLimiter`]: the computation waits for a free slot.
//! 3. [`RetryAfterGate`]: holding the slot, it waits out any active cooldown.
//! 4. [`Transport`]: one GET is sent.
//!
//! A 429 response extends the shared cooldown, releases the slot and starts
//! over at stage 2. There is no retry limit: as long as the server keeps
//! throttling and the caller does not cancel, we keep waiting.
//! Any other outcome ends the computation. Only 2xx responses are cached.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::cache::ResponseCache;
use crate::ratelimit::{ConcurrencyLimiter, DispatchConfig, RetryAfterGate};
use crate::stats::DispatchStats;
use crate::{ApiResponse, ErrorKind, Result, Transport};

/// Rate-aware, caching front end for a [`Transport`]
#[derive(Debug)]
pub struct RequestDispatcher<T> {
    transport: T,
    cache: ResponseCache<String, ApiResponse>,
    limiter: ConcurrencyLimiter,
    gate: Arc<RetryAfterGate>,
    config: DispatchConfig,
    stats: Mutex<DispatchStats>,
}

impl<T: Transport> RequestDispatcher<T> {
    /// Create a dispatcher with its own cooldown
    #[must_use]
    pub fn new(transport: T, config: DispatchConfig) -> Self {
        Self::with_gate(transport, config, Arc::new(RetryAfterGate::new()))
    }

    /// Create a dispatcher that shares `gate` with others.
    ///
    /// A 429 seen by any of them pauses all of them.
    #[must_use]
    pub fn with_gate(transport: T, config: DispatchConfig, gate: Arc<RetryAfterGate>) -> Self {
        Self {
            transport,
            cache: ResponseCache::new(),
            limiter: ConcurrencyLimiter::new(config.max_concurrency),
            gate,
            config,
            stats: Mutex::default(),
        }
    }

    /// Fetch `url`, answering from the cache when possible.
    ///
    /// Successful responses are cached for the configured TTL.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::Cancelled`] if `cancel` fires at any stage
    /// - [`ErrorKind::Timeout`] if the transport gave up on its own deadline
    /// - [`ErrorKind::RejectedStatusCode`] for non-success statuses other than 429
    /// - any other transport failure
    pub async fn get(&self, url: &str, cancel: &CancellationToken) -> Result<ApiResponse> {
        self.get_with_ttl(url, self.config.cache_ttl, cancel).await
    }

    /// Like [`RequestDispatcher::get`], caching a fresh response for `ttl`
    /// instead of the configured TTL.
    ///
    /// # Errors
    ///
    /// See [`RequestDispatcher::get`].
    pub async fn get_with_ttl(
        &self,
        url: &str,
        ttl: Duration,
        cancel: &CancellationToken,
    ) -> Result<ApiResponse> {
        self.cache
            .get_or_compute(url.to_string(), ttl, cancel, || self.fetch(url, cancel))
            .await
    }

    /// Drop the cached response for `url`. Returns `true` if there was one.
    pub fn invalidate(&self, url: &str) -> bool {
        self.cache.remove(&url.to_string())
    }

    /// Drop all cached responses
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Snapshot of the request and cache counters
    #[must_use]
    pub fn stats(&self) -> DispatchStats {
        self.stats_mut().clone().with_cache(self.cache.stats())
    }

    /// Settings this dispatcher was created with
    #[must_use]
    pub const fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// The cooldown shared by all requests of this dispatcher
    #[must_use]
    pub const fn gate(&self) -> &Arc<RetryAfterGate> {
        &self.gate
    }

    /// The underlying transport
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    async fn fetch(&self, url: &str, cancel: &CancellationToken) -> Result<ApiResponse> {
        loop {
            log::trace!("{url}: waiting for a request slot");
            let slot = self.limiter.acquire(cancel).await?;

            self.gate.wait_if_cooling_down(cancel).await?;

            log::trace!("{url}: sending request");
            let start = Instant::now();
            let response = match self.transport.send(url, cancel).await {
                Ok(response) => response,
                Err(e) => {
                    if !e.is_cancelled() {
                        self.stats_mut().record_failure(start.elapsed());
                    }
                    log::debug!("{url}: request failed: {e}");
                    return Err(e);
                }
            };
            drop(slot);
            self.stats_mut()
                .record_response(response.status, start.elapsed());

            if response.is_throttled() {
                let delay = response
                    .retry_after
                    .unwrap_or(self.config.default_retry_after);
                log::debug!("{url}: throttled, retrying in {}ms", delay.as_millis());
                self.gate.record_throttled(delay);
                continue;
            }

            if !response.status.is_success() {
                log::debug!("{url}: rejected with {}", response.status);
                return Err(ErrorKind::RejectedStatusCode {
                    status: response.status,
                    body: response.text(),
                });
            }

            log::debug!("{url}: {response}");
            return Ok(response);
        }
    }

    fn stats_mut(&self) -> MutexGuard<'_, DispatchStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
