use std::time::Duration;

use http::StatusCode;
use serde::Serialize;

use crate::cache::CacheStats;

/// Record and report statistics for a [`crate::RequestDispatcher`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    /// Total number of requests sent over the transport, retries included
    pub total_requests: u64,
    /// Number of successful requests (2xx status)
    pub successful_requests: u64,
    /// Number of requests that received rate limit responses (429)
    pub rate_limited: u64,
    /// Number of client error responses (4xx, excluding 429)
    pub client_errors: u64,
    /// Number of server error responses (5xx)
    pub server_errors: u64,
    /// Number of requests that never produced a response
    pub failed_requests: u64,
    /// Number of lookups answered from the cache
    pub cache_hits: u64,
    /// Number of lookups that went to the transport
    pub cache_misses: u64,
    /// Number of entries currently stored
    pub cached_entries: usize,
    /// Sum of all request times, used for the average
    #[serde(with = "humantime_serde")]
    pub total_request_time: Duration,
}

impl DispatchStats {
    /// Record a response with status code and request duration
    pub(crate) fn record_response(&mut self, status: StatusCode, request_time: Duration) {
        self.total_requests += 1;
        self.total_request_time += request_time;

        match status.as_u16() {
            200..=299 => self.successful_requests += 1,
            429 => self.rate_limited += 1,
            400..=499 => self.client_errors += 1,
            500..=599 => self.server_errors += 1,
            _ => {}
        }
    }

    /// Record a request that ended without a response
    pub(crate) fn record_failure(&mut self, request_time: Duration) {
        self.total_requests += 1;
        self.failed_requests += 1;
        self.total_request_time += request_time;
    }

    /// Merge the counters of the response cache
    pub(crate) fn with_cache(mut self, cache: CacheStats) -> Self {
        self.cache_hits = cache.hits;
        self.cache_misses = cache.misses;
        self.cached_entries = cache.entries;
        self
    }

    /// Get the current success rate (0.0 to 1.0)
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            1.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            let success_rate = self.successful_requests as f64 / self.total_requests as f64;
            success_rate
        }
    }

    /// Get the cache hit rate (0.0 to 1.0)
    #[must_use]
    pub fn cache_hit_rate(&self) -> f64 {
        let lookups = self.cache_hits + self.cache_misses;
        if lookups == 0 {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            let hit_rate = self.cache_hits as f64 / lookups as f64;
            hit_rate
        }
    }

    /// Get average request time
    #[must_use]
    pub fn average_request_time(&self) -> Option<Duration> {
        if self.total_requests == 0 {
            return None;
        }
        #[allow(clippy::cast_possible_truncation)]
        Some(self.total_request_time / (self.total_requests as u32))
    }

    /// Get a human-readable summary
    #[must_use]
    pub fn summary(&self) -> String {
        let avg_time = self
            .average_request_time()
            .map_or_else(|| "N/A".to_string(), |d| format!("{:.0}ms", d.as_millis()));

        format!(
            "{} requests ({:.1}% success, {} throttled), {:.1}% cache hits, avg {}",
            self.total_requests,
            self.success_rate() * 100.0,
            self.rate_limited,
            self.cache_hit_rate() * 100.0,
            avg_time
        )
    }
}
