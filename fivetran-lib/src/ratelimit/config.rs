use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of concurrent requests, 0 (unbounded)
pub const DEFAULT_MAX_CONCURRENCY: usize = 0;

/// Default time a successful response stays cached, 60 minutes
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// Default cooldown after a 429 response without a usable `Retry-After`
/// header, 60 seconds
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Settings consumed by the [`RequestDispatcher`](crate::RequestDispatcher)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Maximum number of requests in flight at once. `0` disables the limit.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// How long a successful response is served from the cache
    #[serde(default = "default_cache_ttl", with = "humantime_serde")]
    pub cache_ttl: Duration,

    /// Cooldown applied when the server throttles without saying for how long
    #[serde(default = "default_retry_after", with = "humantime_serde")]
    pub default_retry_after: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            cache_ttl: default_cache_ttl(),
            default_retry_after: default_retry_after(),
        }
    }
}

const fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

const fn default_cache_ttl() -> Duration {
    DEFAULT_CACHE_TTL
}

const fn default_retry_after() -> Duration {
    DEFAULT_RETRY_AFTER
}

impl DispatchConfig {
    /// Create a `DispatchConfig` from CLI options, using defaults for missing values
    #[must_use]
    pub fn from_options(
        max_concurrency: Option<usize>,
        cache_ttl: Option<Duration>,
        default_retry_after: Option<Duration>,
    ) -> Self {
        Self {
            max_concurrency: max_concurrency.unwrap_or(DEFAULT_MAX_CONCURRENCY),
            cache_ttl: cache_ttl.unwrap_or(DEFAULT_CACHE_TTL),
            default_retry_after: default_retry_after.unwrap_or(DEFAULT_RETRY_AFTER),
        }
    }
}
