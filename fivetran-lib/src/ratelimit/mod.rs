//! Global rate limiting and concurrency control.
//!
//! The Fivetran API throttles per account, not per endpoint, so a single
//! cooldown applies to every request a dispatcher sends.
//!
//! # Architecture
//!
//! - [`RetryAfterGate`]: the shared cooldown deadline set by HTTP 429 responses
//! - [`ConcurrencyLimiter`]: bounds the number of requests in flight
//! - [`DispatchConfig`]: limits, cache lifetime and the fallback cooldown

mod config;
mod gate;
mod headers;
mod limiter;

pub use config::{DEFAULT_CACHE_TTL, DEFAULT_MAX_CONCURRENCY, DEFAULT_RETRY_AFTER, DispatchConfig};
pub use gate::RetryAfterGate;
pub(crate) use gate::deadline_after;
pub(crate) use headers::retry_after;
pub use limiter::{ConcurrencyLimiter, Slot};
