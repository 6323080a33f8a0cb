//! `fivetran_lib` is a client for the Fivetran REST API.
//!
//! Every request goes through a [`RequestDispatcher`], which caches
//! successful responses, bounds the number of requests in flight and pauses
//! all traffic when the server answers with HTTP 429.
//!
//! ```no_run
//! use futures::TryStreamExt;
//! use fivetran_lib::{ClientBuilder, Result};
//! use secrecy::SecretString;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = ClientBuilder::builder()
//!         .api_key(SecretString::from("key".to_string()))
//!         .api_secret(SecretString::from("secret".to_string()))
//!         .max_concurrency(4_usize)
//!         .build()
//!         .client()?;
//!
//!     let cancel = CancellationToken::new();
//!     let groups: Vec<_> = client.groups(&cancel).try_collect().await?;
//!     for group in groups {
//!         println!("{}: {}", group.id, group.name);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! The dispatcher works with any [`Transport`], so it can be used on its own:
//!
//! ```no_run
//! # use fivetran_lib::{ApiResponse, DispatchConfig, RequestDispatcher, Result, Transport};
//! # use tokio_util::sync::CancellationToken;
//! # async fn run<T: Transport>(transport: T) -> Result<ApiResponse> {
//! let dispatcher = RequestDispatcher::new(transport, DispatchConfig::default());
//! dispatcher.get("groups", &CancellationToken::new()).await
//! # }
//! ```

#[cfg(test)]
mod test_utils;

mod cache;
mod client;
mod dispatcher;
mod fetch;
mod stats;
mod transport;
mod types;

pub mod models;
pub mod ratelimit;

pub use cache::{CacheStats, ResponseCache};
pub use client::{
    Client, ClientBuilder, DEFAULT_BASE_URL, DEFAULT_PAGE_SIZE, DEFAULT_TIMEOUT_SECS,
    DEFAULT_USER_AGENT,
};
pub use dispatcher::RequestDispatcher;
pub use ratelimit::{DispatchConfig, RetryAfterGate};
pub use stats::DispatchStats;
pub use transport::{HttpTransport, Transport};
pub use types::*;
