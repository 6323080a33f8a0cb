use std::fmt::Display;
use std::time::Duration;

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;

use crate::{ErrorKind, Result, ratelimit};

/// A fully read HTTP response.
///
/// [`reqwest::Response`] cannot be cached since it does not implement
/// [`Clone`] and its body can only be consumed once, so the dispatcher works
/// with this owned copy instead. Cloning is cheap: the body is a [`Bytes`]
/// handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// Status code returned by the server
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Delay requested by the server through `Retry-After`, if present and valid
    pub retry_after: Option<Duration>,
    /// Raw response body
    pub body: Bytes,
}

impl ApiResponse {
    /// Create a response without headers
    #[must_use]
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            retry_after: None,
            body: body.into(),
        }
    }

    /// Attach a server-provided retry delay
    #[must_use]
    pub const fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    /// Read status, headers and the complete body of a `reqwest` response.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::Timeout`] if the deadline expires while the body
    /// is streamed and [`ErrorKind::ReadResponseBody`] for any other failure.
    pub async fn from_response(response: reqwest::Response, url: &str) -> Result<Self> {
        let status = response.status();
        let headers = response.headers().clone();
        let retry_after = ratelimit::retry_after(&headers);
        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                ErrorKind::Timeout(url.to_string())
            } else {
                ErrorKind::ReadResponseBody(e)
            }
        })?;

        Ok(Self {
            status,
            headers,
            retry_after,
            body,
        })
    }

    /// Returns `true` if the server signalled rate limiting (HTTP 429)
    #[must_use]
    pub fn is_throttled(&self) -> bool {
        self.status == StatusCode::TOO_MANY_REQUESTS
    }

    /// Body as text, replacing invalid UTF-8 sequences
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::Decode`] if the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|source| ErrorKind::Decode {
            url: url.to_string(),
            source,
        })
    }
}

impl Display for ApiResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {} bytes", self.status.as_u16(), self.body.len())
    }
}
