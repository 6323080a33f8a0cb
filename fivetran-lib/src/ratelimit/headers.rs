//! Handle rate limiting headers.

use http::{HeaderMap, HeaderValue, header::RETRY_AFTER};
use std::time::{Duration, SystemTime};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum RetryAfterParseError {
    #[error("Unable to parse value '{0}'")]
    ValueError(String),

    #[error("Header value contains invalid chars")]
    HeaderValueError,
}

/// Read the server-requested delay from the `Retry-After` header.
///
/// Returns `None` if the header is absent or malformed; the dispatcher then
/// falls back to its configured default.
pub(crate) fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?;
    match parse_retry_after(value) {
        Ok(delay) => Some(delay),
        Err(e) => {
            log::warn!("Ignoring Retry-After header: {e}");
            None
        }
    }
}

/// Parse the "Retry-After" header as specified per
/// [RFC 7231 section 7.1.3](https://www.rfc-editor.org/rfc/rfc7231#section-7.1.3)
pub(crate) fn parse_retry_after(value: &HeaderValue) -> Result<Duration, RetryAfterParseError> {
    let value = value
        .to_str()
        .map_err(|_| RetryAfterParseError::HeaderValueError)?
        .trim();

    // RFC 7231: Retry-After = HTTP-date / delay-seconds
    if let Ok(seconds) = value.parse::<u64>() {
        return Ok(Duration::from_secs(seconds));
    }

    httpdate::parse_http_date(value)
        // a date in the past means "now"
        .map(|date| {
            date.duration_since(SystemTime::now())
                .unwrap_or(Duration::ZERO)
        })
        .map_err(|_| RetryAfterParseError::ValueError(value.into()))
}
