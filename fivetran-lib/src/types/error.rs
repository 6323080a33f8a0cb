use std::hash::Hash;
use std::time::Duration;

use http::StatusCode;
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Possible errors when talking to the Fivetran API through `fivetran_lib`
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The caller cancelled the request while it was queued, cooling down
    /// or in flight
    #[error("Request was cancelled")]
    Cancelled,

    /// The request exceeded the transport's own deadline
    #[error("Request to `{0}` timed out")]
    Timeout(String),

    /// Connection-level failure while sending the request
    #[error("Network error while requesting `{url}`")]
    NetworkRequest {
        /// Endpoint that was requested
        url: String,
        /// The underlying network error
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status code other than 429
    #[error("Rejected status code {status}: {body}")]
    RejectedStatusCode {
        /// Status code returned by the server
        status: StatusCode,
        /// Response body, decoded lossily as UTF-8
        body: String,
    },

    /// The response body could not be read
    #[error("Error reading response body: {0}")]
    ReadResponseBody(#[source] reqwest::Error),

    /// The response body is not the JSON document we expected
    #[error("Cannot decode response from `{url}`")]
    Decode {
        /// Endpoint whose response failed to decode
        url: String,
        /// The underlying decoder error
        #[source]
        source: serde_json::Error,
    },

    /// The configured base URL cannot be used
    #[error("Invalid base URL `{url}`: {reason}")]
    InvalidBaseUrl {
        /// The offending URL as given
        url: String,
        /// Why it was rejected
        reason: String,
    },

    /// An endpoint path cannot be joined onto the base URL, or would leave
    /// the base URL's origin
    #[error("Cannot build request URL from `{endpoint}`")]
    InvalidEndpoint {
        /// The endpoint path as given
        endpoint: String,
        /// The underlying parse error, if the endpoint did not parse
        #[source]
        source: Option<url::ParseError>,
    },

    /// API key or secret missing or blank
    #[error("{0} cannot be empty")]
    MissingCredentials(&'static str),

    /// The request timeout must be greater than zero
    #[error("Timeout must be a positive duration, got {0:?}")]
    InvalidTimeout(Duration),

    /// A required argument of an API call was blank
    #[error("{0} cannot be empty")]
    InvalidArgument(&'static str),

    /// The request client cannot be created
    #[error("Error creating request client: {0}")]
    BuildHttpClient(#[source] reqwest::Error),

    /// A header value could not be built from the configuration
    #[error("Header could not be parsed.")]
    InvalidHeader(#[from] http::header::InvalidHeaderValue),
}

impl ErrorKind {
    /// Classify a `reqwest` failure for the given endpoint.
    ///
    /// Deadline expiry becomes [`ErrorKind::Timeout`], everything else is a
    /// [`ErrorKind::NetworkRequest`].
    #[must_use]
    pub fn from_reqwest(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout(url.to_string())
        } else {
            Self::NetworkRequest {
                url: url.to_string(),
                source,
            }
        }
    }

    /// Return the status code of a rejected response, if any
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::RejectedStatusCode { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Return `true` if the caller cancelled the request
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Return `true` if the transport gave up after its own deadline
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Return the underlying `reqwest` error, if any
    #[must_use]
    pub const fn reqwest_error(&self) -> Option<&reqwest::Error> {
        match self {
            Self::NetworkRequest { source, .. }
            | Self::ReadResponseBody(source)
            | Self::BuildHttpClient(source) => Some(source),
            _ => None,
        }
    }
}

impl PartialEq for ErrorKind {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Timeout(u1), Self::Timeout(u2)) => u1 == u2,
            (
                Self::NetworkRequest { url: u1, source: e1 },
                Self::NetworkRequest { url: u2, source: e2 },
            ) => u1 == u2 && e1.to_string() == e2.to_string(),
            (
                Self::RejectedStatusCode { status: s1, body: b1 },
                Self::RejectedStatusCode { status: s2, body: b2 },
            ) => s1 == s2 && b1 == b2,
            (Self::Decode { url: u1, .. }, Self::Decode { url: u2, .. }) => u1 == u2,
            (
                Self::InvalidBaseUrl { url: u1, reason: r1 },
                Self::InvalidBaseUrl { url: u2, reason: r2 },
            ) => u1 == u2 && r1 == r2,
            (
                Self::InvalidEndpoint {
                    endpoint: e1,
                    source: s1,
                },
                Self::InvalidEndpoint {
                    endpoint: e2,
                    source: s2,
                },
            ) => e1 == e2 && s1 == s2,
            (Self::MissingCredentials(a), Self::MissingCredentials(b))
            | (Self::InvalidArgument(a), Self::InvalidArgument(b)) => a == b,
            (Self::InvalidTimeout(a), Self::InvalidTimeout(b)) => a == b,
            (Self::ReadResponseBody(e1), Self::ReadResponseBody(e2))
            | (Self::BuildHttpClient(e1), Self::BuildHttpClient(e2)) => {
                e1.to_string() == e2.to_string()
            }
            (Self::Cancelled, Self::Cancelled) | (Self::InvalidHeader(_), Self::InvalidHeader(_)) => {
                true
            }
            _ => false,
        }
    }
}

impl Eq for ErrorKind {}

impl Hash for ErrorKind {
    fn hash<H>(&self, state: &mut H)
    where
        H: std::hash::Hasher,
    {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Timeout(url)
            | Self::NetworkRequest { url, .. }
            | Self::Decode { url, .. }
            | Self::InvalidBaseUrl { url, .. } => url.hash(state),
            Self::InvalidEndpoint { endpoint, .. } => endpoint.hash(state),
            Self::RejectedStatusCode { status, body } => (status, body).hash(state),
            Self::MissingCredentials(what) | Self::InvalidArgument(what) => what.hash(state),
            Self::InvalidTimeout(timeout) => timeout.hash(state),
            Self::ReadResponseBody(e) | Self::BuildHttpClient(e) => e.to_string().hash(state),
            Self::InvalidHeader(e) => e.to_string().hash(state),
            Self::Cancelled => {}
        }
    }
}

impl Serialize for ErrorKind {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}
