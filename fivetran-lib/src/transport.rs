//! Single HTTP round trips.
//!
//! A [`Transport`] knows nothing about caching, throttling or concurrency.
//! It sends exactly one GET and hands back whatever the server answered,
//! 429 responses included.

use async_trait::async_trait;
use reqwest::Url;
use tokio_util::sync::CancellationToken;

use crate::{ApiResponse, ErrorKind, Result};

/// Performs one GET request per call.
///
/// Implementations must give up with [`ErrorKind::Cancelled`] as soon as
/// `cancel` fires, and report their own deadline expiring as
/// [`ErrorKind::Timeout`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch `url`, a path relative to the API base URL
    async fn send(&self, url: &str, cancel: &CancellationToken) -> Result<ApiResponse>;
}

/// [`Transport`] backed by a preconfigured [`reqwest::Client`].
///
/// Authentication, default headers and the request timeout live in the
/// client; see [`crate::ClientBuilder`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpTransport {
    /// Create a transport sending requests relative to `base_url`
    #[must_use]
    pub const fn new(client: reqwest::Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    /// The URL endpoint paths are resolved against
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Join an endpoint path onto the base URL.
    ///
    /// Only relative paths are accepted. Requests carry the account
    /// credentials, so they never go to another host.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidEndpoint`] if the result is not a valid URL,
    /// if `endpoint` is absolute or scheme-relative, or if the resolved URL
    /// has a different origin than the base URL.
    pub fn resolve(&self, endpoint: &str) -> Result<Url> {
        let invalid = |source| ErrorKind::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            source,
        };

        if endpoint.starts_with("//") || Url::parse(endpoint).is_ok() {
            return Err(invalid(None));
        }

        let url = self
            .base_url
            .join(endpoint)
            .map_err(|source| invalid(Some(source)))?;
        if url.origin() != self.base_url.origin() {
            return Err(invalid(None));
        }
        Ok(url)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, url: &str, cancel: &CancellationToken) -> Result<ApiResponse> {
        let target = self.resolve(url)?;
        log::trace!("GET {target}");

        let request = async {
            let response = self
                .client
                .get(target)
                .send()
                .await
                .map_err(|e| ErrorKind::from_reqwest(url, e))?;
            ApiResponse::from_response(response, url).await
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(ErrorKind::Cancelled),
            response = request => response,
        }
    }
}
