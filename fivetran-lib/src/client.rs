//! Typed access to the Fivetran REST API.
//!
//! This module defines two structs, [`Client`] and [`ClientBuilder`].
//! `Client` exposes one method per endpoint we support and sends every
//! request through a shared [`RequestDispatcher`]. `ClientBuilder` validates
//! the settings and wires up authentication.
#![allow(clippy::module_name_repetitions)]
use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use headers::Authorization;
use headers::authorization::Credentials;
use http::header::{self, HeaderMap, HeaderValue};
use percent_encoding::utf8_percent_encode;
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use tokio_util::sync::CancellationToken;
use typed_builder::TypedBuilder;

use crate::fetch::{COMPONENT, fetch_all, fetch_one};
use crate::models::{Connector, DataSchemas, Group};
use crate::ratelimit::{
    DEFAULT_CACHE_TTL, DEFAULT_MAX_CONCURRENCY, DEFAULT_RETRY_AFTER, DispatchConfig,
    RetryAfterGate,
};
use crate::stats::DispatchStats;
use crate::{ApiResponse, ErrorKind, HttpTransport, RequestDispatcher, Result};

/// Default API endpoint, `https://api.fivetran.com/v1/`.
pub const DEFAULT_BASE_URL: &str = "https://api.fivetran.com/v1/";
/// Default timeout in seconds before a request is deemed as failed, 40.
pub const DEFAULT_TIMEOUT_SECS: u64 = 40;
/// Default user agent, `fivetran-<PKG_VERSION>`.
pub const DEFAULT_USER_AGENT: &str = concat!("fivetran/", env!("CARGO_PKG_VERSION"));
/// Default number of items requested per page, 100.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Builder for [`Client`].
///
/// See crate-level documentation for usage example.
#[derive(TypedBuilder, Debug, Clone)]
#[builder(field_defaults(default, setter(into)))]
#[builder(builder_method(doc = "
Create a builder for building `ClientBuilder`.

On the builder call, call methods with same name as its fields to set their values.

Finally, call `.build()` to create the instance of `ClientBuilder`.
"))]
pub struct ClientBuilder {
    /// Absolute `http` or `https` URL all endpoint paths are relative to.
    ///
    /// A missing trailing slash is added, otherwise the last path segment
    /// would be replaced when joining endpoint paths.
    #[builder(default_code = "String::from(DEFAULT_BASE_URL)")]
    base_url: String,

    /// API key, sent as the user name of HTTP basic authentication
    api_key: Option<SecretString>,

    /// API secret, sent as the password of HTTP basic authentication
    api_secret: Option<SecretString>,

    /// Response timeout per request. Must be greater than zero.
    #[builder(default = Duration::from_secs(DEFAULT_TIMEOUT_SECS))]
    timeout: Duration,

    /// User-agent sent with every request.
    #[builder(default_code = "String::from(DEFAULT_USER_AGENT)")]
    user_agent: String,

    /// Maximum number of requests in flight. `0` means unbounded.
    #[builder(default = DEFAULT_MAX_CONCURRENCY)]
    max_concurrency: usize,

    /// How long successful responses are served from memory.
    #[builder(default = DEFAULT_CACHE_TTL)]
    cache_ttl: Duration,

    /// Cooldown after a 429 response that carries no usable `Retry-After`.
    #[builder(default = DEFAULT_RETRY_AFTER)]
    default_retry_after: Duration,

    /// Number of items requested per page of a list endpoint.
    #[builder(default = DEFAULT_PAGE_SIZE)]
    page_size: usize,

    /// Cooldown shared with other clients.
    ///
    /// All clients built with the same gate pause together when any of them
    /// is throttled. Without one, the client gets a cooldown of its own.
    gate: Option<Arc<RetryAfterGate>>,
}

impl Default for ClientBuilder {
    #[inline]
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ClientBuilder {
    /// Instantiates a [`Client`].
    ///
    /// # Errors
    ///
    /// Returns an `Err` if:
    /// - The base URL is not an absolute `http(s)` URL.
    /// - The API key or secret is missing or blank.
    /// - The timeout is zero.
    /// - The user-agent is invalid.
    /// - The request client cannot be created.
    ///   See [here](https://docs.rs/reqwest/latest/reqwest/struct.ClientBuilder.html#errors).
    pub fn client(self) -> Result<Client> {
        let Self {
            base_url,
            api_key,
            api_secret,
            timeout,
            user_agent,
            gate,
            ..
        } = self;

        let base_url = parse_base_url(&base_url)?;
        let api_key = required(api_key.as_ref(), "API key")?;
        let api_secret = required(api_secret.as_ref(), "API secret")?;
        if timeout.is_zero() {
            return Err(ErrorKind::InvalidTimeout(timeout));
        }

        let mut authorization = Authorization::basic(api_key, api_secret).0.encode();
        authorization.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, authorization);
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            header::USER_AGENT,
            HeaderValue::from_str(&user_agent).map_err(ErrorKind::InvalidHeader)?,
        );

        let reqwest_client = reqwest::ClientBuilder::new()
            .gzip(true)
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(ErrorKind::BuildHttpClient)?;

        let config = DispatchConfig {
            max_concurrency: self.max_concurrency,
            cache_ttl: self.cache_ttl,
            default_retry_after: self.default_retry_after,
        };
        let transport = HttpTransport::new(reqwest_client, base_url);
        let dispatcher = match gate {
            Some(gate) => RequestDispatcher::with_gate(transport, config, gate),
            None => RequestDispatcher::new(transport, config),
        };

        Ok(Client {
            dispatcher: Arc::new(dispatcher),
            page_size: self.page_size.max(1),
        })
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let invalid = |reason: &str| ErrorKind::InvalidBaseUrl {
        url: raw.to_string(),
        reason: reason.to_string(),
    };

    let mut url = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("expected an http or https URL"));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn required<'a>(value: Option<&'a SecretString>, what: &'static str) -> Result<&'a str> {
    match value.map(ExposeSecret::expose_secret) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ErrorKind::MissingCredentials(what)),
    }
}

fn path_segment(value: &str, what: &'static str) -> Result<String> {
    if value.trim().is_empty() {
        return Err(ErrorKind::InvalidArgument(what));
    }
    Ok(utf8_percent_encode(value, COMPONENT).to_string())
}

/// Typed front end of the Fivetran REST API.
///
/// Cheap to clone: clones share the dispatcher, and with it the response
/// cache, the concurrency limit and the cooldown.
///
/// See [`ClientBuilder`] which contains sane defaults for all configuration options.
#[derive(Debug, Clone)]
pub struct Client {
    dispatcher: Arc<RequestDispatcher<HttpTransport>>,
    page_size: usize,
}

impl Client {
    /// Stream all groups of the account
    pub fn groups(&self, cancel: &CancellationToken) -> impl Stream<Item = Result<Group>> + '_ {
        fetch_all(&self.dispatcher, "groups".to_string(), self.page_size, cancel.clone())
    }

    /// Stream all connectors of a group.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidArgument`] if `group_id` is blank.
    pub fn connectors(
        &self,
        group_id: &str,
        cancel: &CancellationToken,
    ) -> Result<impl Stream<Item = Result<Connector>> + '_> {
        let endpoint = format!("groups/{}/connectors", path_segment(group_id, "Group ID")?);
        Ok(fetch_all(&self.dispatcher, endpoint, self.page_size, cancel.clone()))
    }

    /// Fetch the schema configuration of a connector.
    ///
    /// Returns `None` if the server sent no data.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidArgument`] if `connector_id` is blank, and
    /// any error of [`RequestDispatcher::get`] or decoding the response.
    pub async fn connector_schemas(
        &self,
        connector_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<DataSchemas>> {
        let endpoint = format!(
            "connectors/{}/schemas",
            path_segment(connector_id, "Connector ID")?
        );
        fetch_one(&self.dispatcher, &endpoint, cancel).await
    }

    /// Fetch a raw endpoint relative to the base URL
    ///
    /// # Errors
    ///
    /// See [`RequestDispatcher::get`].
    pub async fn get(&self, endpoint: &str, cancel: &CancellationToken) -> Result<ApiResponse> {
        self.dispatcher.get(endpoint, cancel).await
    }

    /// Request and cache counters
    #[must_use]
    pub fn stats(&self) -> DispatchStats {
        self.dispatcher.stats()
    }

    /// The dispatcher every request goes through
    #[must_use]
    pub fn dispatcher(&self) -> &RequestDispatcher<HttpTransport> {
        &self.dispatcher
    }
}
