use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use http::StatusCode;
use secrecy::SecretString;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::{ApiResponse, ClientBuilder, ErrorKind, Result, Transport};

/// Builds a [`crate::Client`] talking to the given mock server
///
/// # Panic
///
/// This panics on error, so it should only be used for testing
pub(crate) fn mock_client(server: &wiremock::MockServer) -> crate::Client {
    ClientBuilder::builder()
        .base_url(format!("{}/v1/", server.uri()))
        .api_key(SecretString::from("key".to_string()))
        .api_secret(SecretString::from("secret".to_string()))
        .build()
        .client()
        .expect("Expected valid mock client")
}

/// What a [`ScriptedTransport`] does for one call
#[derive(Debug)]
pub(crate) enum Scripted {
    Respond(ApiResponse),
    Fail(ErrorKind),
}

/// Shorthand for a throttled response with an optional server delay
pub(crate) fn throttled(retry_after: Option<Duration>) -> Scripted {
    let response = ApiResponse::new(StatusCode::TOO_MANY_REQUESTS, "slow down");
    Scripted::Respond(match retry_after {
        Some(delay) => response.with_retry_after(delay),
        None => response,
    })
}

/// In-memory [`Transport`] replaying per-URL scripts.
///
/// Every call sleeps for the configured latency, then pops the next scripted
/// outcome for its URL. Without a script it answers `200` with the body
/// `"{url}#{n}"`, `n` counting all calls so far, so repeated fetches are
/// distinguishable.
#[derive(Debug)]
pub(crate) struct ScriptedTransport {
    latency: Duration,
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<Vec<(String, Instant)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedTransport {
    pub(crate) fn new(latency: Duration) -> Self {
        Self {
            latency,
            scripts: Mutex::default(),
            calls: Mutex::default(),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub(crate) fn script(self, url: &str, outcome: Scripted) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(outcome);
        self
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Instants at which calls for `url` started
    pub(crate) fn call_times(&self, url: &str) -> Vec<Instant> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(called, _)| called == url)
            .map(|(_, at)| *at)
            .collect()
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, url: &str, cancel: &CancellationToken) -> Result<ApiResponse> {
        let n = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((url.to_string(), Instant::now()));
            calls.len()
        };

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _in_flight = InFlight(&self.in_flight);
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(ErrorKind::Cancelled),
            () = tokio::time::sleep(self.latency) => {}
        }

        let scripted = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(url)
            .and_then(VecDeque::pop_front);
        match scripted {
            Some(Scripted::Respond(response)) => Ok(response),
            Some(Scripted::Fail(error)) => Err(error),
            None => Ok(ApiResponse::new(StatusCode::OK, format!("{url}#{n}"))),
        }
    }
}
