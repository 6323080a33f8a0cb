//! Decoding of the API's response envelopes.
//!
//! Every payload is wrapped as `{"code": ..., "data": ...}`. List endpoints
//! put a page into `data`: `{"items": [...], "next_cursor": "..."}`, and the
//! next page is requested by passing the cursor back as a query parameter.

use async_stream::try_stream;
use futures::Stream;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::{RequestDispatcher, Result, Transport};

/// Characters left alone when embedding a value into a path segment or a
/// query parameter (RFC 3986 unreserved characters)
pub(crate) const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

#[derive(Debug, Deserialize)]
struct Envelope<D> {
    data: Option<D>,
}

/// One page of a list endpoint
#[derive(Debug, Deserialize)]
pub(crate) struct Page<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    next_cursor: Option<String>,
}

/// Build the URL of one page of `endpoint`
pub(crate) fn page_url(endpoint: &str, limit: usize, cursor: Option<&str>) -> String {
    let separator = if endpoint.contains('?') { '&' } else { '?' };
    let mut url = format!("{endpoint}{separator}limit={limit}");
    if let Some(cursor) = cursor {
        url.push_str("&cursor=");
        url.extend(utf8_percent_encode(cursor, COMPONENT));
    }
    url
}

/// Fetch a single object. A `null` or missing `data` member yields `None`.
pub(crate) async fn fetch_one<T, X>(
    dispatcher: &RequestDispatcher<X>,
    endpoint: &str,
    cancel: &CancellationToken,
) -> Result<Option<T>>
where
    T: DeserializeOwned,
    X: Transport,
{
    let response = dispatcher.get(endpoint, cancel).await?;
    let envelope: Envelope<T> = response.json(endpoint)?;
    Ok(envelope.data)
}

/// Stream all items of a list endpoint, one page at a time.
///
/// A page is only requested once the previous one has been consumed. The
/// stream ends after the first page without a cursor, or at the first error.
pub(crate) fn fetch_all<'a, T, X>(
    dispatcher: &'a RequestDispatcher<X>,
    endpoint: String,
    page_size: usize,
    cancel: CancellationToken,
) -> impl Stream<Item = Result<T>> + 'a
where
    T: DeserializeOwned + 'a,
    X: Transport,
{
    try_stream! {
        let mut cursor: Option<String> = None;
        loop {
            let url = page_url(&endpoint, page_size, cursor.as_deref());
            let response = dispatcher.get(&url, &cancel).await?;
            let envelope: Envelope<Page<T>> = response.json(&url)?;
            let Some(page) = envelope.data else {
                log::debug!("{url}: empty page");
                break;
            };

            for item in page.items {
                yield item;
            }

            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }
    }
}
