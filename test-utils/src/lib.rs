//! `test-utils` is used for testing in both `fivetran-lib` and `fivetran-bin`.
//! This crate does not depend on `fivetran-lib` or `fivetran-bin`, else we would get dependency cycles.
//! Macros are used instead, so that the importer is responsible for providing the dependencies
//! (`wiremock`, `http` and `serde_json`).

/// Create a mock web server, which responds with a predefined status when
/// handling a matching request
#[macro_export]
macro_rules! mock_server {
    ($status:expr $(, $func:tt ($($arg:expr),*))*) => {{
        let mock_server = wiremock::MockServer::start().await;
        let response_template = wiremock::ResponseTemplate::new(http::StatusCode::from($status));
        let template = response_template$(.$func($($arg),*))*;
        wiremock::Mock::given(wiremock::matchers::method("GET")).respond_with(template).mount(&mock_server).await;
        mock_server
    }};
}

/// Build the JSON body of one page of a list endpoint.
///
/// The cursor is optional; without it the page is the last one.
#[macro_export]
macro_rules! page_body {
    ([$($item:tt),* $(,)?]) => {
        serde_json::json!({
            "code": "Success",
            "data": { "items": [$($item),*], "next_cursor": null }
        })
        .to_string()
    };
    ([$($item:tt),* $(,)?], $cursor:expr) => {
        serde_json::json!({
            "code": "Success",
            "data": { "items": [$($item),*], "next_cursor": $cursor }
        })
        .to_string()
    };
}

/// Mount a GET route answering `200` with the given JSON body.
///
/// Returns nothing; the route stays mounted for the lifetime of the server.
#[macro_export]
macro_rules! mock_json_route {
    ($server:expr, $path:expr, $body:expr $(,)?) => {
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path($path))
            .respond_with(
                wiremock::ResponseTemplate::new(http::StatusCode::OK)
                    .set_body_raw(String::from($body).into_bytes(), "application/json"),
            )
            .mount(&$server)
            .await
    };
}

/// Set up a mock server whose route `path` first answers `429 Too Many
/// Requests` with the given `Retry-After` seconds, then `200` with `body`.
///
/// The throttled response is served exactly once.
#[macro_export]
macro_rules! throttling_mock_server {
    ($path:expr, $retry_after_secs:expr, $body:expr $(,)?) => {{
        let mock_server = wiremock::MockServer::start().await;

        let throttled = wiremock::ResponseTemplate::new(http::StatusCode::TOO_MANY_REQUESTS)
            .insert_header("Retry-After", $retry_after_secs.to_string().as_str());
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path($path))
            .respond_with(throttled)
            .up_to_n_times(1)
            .with_priority(1)
            .expect(1)
            .mount(&mock_server)
            .await;

        let ok = wiremock::ResponseTemplate::new(http::StatusCode::OK)
            .set_body_raw(String::from($body).into_bytes(), "application/json");
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path($path))
            .respond_with(ok)
            .expect(1)
            .mount(&mock_server)
            .await;

        mock_server
    }};
}
