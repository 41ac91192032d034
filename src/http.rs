//! Shared blocking HTTP client construction and response checks.

use anyhow::{bail, Context, Result};
use reqwest::blocking::{Client, ClientBuilder, Response};
use std::time::Duration;

pub(crate) const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;
pub(crate) const HTTP_REQUEST_TIMEOUT_SECS: u64 = 120; // connection + transfer

const USER_AGENT: &str = concat!("njdoe-sync/", env!("CARGO_PKG_VERSION"));

/// Client builder preloaded with the connect/request timeouts and user agent.
///
/// Collaborators that need extra TLS or redirect settings start from this.
pub(crate) fn http_client_builder() -> ClientBuilder {
    Client::builder()
        .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
        .timeout(Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
}

pub(crate) fn create_http_client() -> Result<Client> {
    http_client_builder()
        .build()
        .context("Failed to create HTTP client")
}

/// Fail with a descriptive error unless the response status is 2xx.
///
/// The response body, if any, is appended (truncated) since the HR and
/// registry APIs put the useful part of their errors there.
pub(crate) fn ensure_success(response: Response, context: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().unwrap_or_default();
    bail!(
        "{}: HTTP {} - {}{}",
        context,
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown error"),
        format_body(&body)
    );
}

fn format_body(body: &str) -> String {
    const MAX_BODY: usize = 500;
    let body = body.trim();
    if body.is_empty() {
        String::new()
    } else if body.len() <= MAX_BODY {
        format!(": {body}")
    } else {
        let mut end = MAX_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!(": {}...", &body[..end])
    }
}
