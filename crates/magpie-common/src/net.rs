//! HTTP fetch utilities for the Magpie CLI.
//!
//! Reports and DOM snapshots are usually local JSON files, but the CLI also
//! accepts URLs (a capture service endpoint, a CI artifact). This module
//! provides the simple blocking GET wrapper for that.

use std::time::Duration;

/// User-Agent header sent with all requests.
const USER_AGENT: &str = "magpie/0.1 (+https://github.com/magpie)";

/// Default request timeout.
const TIMEOUT: Duration = Duration::from_secs(30);

/// Error type for remote fetches.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The HTTP client could not be created or the request failed.
    #[error("request failed: {0}")]
    Request(String),
    /// The server answered with a non-success status.
    #[error("HTTP error: {0}")]
    Status(String),
}

/// True if `source` should be fetched over HTTP rather than read from disk.
pub fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Fetch a URL and return its body as text.
pub fn fetch_text(url: &str) -> Result<String, FetchError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(TIMEOUT)
        .build()
        .map_err(|e| FetchError::Request(e.to_string()))?;

    let response = client
        .get(url)
        .header("User-Agent", USER_AGENT)
        .send()
        .map_err(|e| FetchError::Request(e.to_string()))?;

    if !response.status().is_success() {
        return Err(FetchError::Status(response.status().to_string()));
    }

    response.text().map_err(|e| FetchError::Request(e.to_string()))
}
