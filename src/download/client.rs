//! HTTP client wrapper used by the download engine.
//!
//! The client is created once per run and shared read-only by every
//! concurrent download; reqwest keeps its connection pool behind an `Arc`.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::{debug, instrument};
use url::Url;

use super::constants::CONNECT_TIMEOUT_SECS;
use super::error::DownloadError;
use crate::user_agent;

/// HTTP client for streaming downloads.
///
/// Only a connect timeout is configured. There is no overall or idle read
/// timeout: large transfers over slow links must not be cut off, and
/// cancellation is driven by the caller's token instead.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a client with the default connect timeout.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self::with_connect_timeout(CONNECT_TIMEOUT_SECS)
            .expect("failed to build HTTP client with static configuration")
    }

    /// Creates a client with an explicit connect timeout.
    ///
    /// # Errors
    ///
    /// Returns the reqwest builder error if the TLS backend or system
    /// configuration cannot be initialized.
    pub fn with_connect_timeout(connect_timeout_secs: u64) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .user_agent(user_agent::default_download_user_agent())
            // Content-Length must match the bytes written to disk.
            .no_gzip()
            .build()?;
        Ok(Self { client })
    }

    /// Sends a GET request and validates the response status.
    ///
    /// Only `200 OK` and `206 Partial Content` are accepted. Any other status
    /// is a [`DownloadError::BadStatus`] and the body is left unread.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Request`] on transport failure and
    /// [`DownloadError::BadStatus`] for unexpected statuses.
    #[instrument(level = "debug", skip(self), fields(url = %url))]
    pub async fn get(&self, url: &Url) -> Result<reqwest::Response, DownloadError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| DownloadError::request(url.as_str(), e))?;

        let status = response.status();
        if !is_accepted_status(status) {
            debug!(status = status.as_u16(), "rejecting response status");
            return Err(DownloadError::bad_status(url.as_str(), status.as_u16()));
        }
        Ok(response)
    }
}

fn is_accepted_status(status: StatusCode) -> bool {
    status.as_u16() < 400 && (status == StatusCode::OK || status == StatusCode::PARTIAL_CONTENT)
}
