//! Exposition endpoint fetcher.

use std::time::Duration;

use crate::error::{BridgeError, Result};

/// HTTP fetcher for exposition endpoints.
///
/// One plain GET per scrape; anything but a 200 response is a fetch
/// failure for that source. The request timeout bounds how long a hung
/// source can stall a sweep.
pub struct MetricsFetcher {
    client: reqwest::Client,
}

impl MetricsFetcher {
    /// Create a fetcher with the given per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BridgeError::Http(e.to_string()))?;

        Ok(Self { client })
    }

    /// Fetch the raw exposition body from a source URL.
    pub async fn fetch(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| BridgeError::fetch(url, e.to_string()))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(BridgeError::FetchStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| BridgeError::fetch(url, e.to_string()))
    }
}
