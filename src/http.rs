//! Outbound HTTP shared by the polling jobs and integrity checks

use crate::errors::{DashboardError, Result};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Some feeds answer 403 to library user agents.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Single-attempt HTTP fetcher with a fixed per-call timeout
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    /// Create a new fetcher
    pub fn new(timeout: Duration, accept_invalid_certs: bool) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(BROWSER_USER_AGENT)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .map_err(DashboardError::Http)?;

        Ok(Self { client, timeout })
    }

    /// GET a URL without judging the status code
    pub async fn get(&self, url: &str) -> Result<Response> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        debug!("{} responded with {}", url, response.status());
        Ok(response)
    }

    /// GET a URL and decode its JSON body
    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.get_success(url).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// GET a URL and return the raw body
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.get_success(url).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn get_success(&self, url: &str) -> Result<Response> {
        let response = self.get(url).await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let message = match status.as_u16() {
            403 => format!("Forbidden by {}", url),
            404 => format!("Endpoint not found: {}", url),
            429 => format!("Rate limited by {}", url),
            500..=599 => format!("Server error {} from {}", status, url),
            _ => format!("Unexpected response {} from {}", status, url),
        };

        Err(DashboardError::Other(message))
    }
}
