use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::app::{FeedtideError, Result};
use crate::config::{DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use crate::fetcher::Fetcher;

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        Self::with_options(
            DEFAULT_USER_AGENT,
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    /// A client that sends exactly one request per fetch; reqwest's
    /// protocol-level retries are switched off.
    pub fn with_options(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .retry(reqwest::retry::never())
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .user_agent(user_agent)
            .build()
            .map_err(|e| FeedtideError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?;
        response.error_for_status_ref()?;

        // Read the whole body before any parsing happens.
        let body = response.bytes().await?.to_vec();
        Ok(body)
    }
}
