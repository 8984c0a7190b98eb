use reqwest::StatusCode;
use std::time::Duration;

use crate::error::{check, SeriesStoreError};
use crate::types::{SeriesStoreResponse, SeriesSummary};

/// HTTP client for the series store endpoint.
///
/// Registers one [SeriesSummary] per request. Transient upstream failures
/// are retried with capped exponential backoff; the store's upsert is keyed
/// by `SeriesInstanceUID`, so repeating a request is safe.
pub struct SeriesStoreClient {
    client: reqwest::Client,
    retries: u16,
    url: String,
}

impl SeriesStoreClient {
    pub fn new(url: String, retries: u16) -> Self {
        Self {
            client: reqwest::Client::new(),
            retries,
            url,
        }
    }

    /// Register a series summary with the store.
    pub async fn store(
        &self,
        summary: &SeriesSummary,
    ) -> Result<SeriesStoreResponse, SeriesStoreError> {
        let max_attempts = self.retries as u32 + 1;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.send_store_request(summary).await {
                Ok(data) => return Ok(data),
                Err(e) if should_retry(&e) && attempt < max_attempts => {
                    let duration = backoff(attempt);
                    tracing::warn!(
                        "Error from series store: {:?}. Going to retry after {}s",
                        &e,
                        duration.as_secs()
                    );
                    tokio::time::sleep(duration).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_store_request(
        &self,
        summary: &SeriesSummary,
    ) -> Result<SeriesStoreResponse, SeriesStoreError> {
        let res = self
            .client
            .post(&self.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(summary)
            .send()
            .await?;
        let data = check(res).await?.json().await?;
        Ok(data)
    }
}

fn should_retry(e: &SeriesStoreError) -> bool {
    match e {
        SeriesStoreError::Store { status, .. } => RETRYABLE_STATUS.contains(status),
        SeriesStoreError::Request(e) => e.is_connect() || e.is_timeout(),
    }
}

const RETRYABLE_STATUS: [StatusCode; 8] = [
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
    StatusCode::INSUFFICIENT_STORAGE,
    StatusCode::REQUEST_TIMEOUT,
    StatusCode::CONFLICT,
    StatusCode::TOO_MANY_REQUESTS,
];

/// Produce duration to sleep for (will never exceed 20 seconds).
fn backoff(attempt: u32) -> Duration {
    let seconds = std::cmp::min(2u64.pow(attempt), 20);
    Duration::from_secs(seconds)
}
